//! Push notifications to the organizer
//!
//! Failures are logged and swallowed. By default delivery runs on a detached
//! task that nothing waits on.

use anyhow::Result;
use async_trait::async_trait;
use rsvp_common::db::{Attendee, Event};
use std::sync::Arc;
use tracing::{info, warn};

/// Tells the organizer a guest answered
#[async_trait]
pub trait PushNotifier: Send + Sync {
    async fn notify(&self, event: &Event, attendee: &Attendee) -> Result<()>;
}

/// Notifier that writes the response to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl PushNotifier for LogNotifier {
    async fn notify(&self, event: &Event, attendee: &Attendee) -> Result<()> {
        info!(
            "{} answered {:?} for '{}' (party of {})",
            attendee.name, attendee.response, event.title, attendee.party_size
        );
        Ok(())
    }
}

/// Run the notifier on a detached task
pub fn dispatch(notifier: Arc<dyn PushNotifier>, event: Event, attendee: Attendee) {
    tokio::spawn(async move {
        if let Err(e) = notifier.notify(&event, &attendee).await {
            warn!("Push notification for attendee {} failed: {}", attendee.id, e);
        }
    });
}
