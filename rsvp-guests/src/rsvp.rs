//! Guest-facing RSVP path
//!
//! Guests are identified only by their token. Tokens that are not exactly 32
//! lowercase hex characters are rejected before storage is queried.

use rsvp_common::db::{Attendee, Response};
use rsvp_common::{time, token, Error, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::notify::{self, PushNotifier};
use crate::store::AttendeeStore;

/// Look up an attendee by RSVP token
pub async fn find_by_token(store: &dyn AttendeeStore, candidate: &str) -> Result<Attendee> {
    if !token::is_valid(candidate) {
        return Err(Error::InvalidInput("malformed RSVP token".to_string()));
    }
    store
        .find_attendee_by_token(candidate)
        .await?
        .ok_or_else(|| Error::NotFound("RSVP token".to_string()))
}

/// Records guest responses and pings the organizer
pub struct ResponseRecorder {
    store: Arc<dyn AttendeeStore>,
    notifier: Option<Arc<dyn PushNotifier>>,
    detached: bool,
}

impl ResponseRecorder {
    pub fn new(store: Arc<dyn AttendeeStore>) -> Self {
        Self {
            store,
            notifier: None,
            detached: true,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn PushNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Await the notifier before `record` returns instead of detaching it
    ///
    /// For short-lived processes whose runtime would drop a detached task.
    /// Notifier failures are still only logged.
    pub fn notify_inline(mut self) -> Self {
        self.detached = false;
        self
    }

    /// Record a yes/no answer and, optionally, the guest's own headcount
    ///
    /// Non-positive party sizes are ignored. The push notification cannot fail
    /// this call.
    pub async fn record(&self, rsvp_token: &str, response: Response, party_size: Option<i64>) -> Result<Attendee> {
        let attendee = find_by_token(self.store.as_ref(), rsvp_token).await?;
        let party_size = party_size.filter(|size| *size > 0);
        let at = time::advance(attendee.last_modified);

        if !self
            .store
            .record_response(attendee.id, response, party_size, at)
            .await?
        {
            return Err(Error::NotFound(format!("attendee {}", attendee.id)));
        }

        let mut updated = attendee;
        updated.response = Some(response);
        updated.responded_at = Some(at);
        updated.last_modified = at;
        if let Some(size) = party_size {
            updated.party_size = size;
        }
        info!(
            "Recorded RSVP '{}' for attendee {} (party of {})",
            response, updated.id, updated.party_size
        );

        if let Some(notifier) = &self.notifier {
            match self.store.get_event(updated.event_id).await {
                Ok(Some(event)) if self.detached => {
                    notify::dispatch(Arc::clone(notifier), event, updated.clone())
                }
                Ok(Some(event)) => {
                    if let Err(e) = notifier.notify(&event, &updated).await {
                        warn!("Push notification for attendee {} failed: {}", updated.id, e);
                    }
                }
                Ok(None) => warn!("Event {} missing, skipping push notification", updated.event_id),
                Err(e) => warn!("Could not load event for push notification: {}", e),
            }
        }

        Ok(updated)
    }
}
