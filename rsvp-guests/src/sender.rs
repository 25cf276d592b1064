//! Invitation sending
//!
//! Sends are strictly sequential. In a batch each attendee's failure is
//! logged and recorded, and the loop moves on; the sent flag is written per
//! attendee as soon as its own send succeeds.

use rsvp_common::db::{Attendee, Event};
use rsvp_common::{email, time};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::mailer::{Invitation, MailTransport};
use crate::store::AttendeeStore;

/// Why a single invitation was not sent
#[derive(Debug, Error)]
pub enum SendError {
    /// The attendee has no primary address; state is left untouched
    #[error("attendee {0} has no email address")]
    MissingRecipient(Uuid),

    #[error("not found: {0}")]
    NotFound(String),

    /// The transport rejected the message; the attendee stays unsent
    #[error("mail transport failed: {0:#}")]
    Transport(anyhow::Error),

    #[error(transparent)]
    Store(#[from] rsvp_common::Error),
}

/// One attendee a batch could not invite
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedSend {
    pub attendee_id: Uuid,
    pub email: String,
    pub reason: String,
}

/// Outcome of [`InvitationSender::send_all_pending`]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    pub attempted: usize,
    pub sent: Vec<Uuid>,
    pub failed: Vec<FailedSend>,
}

impl BatchReport {
    /// False means "some sends failed, check logs"
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Sends invitations through a [`MailTransport`] and records the sent flag
pub struct InvitationSender {
    store: Arc<dyn AttendeeStore>,
    transport: Arc<dyn MailTransport>,
    base_url: String,
}

impl InvitationSender {
    pub fn new(store: Arc<dyn AttendeeStore>, transport: Arc<dyn MailTransport>, base_url: impl Into<String>) -> Self {
        Self {
            store,
            transport,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Send (or resend) the invitation for one attendee
    pub async fn send_one(&self, attendee_id: Uuid) -> Result<(), SendError> {
        let attendee = self
            .store
            .get_attendee(attendee_id)
            .await?
            .ok_or_else(|| SendError::NotFound(format!("attendee {}", attendee_id)))?;
        let event = self.load_event(attendee.event_id).await?;

        self.deliver(&attendee, &event).await
    }

    /// Send every unsent invitation of an event
    ///
    /// Only failing to load the event or its pending list aborts; individual
    /// send failures are collected in the report.
    pub async fn send_all_pending(&self, event_id: Uuid) -> Result<BatchReport, SendError> {
        let event = self.load_event(event_id).await?;
        let pending = self.store.list_unsent(event_id).await?;

        let mut report = BatchReport::default();
        for attendee in &pending {
            report.attempted += 1;
            match self.deliver(attendee, &event).await {
                Ok(()) => report.sent.push(attendee.id),
                Err(e) => {
                    warn!(
                        event_id = %event_id,
                        attendee_id = %attendee.id,
                        email = %attendee.email,
                        error = %e,
                        "Failed to send invitation"
                    );
                    report.failed.push(FailedSend {
                        attendee_id: attendee.id,
                        email: attendee.email.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        if report.all_succeeded() {
            info!("Sent {} pending invitations for event {}", report.sent.len(), event_id);
        } else {
            warn!(
                "Some invitations failed to send for event {} ({} sent, {} failed), check logs",
                event_id,
                report.sent.len(),
                report.failed.len()
            );
        }
        Ok(report)
    }

    async fn load_event(&self, event_id: Uuid) -> Result<Event, SendError> {
        self.store
            .get_event(event_id)
            .await?
            .ok_or_else(|| SendError::NotFound(format!("event {}", event_id)))
    }

    async fn deliver(&self, attendee: &Attendee, event: &Event) -> Result<(), SendError> {
        if attendee.email.trim().is_empty() {
            return Err(SendError::MissingRecipient(attendee.id));
        }

        let invitation = Invitation {
            name: attendee.name.clone(),
            email: attendee.email.clone(),
            cc: cc_list(attendee),
            token: attendee.token.clone(),
            event: event.clone(),
            base_url: self.base_url.clone(),
        };

        self.transport
            .send(&invitation)
            .await
            .map_err(SendError::Transport)?;

        if !self
            .store
            .mark_sent(attendee.id, time::advance(attendee.last_modified))
            .await?
        {
            return Err(SendError::NotFound(format!("attendee {}", attendee.id)));
        }
        info!("Invitation sent to {} ({} cc)", attendee.email, invitation.cc.len());
        Ok(())
    }
}

/// CC recipients for an attendee
///
/// Corrupt stored JSON is logged and treated as no CCs so the primary
/// recipient still gets the invitation.
fn cc_list(attendee: &Attendee) -> Vec<String> {
    let primary = email::normalize(&attendee.email);
    let stored = match attendee.additional_emails() {
        Ok(list) => list,
        Err(e) => {
            warn!("Malformed additional emails for attendee {}, sending without CC: {}", attendee.id, e);
            Vec::new()
        }
    };
    stored
        .into_iter()
        .filter(|cc| email::normalize(cc) != primary)
        .collect()
}
