//! Mail transport seam
//!
//! Delivery itself (SMTP, an HTTP mail API, ...) lives behind
//! [`MailTransport`]. The sender hands it a fully-built [`Invitation`].

use anyhow::Result;
use async_trait::async_trait;
use rsvp_common::db::Event;
use tracing::info;

/// Everything a transport needs to deliver one invitation
#[derive(Debug, Clone, PartialEq)]
pub struct Invitation {
    pub name: String,
    pub email: String,
    /// Additional recipients, never containing `email`
    pub cc: Vec<String>,
    pub token: String,
    pub event: Event,
    /// Public base URL, without trailing slash
    pub base_url: String,
}

impl Invitation {
    /// Link to the guest's RSVP page
    pub fn rsvp_url(&self) -> String {
        format!("{}/rsvp/{}", self.base_url, self.token)
    }

    /// Link to the guest's calendar file
    pub fn calendar_url(&self) -> String {
        format!("{}/rsvp/{}/event.ics", self.base_url, self.token)
    }

    /// Subject line transports may use
    pub fn subject(&self) -> String {
        format!("You're invited: {}", self.event.title)
    }
}

/// Delivers invitations
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Deliver one invitation; an error means it was not sent
    async fn send(&self, invitation: &Invitation) -> Result<()>;
}

/// Transport that only records the outgoing message in the log
///
/// Used by the admin CLI when no real delivery is configured.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogTransport;

#[async_trait]
impl MailTransport for LogTransport {
    async fn send(&self, invitation: &Invitation) -> Result<()> {
        info!(
            "Invitation ready for {} (cc {:?}): \"{}\" {} {}",
            invitation.email,
            invitation.cc,
            invitation.subject(),
            invitation.rsvp_url(),
            invitation.calendar_url()
        );
        Ok(())
    }
}
