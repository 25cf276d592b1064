//! Bulk import drivers
//!
//! Feed parser output through [`reconcile`] one candidate at a time. A failed
//! candidate is logged and counted; it never stops the rest of the import.

use rsvp_common::{Error, Result};
use serde::Serialize;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::parse::{self, ParsedGuest};
use crate::reconcile::{reconcile, Candidate, EmailsUpdate};
use crate::store::AttendeeStore;

/// Outcome counts for one import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ImportSummary {
    /// New attendees inserted
    pub created: usize,
    /// Existing attendees merged into
    pub updated: usize,
    /// Non-blank input that yielded no candidate (e.g. a line without an email)
    pub skipped: usize,
    /// Candidates the store rejected
    pub failed: usize,
}

impl ImportSummary {
    async fn apply(&mut self, store: &dyn AttendeeStore, candidate: Candidate) {
        let email = candidate.email.clone();
        match reconcile(store, candidate).await {
            Ok(r) if r.created => self.created += 1,
            Ok(_) => self.updated += 1,
            Err(e) => {
                error!("Failed to import guest {}: {}", email, e);
                self.failed += 1;
            }
        }
    }
}

fn parsed_candidate(event_id: Uuid, guest: ParsedGuest) -> Candidate {
    Candidate {
        event_id,
        name: guest.name,
        email: guest.email,
        party_size: Some(guest.party_size),
        additional_emails: EmailsUpdate::Unchanged,
    }
}

/// Import pasted CSV/TSV text, one guest per line
pub async fn import_lines(store: &dyn AttendeeStore, event_id: Uuid, text: &str) -> ImportSummary {
    let mut summary = ImportSummary::default();

    for (index, line) in text.lines().enumerate() {
        match parse::parse_line(line) {
            Some(guest) => summary.apply(store, parsed_candidate(event_id, guest)).await,
            None if line.trim().is_empty() => {}
            None => {
                debug!("Skipping line {}: no email address", index + 1);
                summary.skipped += 1;
            }
        }
    }

    info!("Imported guest lines into event {}: {:?}", event_id, summary);
    summary
}

/// Import a pasted address header
///
/// The header is parsed up front; if it is malformed nothing is imported.
pub async fn import_header(store: &dyn AttendeeStore, event_id: Uuid, blob: &str) -> Result<ImportSummary> {
    let guests = parse::parse_header(blob)
        .map_err(|e| Error::InvalidInput(format!("Could not parse address list: {}", e)))?;

    let mut summary = ImportSummary::default();
    for guest in guests {
        summary.apply(store, parsed_candidate(event_id, guest)).await;
    }

    info!("Imported address header into event {}: {:?}", event_id, summary);
    Ok(summary)
}

/// Copy every attendee of `from` into `to`
///
/// Name, address, party size and additional emails carry over; send and
/// response state do not.
pub async fn copy_attendees(store: &dyn AttendeeStore, from: Uuid, to: Uuid) -> Result<ImportSummary> {
    if store.get_event(to).await?.is_none() {
        return Err(Error::NotFound(format!("event {}", to)));
    }
    let source = store.list_attendees(from).await?;

    let mut summary = ImportSummary::default();
    for attendee in source {
        let additional = match attendee.additional_emails() {
            Ok(list) => list,
            Err(e) => {
                error!("Ignoring malformed additional emails of attendee {} while copying: {}", attendee.id, e);
                Vec::new()
            }
        };
        let candidate = Candidate {
            event_id: to,
            name: attendee.name,
            email: attendee.email,
            party_size: Some(attendee.party_size),
            additional_emails: EmailsUpdate::Set(additional),
        };
        summary.apply(store, candidate).await;
    }

    info!("Copied attendees from event {} to {}: {:?}", from, to, summary);
    Ok(summary)
}
