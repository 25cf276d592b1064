//! Attendee reconciliation (create-or-merge)
//!
//! [`reconcile`] is the only write path that creates attendees. A candidate
//! is matched on (event, normalized primary email). A new key inserts a row;
//! an existing key merges into it under these rules:
//!
//! - a blank name never replaces a stored one
//! - party size is frozen once the guest has answered
//! - additional emails change only when the caller passes [`EmailsUpdate::Set`]
//! - last-modified always moves forward, even when nothing else changed
//!
//! Malformed input is defaulted rather than rejected, since the callers are
//! bulk imports. Only storage failures surface as errors.

use rsvp_common::db::{Attendee, AttendeePatch, NewAttendee};
use rsvp_common::{email, time, token, Error, Result};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::store::AttendeeStore;

/// What to do with an attendee's additional emails
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EmailsUpdate {
    /// Keep whatever is stored
    #[default]
    Unchanged,
    /// Replace with this list (normalized before storing; empty clears)
    Set(Vec<String>),
}

/// One guest to merge into an event's list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub event_id: Uuid,
    pub name: String,
    pub email: String,
    pub party_size: Option<i64>,
    pub additional_emails: EmailsUpdate,
}

impl Candidate {
    /// Candidate with only a name and address
    pub fn new(event_id: Uuid, name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            event_id,
            name: name.into(),
            email: email.into(),
            party_size: None,
            additional_emails: EmailsUpdate::Unchanged,
        }
    }

    pub fn with_party_size(mut self, party_size: i64) -> Self {
        self.party_size = Some(party_size);
        self
    }

    pub fn with_additional_emails<S: Into<String>>(mut self, emails: impl IntoIterator<Item = S>) -> Self {
        self.additional_emails = EmailsUpdate::Set(emails.into_iter().map(Into::into).collect());
        self
    }
}

/// Result of a reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    /// The attendee as stored after the call
    pub attendee: Attendee,
    /// Whether a new row was inserted
    pub created: bool,
}

/// Create or merge one candidate
pub async fn reconcile(store: &dyn AttendeeStore, candidate: Candidate) -> Result<Reconciled> {
    let email = email::normalize(&candidate.email);
    if email.is_empty() {
        warn!("Reconciling attendee with empty primary email for event {}", candidate.event_id);
    }

    match store.find_attendee(candidate.event_id, &email).await? {
        None => insert(store, candidate, email).await,
        Some(existing) => merge(store, candidate, existing).await,
    }
}

async fn insert(store: &dyn AttendeeStore, candidate: Candidate, email: String) -> Result<Reconciled> {
    let party_size = match candidate.party_size {
        Some(size) if size > 0 => size,
        _ => 1,
    };
    let additional = match &candidate.additional_emails {
        EmailsUpdate::Unchanged => None,
        EmailsUpdate::Set(list) => email::encode_additional(&email::normalize_additional(list, &email))?,
    };

    let new = NewAttendee {
        event_id: candidate.event_id,
        name: email::name_or_derived(Some(&candidate.name), &email),
        party_size,
        token: token::generate(),
        additional_emails: additional,
        last_modified: time::now(),
        email,
    };

    let attendee = store.insert_attendee(new).await?;
    info!("Created attendee {} for event {}", attendee.email, attendee.event_id);
    Ok(Reconciled {
        attendee,
        created: true,
    })
}

async fn merge(store: &dyn AttendeeStore, candidate: Candidate, existing: Attendee) -> Result<Reconciled> {
    let patch = merge_patch(&existing, &candidate)?;

    if !store.update_attendee(existing.id, &patch).await? {
        return Err(Error::NotFound(format!("attendee {} vanished during update", existing.id)));
    }

    let mut attendee = existing;
    patch.apply_to(&mut attendee);
    debug!(
        event_id = %attendee.event_id,
        attendee_id = %attendee.id,
        name_changed = patch.name.is_some(),
        party_size_changed = patch.party_size.is_some(),
        emails_changed = patch.additional_emails.is_some(),
        "Touched attendee"
    );
    Ok(Reconciled {
        attendee,
        created: false,
    })
}

/// Work out which fields of `existing` a candidate is allowed to change
fn merge_patch(existing: &Attendee, candidate: &Candidate) -> Result<AttendeePatch> {
    let mut patch = AttendeePatch::touch(time::advance(existing.last_modified));

    let name = candidate.name.trim();
    if !name.is_empty() && name != existing.name {
        patch.name = Some(name.to_string());
    }

    if !existing.has_responded() {
        if let Some(size) = candidate.party_size {
            if size > 0 && size != existing.party_size {
                patch.party_size = Some(size);
            }
        }
    }

    if let EmailsUpdate::Set(list) = &candidate.additional_emails {
        let wanted = email::normalize_additional(list, &existing.email);
        // A corrupt stored value never matches, so it gets overwritten
        let stored = existing.additional_emails().ok();
        if stored.as_ref() != Some(&wanted) {
            patch.additional_emails = Some(email::encode_additional(&wanted)?);
        }
    }

    Ok(patch)
}

/// Replace an attendee's additional emails (explicit organizer edit)
pub async fn update_additional_emails<S: AsRef<str>>(
    store: &dyn AttendeeStore,
    attendee_id: Uuid,
    emails: &[S],
) -> Result<Attendee> {
    let mut attendee = store
        .get_attendee(attendee_id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("attendee {}", attendee_id)))?;

    let wanted = email::normalize_additional(emails, &attendee.email);
    let mut patch = AttendeePatch::touch(time::advance(attendee.last_modified));
    patch.additional_emails = Some(email::encode_additional(&wanted)?);

    if !store.update_attendee(attendee_id, &patch).await? {
        return Err(Error::NotFound(format!("attendee {}", attendee_id)));
    }
    patch.apply_to(&mut attendee);
    info!("Updated additional emails for attendee {} ({} addresses)", attendee_id, wanted.len());
    Ok(attendee)
}
