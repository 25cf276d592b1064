//! Database models

use crate::{email, Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// A single occasion guests are invited to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    /// Free text or HTML
    pub description: Option<String>,
    /// IANA timezone identifier, display only
    pub timezone: Option<String>,
    pub location_name: Option<String>,
    pub location_link: Option<String>,
    pub banner_ref: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Organizer-supplied fields of an event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventDetails {
    pub title: String,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub timezone: Option<String>,
    pub location_name: Option<String>,
    pub location_link: Option<String>,
    pub banner_ref: Option<String>,
}

impl Event {
    /// Build a new event with a fresh id
    pub fn new(details: EventDetails, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: details.title,
            starts_at: details.starts_at,
            ends_at: details.ends_at,
            description: details.description,
            timezone: details.timezone,
            location_name: details.location_name,
            location_link: details.location_link,
            banner_ref: details.banner_ref,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the organizer-editable fields
    pub fn apply(&mut self, details: EventDetails, now: DateTime<Utc>) {
        self.title = details.title;
        self.starts_at = details.starts_at;
        self.ends_at = details.ends_at;
        self.description = details.description;
        self.timezone = details.timezone;
        self.location_name = details.location_name;
        self.location_link = details.location_link;
        self.banner_ref = details.banner_ref;
        self.updated_at = now;
    }
}

/// A guest's answer to an invitation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Response {
    Yes,
    No,
}

impl Response {
    pub fn as_str(&self) -> &'static str {
        match self {
            Response::Yes => "yes",
            Response::No => "no",
        }
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Response {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yes" => Ok(Response::Yes),
            "no" => Ok(Response::No),
            other => Err(Error::InvalidInput(format!("Unknown RSVP response: {}", other))),
        }
    }
}

/// One invitee (possibly a party) of exactly one event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendee {
    pub id: Uuid,
    pub event_id: Uuid,
    pub name: String,
    /// Normalized primary address; unique per event
    pub email: String,
    pub party_size: i64,
    /// 32 lowercase hex characters, fixed at creation
    pub token: String,
    pub is_sent: bool,
    pub response: Option<Response>,
    pub responded_at: Option<DateTime<Utc>>,
    pub last_modified: DateTime<Utc>,
    /// JSON array of CC addresses as stored; `None` means no additional emails
    pub additional_emails: Option<String>,
}

impl Attendee {
    /// Decode the stored additional emails
    ///
    /// Fails only if the stored JSON is malformed.
    pub fn additional_emails(&self) -> Result<Vec<String>> {
        email::decode_additional(self.additional_emails.as_deref())
    }

    /// Whether the guest has answered, which freezes the party size
    pub fn has_responded(&self) -> bool {
        self.response.is_some()
    }
}

/// Fully-resolved values for an attendee row about to be inserted
#[derive(Debug, Clone, PartialEq)]
pub struct NewAttendee {
    pub event_id: Uuid,
    pub name: String,
    pub email: String,
    pub party_size: i64,
    pub token: String,
    pub additional_emails: Option<String>,
    pub last_modified: DateTime<Utc>,
}

impl NewAttendee {
    /// Materialize the row with a fresh id and default send/RSVP state
    pub fn into_attendee(self) -> Attendee {
        Attendee {
            id: Uuid::new_v4(),
            event_id: self.event_id,
            name: self.name,
            email: self.email,
            party_size: self.party_size,
            token: self.token,
            is_sent: false,
            response: None,
            responded_at: None,
            last_modified: self.last_modified,
            additional_emails: self.additional_emails,
        }
    }
}

/// Changes to an existing attendee; `None` fields are left as stored
///
/// `last_modified` is always written, which is what makes a no-op touch visible.
#[derive(Debug, Clone, PartialEq)]
pub struct AttendeePatch {
    pub name: Option<String>,
    pub party_size: Option<i64>,
    /// `Some(None)` clears the additional emails
    pub additional_emails: Option<Option<String>>,
    pub last_modified: DateTime<Utc>,
}

impl AttendeePatch {
    /// A patch that changes nothing but the modification stamp
    pub fn touch(last_modified: DateTime<Utc>) -> Self {
        Self {
            name: None,
            party_size: None,
            additional_emails: None,
            last_modified,
        }
    }

    /// Apply the patch to an in-memory row
    pub fn apply_to(&self, attendee: &mut Attendee) {
        if let Some(name) = &self.name {
            attendee.name = name.clone();
        }
        if let Some(size) = self.party_size {
            attendee.party_size = size;
        }
        if let Some(emails) = &self.additional_emails {
            attendee.additional_emails = emails.clone();
        }
        attendee.last_modified = self.last_modified;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_parse_and_display() {
        assert_eq!("yes".parse::<Response>().unwrap(), Response::Yes);
        assert_eq!(" NO ".parse::<Response>().unwrap(), Response::No);
        assert!("maybe".parse::<Response>().is_err());
        assert_eq!(Response::Yes.to_string(), "yes");
    }

    #[test]
    fn test_touch_patch_only_moves_stamp() {
        let now = crate::time::now();
        let mut attendee = NewAttendee {
            event_id: Uuid::new_v4(),
            name: "Alice".to_string(),
            email: "a@b.com".to_string(),
            party_size: 3,
            token: crate::token::generate(),
            additional_emails: Some(r#"["c@d.com"]"#.to_string()),
            last_modified: now,
        }
        .into_attendee();
        let before = attendee.clone();

        let later = crate::time::advance(now);
        AttendeePatch::touch(later).apply_to(&mut attendee);

        assert_eq!(attendee.name, before.name);
        assert_eq!(attendee.party_size, before.party_size);
        assert_eq!(attendee.additional_emails, before.additional_emails);
        assert!(attendee.last_modified > before.last_modified);
    }
}
