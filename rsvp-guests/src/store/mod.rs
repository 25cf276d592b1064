//! Storage port for events and attendees
//!
//! Reconciliation, sending and statistics only talk to [`AttendeeStore`], so
//! they run unchanged against SQLite ([`SqliteStore`]) or the in-memory fake
//! ([`MemoryStore`]).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rsvp_common::db::{Attendee, AttendeePatch, Event, NewAttendee, Response};
use rsvp_common::Result;
use uuid::Uuid;

use crate::stats::{self, GuestStats};

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Event and attendee persistence
#[async_trait]
pub trait AttendeeStore: Send + Sync {
    /// Insert a new event
    async fn insert_event(&self, event: &Event) -> Result<()>;

    /// Overwrite an existing event; returns false if it does not exist
    async fn update_event(&self, event: &Event) -> Result<bool>;

    async fn get_event(&self, id: Uuid) -> Result<Option<Event>>;

    /// All events, earliest start first
    async fn list_events(&self) -> Result<Vec<Event>>;

    /// Delete an event and all of its attendees; returns false if it did not exist
    async fn delete_event(&self, id: Uuid) -> Result<bool>;

    async fn get_attendee(&self, id: Uuid) -> Result<Option<Attendee>>;

    /// Look up by reconciliation key; `email` must already be normalized
    async fn find_attendee(&self, event_id: Uuid, email: &str) -> Result<Option<Attendee>>;

    async fn find_attendee_by_token(&self, token: &str) -> Result<Option<Attendee>>;

    /// Attendees of an event ordered by name
    async fn list_attendees(&self, event_id: Uuid) -> Result<Vec<Attendee>>;

    /// Attendees of an event whose invitation has not been sent
    async fn list_unsent(&self, event_id: Uuid) -> Result<Vec<Attendee>>;

    /// Insert a row; violating the (event, email) or token uniqueness is an error
    async fn insert_attendee(&self, new: NewAttendee) -> Result<Attendee>;

    /// Apply a patch; returns false if the attendee does not exist
    async fn update_attendee(&self, id: Uuid, patch: &AttendeePatch) -> Result<bool>;

    /// Set the sent flag and stamp last-modified
    async fn mark_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool>;

    /// Record a guest's answer, optionally with a self-reported party size
    async fn record_response(
        &self,
        id: Uuid,
        response: Response,
        party_size: Option<i64>,
        at: DateTime<Utc>,
    ) -> Result<bool>;

    async fn delete_attendee(&self, id: Uuid) -> Result<bool>;

    /// Party-size rollups for an event
    async fn guest_stats(&self, event_id: Uuid) -> Result<GuestStats> {
        let attendees = self.list_attendees(event_id).await?;
        Ok(stats::tally(&attendees))
    }
}
