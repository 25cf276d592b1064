//! In-memory store
//!
//! Enforces the same constraints as the SQLite schema: unique (event, email),
//! unique token, attendees must reference an existing event, and deleting an
//! event removes its attendees.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rsvp_common::db::{Attendee, AttendeePatch, Event, NewAttendee, Response};
use rsvp_common::{Error, Result};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::AttendeeStore;

#[derive(Default)]
struct State {
    events: Vec<Event>,
    attendees: Vec<Attendee>,
}

/// Attendee store backed by plain vectors behind a mutex
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| Error::Internal("memory store lock poisoned".to_string()))
    }

    /// Insert a row verbatim, bypassing every check
    ///
    /// Lets tests seed states the normal write path never produces, such as
    /// an empty primary email or corrupt additional-emails JSON.
    pub fn seed_attendee(&self, attendee: Attendee) -> Result<()> {
        self.lock()?.attendees.push(attendee);
        Ok(())
    }
}

fn sort_by_name(attendees: &mut [Attendee]) {
    attendees.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.email.cmp(&b.email))
    });
}

#[async_trait]
impl AttendeeStore for MemoryStore {
    async fn insert_event(&self, event: &Event) -> Result<()> {
        let mut state = self.lock()?;
        if state.events.iter().any(|e| e.id == event.id) {
            return Err(Error::Conflict(format!("event {} already exists", event.id)));
        }
        state.events.push(event.clone());
        Ok(())
    }

    async fn update_event(&self, event: &Event) -> Result<bool> {
        let mut state = self.lock()?;
        match state.events.iter_mut().find(|e| e.id == event.id) {
            Some(existing) => {
                *existing = event.clone();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<Event>> {
        Ok(self.lock()?.events.iter().find(|e| e.id == id).cloned())
    }

    async fn list_events(&self) -> Result<Vec<Event>> {
        let mut events = self.lock()?.events.clone();
        events.sort_by_key(|e| e.starts_at);
        Ok(events)
    }

    async fn delete_event(&self, id: Uuid) -> Result<bool> {
        let mut state = self.lock()?;
        let before = state.events.len();
        state.events.retain(|e| e.id != id);
        if state.events.len() == before {
            return Ok(false);
        }
        state.attendees.retain(|a| a.event_id != id);
        Ok(true)
    }

    async fn get_attendee(&self, id: Uuid) -> Result<Option<Attendee>> {
        Ok(self.lock()?.attendees.iter().find(|a| a.id == id).cloned())
    }

    async fn find_attendee(&self, event_id: Uuid, email: &str) -> Result<Option<Attendee>> {
        Ok(self
            .lock()?
            .attendees
            .iter()
            .find(|a| a.event_id == event_id && a.email == email)
            .cloned())
    }

    async fn find_attendee_by_token(&self, token: &str) -> Result<Option<Attendee>> {
        Ok(self.lock()?.attendees.iter().find(|a| a.token == token).cloned())
    }

    async fn list_attendees(&self, event_id: Uuid) -> Result<Vec<Attendee>> {
        let mut attendees: Vec<Attendee> = self
            .lock()?
            .attendees
            .iter()
            .filter(|a| a.event_id == event_id)
            .cloned()
            .collect();
        sort_by_name(&mut attendees);
        Ok(attendees)
    }

    async fn list_unsent(&self, event_id: Uuid) -> Result<Vec<Attendee>> {
        let mut attendees = self.list_attendees(event_id).await?;
        attendees.retain(|a| !a.is_sent);
        Ok(attendees)
    }

    async fn insert_attendee(&self, new: NewAttendee) -> Result<Attendee> {
        let mut state = self.lock()?;
        if !state.events.iter().any(|e| e.id == new.event_id) {
            return Err(Error::Conflict(format!("event {} does not exist", new.event_id)));
        }
        if state
            .attendees
            .iter()
            .any(|a| a.event_id == new.event_id && a.email == new.email)
        {
            return Err(Error::Conflict(format!(
                "attendee {} already exists for event {}",
                new.email, new.event_id
            )));
        }
        if state.attendees.iter().any(|a| a.token == new.token) {
            return Err(Error::Conflict("token already in use".to_string()));
        }
        let attendee = new.into_attendee();
        state.attendees.push(attendee.clone());
        Ok(attendee)
    }

    async fn update_attendee(&self, id: Uuid, patch: &AttendeePatch) -> Result<bool> {
        let mut state = self.lock()?;
        match state.attendees.iter_mut().find(|a| a.id == id) {
            Some(attendee) => {
                patch.apply_to(attendee);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn mark_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let mut state = self.lock()?;
        match state.attendees.iter_mut().find(|a| a.id == id) {
            Some(attendee) => {
                attendee.is_sent = true;
                attendee.last_modified = at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn record_response(
        &self,
        id: Uuid,
        response: Response,
        party_size: Option<i64>,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let mut state = self.lock()?;
        match state.attendees.iter_mut().find(|a| a.id == id) {
            Some(attendee) => {
                attendee.response = Some(response);
                attendee.responded_at = Some(at);
                attendee.last_modified = at;
                if let Some(size) = party_size {
                    attendee.party_size = size;
                }
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete_attendee(&self, id: Uuid) -> Result<bool> {
        let mut state = self.lock()?;
        let before = state.attendees.len();
        state.attendees.retain(|a| a.id != id);
        Ok(state.attendees.len() != before)
    }
}
