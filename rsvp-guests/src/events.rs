//! Organizer event management

use rsvp_common::db::{Event, EventDetails};
use rsvp_common::{time, Error, Result};
use tracing::info;
use uuid::Uuid;

use crate::store::AttendeeStore;

fn validate(details: &EventDetails) -> Result<()> {
    if details.title.trim().is_empty() {
        return Err(Error::InvalidInput("event title is required".to_string()));
    }
    if let Some(ends_at) = details.ends_at {
        if ends_at < details.starts_at {
            return Err(Error::InvalidInput("event ends before it starts".to_string()));
        }
    }
    Ok(())
}

/// Create an event
pub async fn create_event(store: &dyn AttendeeStore, details: EventDetails) -> Result<Event> {
    validate(&details)?;
    let event = Event::new(details, time::now());
    store.insert_event(&event).await?;
    info!("Created event '{}' ({})", event.title, event.id);
    Ok(event)
}

/// Replace an event's organizer-editable fields
pub async fn update_event(store: &dyn AttendeeStore, id: Uuid, details: EventDetails) -> Result<Event> {
    validate(&details)?;
    let mut event = store
        .get_event(id)
        .await?
        .ok_or_else(|| Error::NotFound(format!("event {}", id)))?;
    event.apply(details, time::now());
    if !store.update_event(&event).await? {
        return Err(Error::NotFound(format!("event {}", id)));
    }
    Ok(event)
}

/// Delete an event together with its attendees
pub async fn delete_event(store: &dyn AttendeeStore, id: Uuid) -> Result<()> {
    if !store.delete_event(id).await? {
        return Err(Error::NotFound(format!("event {}", id)));
    }
    info!("Deleted event {} and its attendees", id);
    Ok(())
}
