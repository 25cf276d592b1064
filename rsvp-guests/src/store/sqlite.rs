//! SQLite-backed store

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rsvp_common::db::{Attendee, AttendeePatch, Event, NewAttendee, Response};
use rsvp_common::{time, Error, Result};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::AttendeeStore;
use crate::stats::GuestStats;

const ATTENDEE_COLUMNS: &str = "guid, event_guid, name, email, party_size, token, is_sent, \
     rsvp, responded_at, last_modified, additional_emails";

const EVENT_COLUMNS: &str = "guid, title, starts_at, ends_at, description, timezone, \
     location_name, location_link, banner_ref, created_at, updated_at";

/// Attendee store on the shared SQLite connection
#[derive(Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn parse_guid(value: &str) -> Result<Uuid> {
    Uuid::parse_str(value)
        .map_err(|e| Error::Internal(format!("Invalid stored guid '{}': {}", value, e)))
}

fn parse_optional_time(value: Option<String>) -> Result<Option<DateTime<Utc>>> {
    value.as_deref().map(time::from_db).transpose()
}

fn event_from_row(row: &SqliteRow) -> Result<Event> {
    let guid: String = row.get("guid");
    let starts_at: String = row.get("starts_at");
    let created_at: String = row.get("created_at");
    let updated_at: String = row.get("updated_at");

    Ok(Event {
        id: parse_guid(&guid)?,
        title: row.get("title"),
        starts_at: time::from_db(&starts_at)?,
        ends_at: parse_optional_time(row.get("ends_at"))?,
        description: row.get("description"),
        timezone: row.get("timezone"),
        location_name: row.get("location_name"),
        location_link: row.get("location_link"),
        banner_ref: row.get("banner_ref"),
        created_at: time::from_db(&created_at)?,
        updated_at: time::from_db(&updated_at)?,
    })
}

fn attendee_from_row(row: &SqliteRow) -> Result<Attendee> {
    let guid: String = row.get("guid");
    let event_guid: String = row.get("event_guid");
    let is_sent: i64 = row.get("is_sent");
    let rsvp: Option<String> = row.get("rsvp");
    let last_modified: String = row.get("last_modified");

    Ok(Attendee {
        id: parse_guid(&guid)?,
        event_id: parse_guid(&event_guid)?,
        name: row.get("name"),
        email: row.get("email"),
        party_size: row.get("party_size"),
        token: row.get("token"),
        is_sent: is_sent != 0,
        response: rsvp.as_deref().map(str::parse::<Response>).transpose()?,
        responded_at: parse_optional_time(row.get("responded_at"))?,
        last_modified: time::from_db(&last_modified)?,
        additional_emails: row.get("additional_emails"),
    })
}

fn attendees_from_rows(rows: &[SqliteRow]) -> Result<Vec<Attendee>> {
    rows.iter().map(attendee_from_row).collect()
}

#[async_trait]
impl AttendeeStore for SqliteStore {
    async fn insert_event(&self, event: &Event) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO events (guid, title, starts_at, ends_at, description, timezone,
                                location_name, location_link, banner_ref, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(event.id.to_string())
        .bind(&event.title)
        .bind(time::to_db(&event.starts_at))
        .bind(event.ends_at.as_ref().map(time::to_db))
        .bind(&event.description)
        .bind(&event.timezone)
        .bind(&event.location_name)
        .bind(&event.location_link)
        .bind(&event.banner_ref)
        .bind(time::to_db(&event.created_at))
        .bind(time::to_db(&event.updated_at))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_event(&self, event: &Event) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE events
            SET title = ?, starts_at = ?, ends_at = ?, description = ?, timezone = ?,
                location_name = ?, location_link = ?, banner_ref = ?, updated_at = ?
            WHERE guid = ?
            "#,
        )
        .bind(&event.title)
        .bind(time::to_db(&event.starts_at))
        .bind(event.ends_at.as_ref().map(time::to_db))
        .bind(&event.description)
        .bind(&event.timezone)
        .bind(&event.location_name)
        .bind(&event.location_link)
        .bind(&event.banner_ref)
        .bind(time::to_db(&event.updated_at))
        .bind(event.id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<Event>> {
        let sql = format!("SELECT {} FROM events WHERE guid = ?", EVENT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(event_from_row).transpose()
    }

    async fn list_events(&self) -> Result<Vec<Event>> {
        let sql = format!("SELECT {} FROM events ORDER BY starts_at", EVENT_COLUMNS);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(event_from_row).collect()
    }

    async fn delete_event(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM events WHERE guid = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn get_attendee(&self, id: Uuid) -> Result<Option<Attendee>> {
        let sql = format!("SELECT {} FROM attendees WHERE guid = ?", ATTENDEE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(attendee_from_row).transpose()
    }

    async fn find_attendee(&self, event_id: Uuid, email: &str) -> Result<Option<Attendee>> {
        let sql = format!(
            "SELECT {} FROM attendees WHERE event_guid = ? AND email = ?",
            ATTENDEE_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(event_id.to_string())
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(attendee_from_row).transpose()
    }

    async fn find_attendee_by_token(&self, token: &str) -> Result<Option<Attendee>> {
        let sql = format!("SELECT {} FROM attendees WHERE token = ?", ATTENDEE_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(token)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(attendee_from_row).transpose()
    }

    async fn list_attendees(&self, event_id: Uuid) -> Result<Vec<Attendee>> {
        let sql = format!(
            "SELECT {} FROM attendees WHERE event_guid = ? ORDER BY name COLLATE NOCASE, email",
            ATTENDEE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(event_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        attendees_from_rows(&rows)
    }

    async fn list_unsent(&self, event_id: Uuid) -> Result<Vec<Attendee>> {
        let sql = format!(
            "SELECT {} FROM attendees WHERE event_guid = ? AND is_sent = 0 \
             ORDER BY name COLLATE NOCASE, email",
            ATTENDEE_COLUMNS
        );
        let rows = sqlx::query(&sql)
            .bind(event_id.to_string())
            .fetch_all(&self.pool)
            .await?;

        attendees_from_rows(&rows)
    }

    async fn insert_attendee(&self, new: NewAttendee) -> Result<Attendee> {
        let attendee = new.into_attendee();
        sqlx::query(
            r#"
            INSERT INTO attendees (guid, event_guid, name, email, party_size, token,
                                   is_sent, last_modified, additional_emails)
            VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(attendee.id.to_string())
        .bind(attendee.event_id.to_string())
        .bind(&attendee.name)
        .bind(&attendee.email)
        .bind(attendee.party_size)
        .bind(&attendee.token)
        .bind(time::to_db(&attendee.last_modified))
        .bind(&attendee.additional_emails)
        .execute(&self.pool)
        .await?;

        Ok(attendee)
    }

    async fn update_attendee(&self, id: Uuid, patch: &AttendeePatch) -> Result<bool> {
        let (set_emails, emails) = match &patch.additional_emails {
            Some(value) => (true, value.clone()),
            None => (false, None),
        };

        let result = sqlx::query(
            r#"
            UPDATE attendees
            SET name = COALESCE(?1, name),
                party_size = COALESCE(?2, party_size),
                additional_emails = CASE WHEN ?3 THEN ?4 ELSE additional_emails END,
                last_modified = ?5
            WHERE guid = ?6
            "#,
        )
        .bind(&patch.name)
        .bind(patch.party_size)
        .bind(set_emails)
        .bind(emails)
        .bind(time::to_db(&patch.last_modified))
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn mark_sent(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query("UPDATE attendees SET is_sent = 1, last_modified = ? WHERE guid = ?")
            .bind(time::to_db(&at))
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn record_response(
        &self,
        id: Uuid,
        response: Response,
        party_size: Option<i64>,
        at: DateTime<Utc>,
    ) -> Result<bool> {
        let stamp = time::to_db(&at);
        let result = sqlx::query(
            r#"
            UPDATE attendees
            SET rsvp = ?, responded_at = ?, last_modified = ?,
                party_size = COALESCE(?, party_size)
            WHERE guid = ?
            "#,
        )
        .bind(response.as_str())
        .bind(&stamp)
        .bind(&stamp)
        .bind(party_size)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete_attendee(&self, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM attendees WHERE guid = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn guest_stats(&self, event_id: Uuid) -> Result<GuestStats> {
        let (total, unsent, sent, awaiting, yes, no) =
            sqlx::query_as::<_, (i64, i64, i64, i64, i64, i64)>(
                r#"
                SELECT
                    COALESCE(SUM(party_size), 0),
                    COALESCE(SUM(CASE WHEN is_sent = 0 THEN party_size ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN is_sent = 1 THEN party_size ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN is_sent = 1 AND rsvp IS NULL THEN party_size ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN is_sent = 1 AND rsvp = 'yes' THEN party_size ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN is_sent = 1 AND rsvp = 'no' THEN party_size ELSE 0 END), 0)
                FROM attendees
                WHERE event_guid = ?
                "#,
            )
            .bind(event_id.to_string())
            .fetch_one(&self.pool)
            .await?;

        Ok(GuestStats {
            total,
            unsent,
            sent,
            awaiting,
            yes,
            no,
        })
    }
}
