//! Guest-count rollups
//!
//! Every figure is a sum of party sizes, not a count of rows.

use rsvp_common::db::{Attendee, Response};
use serde::Serialize;

/// Party-size sums for one event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GuestStats {
    /// Everyone on the list
    pub total: i64,
    /// Invitation not sent yet
    pub unsent: i64,
    /// Invitation sent
    pub sent: i64,
    /// Sent, no answer yet
    pub awaiting: i64,
    /// Sent, answered yes
    pub yes: i64,
    /// Sent, answered no
    pub no: i64,
}

/// Compute the rollups over an attendee list
///
/// Sums saturate at `i64::MAX` rather than overflow.
pub fn tally(attendees: &[Attendee]) -> GuestStats {
    attendees.iter().fold(GuestStats::default(), |mut stats, a| {
        let size = a.party_size;
        stats.total = stats.total.saturating_add(size);
        if !a.is_sent {
            stats.unsent = stats.unsent.saturating_add(size);
            return stats;
        }
        stats.sent = stats.sent.saturating_add(size);
        let bucket = match a.response {
            None => &mut stats.awaiting,
            Some(Response::Yes) => &mut stats.yes,
            Some(Response::No) => &mut stats.no,
        };
        *bucket = bucket.saturating_add(size);
        stats
    })
}
