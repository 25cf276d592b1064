//! rsvp-guests library - guest list reconciliation and invitation sending
//!
//! Candidate guests come from one of three producers (delimited-text lines,
//! pasted address headers, or another event's guest list), are merged into
//! the attendee table by [`reconcile::reconcile`], and are later invited by
//! [`sender::InvitationSender`].

pub mod events;
pub mod import;
pub mod mailer;
pub mod notify;
pub mod parse;
pub mod reconcile;
pub mod rsvp;
pub mod sender;
pub mod stats;
pub mod store;

pub use reconcile::{reconcile, Candidate, EmailsUpdate, Reconciled};
pub use sender::{BatchReport, InvitationSender, SendError};
pub use stats::GuestStats;
pub use store::{AttendeeStore, MemoryStore, SqliteStore};
