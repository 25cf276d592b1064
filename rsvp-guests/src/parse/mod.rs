//! Bulk guest-list parsers
//!
//! Each parser turns organizer-supplied text into [`ParsedGuest`] candidates.
//! Neither parser ever yields additional emails; those are only set through
//! an explicit update or carried over when copying between events.

pub mod header;
pub mod line;

pub use header::{parse_header, HeaderParseError};
pub use line::parse_line;

/// One guest extracted from imported text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedGuest {
    pub name: String,
    /// Normalized primary address
    pub email: String,
    pub party_size: i64,
}
