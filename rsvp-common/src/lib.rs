//! # RSVP Common Library
//!
//! Shared code for the RSVP tracker crates including:
//! - Database schema and models (events, attendees)
//! - Email address normalization and display-name derivation
//! - RSVP token generation and validation
//! - Configuration loading
//! - Timestamp helpers

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod email;
pub mod error;
pub mod time;
pub mod token;

pub use error::{Error, Result};
