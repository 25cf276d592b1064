//! Email address normalization
//!
//! The normalized form (trimmed, lowercased) is the key attendees are
//! reconciled on, and the form additional emails are deduplicated in.
//! Validation is intentionally loose: `local@domain.tld` with no whitespace
//! and exactly one `@`.

use crate::Result;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles")
});

/// Trim surrounding whitespace and lowercase
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Loose syntactic check used to pick email fields out of imported text
pub fn is_valid(candidate: &str) -> bool {
    EMAIL_PATTERN.is_match(candidate)
}

/// Derive a display name from an address
///
/// Takes everything before the last `@`, turns periods into spaces, drops
/// quote characters and trims. Input without an `@` is returned unchanged.
pub fn derive_name(address: &str) -> String {
    match address.rfind('@') {
        Some(at) => address[..at]
            .chars()
            .filter_map(|c| match c {
                '.' => Some(' '),
                '"' | '\'' => None,
                other => Some(other),
            })
            .collect::<String>()
            .trim()
            .to_string(),
        None => address.to_string(),
    }
}

/// Provided name if it is non-empty after trimming, otherwise derived from the address
pub fn name_or_derived(name: Option<&str>, address: &str) -> String {
    match name.map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => derive_name(address),
    }
}

/// Normalize a list of additional emails against a primary address
///
/// Each entry is normalized; invalid entries, duplicates and the primary
/// address itself are dropped. First-seen order is kept.
pub fn normalize_additional<S: AsRef<str>>(emails: &[S], primary: &str) -> Vec<String> {
    let primary = normalize(primary);
    let mut out: Vec<String> = Vec::with_capacity(emails.len());
    for raw in emails {
        let email = normalize(raw.as_ref());
        if email.is_empty() || email == primary || !is_valid(&email) {
            continue;
        }
        if !out.contains(&email) {
            out.push(email);
        }
    }
    out
}

/// Encode an additional-email set for storage; the empty set is stored as NULL
pub fn encode_additional(emails: &[String]) -> Result<Option<String>> {
    if emails.is_empty() {
        Ok(None)
    } else {
        Ok(Some(serde_json::to_string(emails)?))
    }
}

/// Decode a stored additional-email column; NULL and `[]` both decode to empty
pub fn decode_additional(stored: Option<&str>) -> Result<Vec<String>> {
    match stored {
        None => Ok(Vec::new()),
        Some(json) if json.trim().is_empty() => Ok(Vec::new()),
        Some(json) => Ok(serde_json::from_str(json)?),
    }
}
