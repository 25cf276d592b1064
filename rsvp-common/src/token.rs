//! RSVP token utilities
//!
//! A token is 16 bytes from the OS-seeded CSPRNG, hex-encoded to 32 lowercase
//! characters. It is the only credential a guest ever presents, so any route
//! that accepts one must pass it through [`is_valid`] before hitting storage.

use rand::RngCore;

/// Number of random bytes behind each token
pub const TOKEN_BYTES: usize = 16;

/// Length of the hex-encoded token
pub const TOKEN_LEN: usize = TOKEN_BYTES * 2;

/// Generate a new token
pub fn generate() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Check that `s` is exactly 32 lowercase hex characters
pub fn is_valid(s: &str) -> bool {
    s.len() == TOKEN_LEN && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generated_token_format() {
        let token = generate();
        assert_eq!(token.len(), 32);
        assert!(is_valid(&token), "bad token {}", token);
    }

    #[test]
    fn test_ten_thousand_tokens_are_unique() {
        let tokens: HashSet<String> = (0..10_000).map(|_| generate()).collect();
        assert_eq!(tokens.len(), 10_000);
        assert!(tokens.iter().all(|t| is_valid(t)));
    }

    #[test]
    fn test_rejects_uppercase_and_wrong_length() {
        assert!(!is_valid("0123456789ABCDEF0123456789abcdef"));
        assert!(!is_valid("0123456789abcdef"));
        assert!(!is_valid("0123456789abcdef0123456789abcdef0"));
        assert!(!is_valid("0123456789abcdef0123456789abcdeg"));
        assert!(!is_valid("../../etc/passwd"));
        assert!(is_valid("0123456789abcdef0123456789abcdef"));
    }
}
