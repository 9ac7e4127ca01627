//! Verification tokens for registrations.
//!
//! A token is 32 bytes from the OS CSPRNG rendered as 64 lowercase hex
//! characters. Comparison is constant-time over the token content;
//! malformed input short-circuits to `false` before any comparison.

use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use subtle::ConstantTimeEq;

pub const TOKEN_BYTES: usize = 32;
pub const TOKEN_LEN: usize = TOKEN_BYTES * 2;

const TOKEN_TTL_HOURS: i64 = 24;

/// Generate a fresh verification token (256 bits of entropy).
pub fn generate() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Token expiry relative to the registration instant.
pub fn expiry(registered_at: DateTime<Utc>) -> DateTime<Utc> {
    registered_at + Duration::hours(TOKEN_TTL_HOURS)
}

/// Constant-time token equality.
///
/// Wrong length or non-hex input is rejected up front and yields
/// `false`; the comparison itself never branches on content.
pub fn compare(candidate: &str, stored: &str) -> bool {
    if !is_well_formed(candidate) || !is_well_formed(stored) {
        return false;
    }

    let (Ok(a), Ok(b)) = (hex::decode(candidate), hex::decode(stored)) else {
        return false;
    };

    a.ct_eq(&b).into()
}

fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_LEN && token.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn generated_tokens_are_64_lowercase_hex() {
        let token = generate();
        assert_eq!(token.len(), TOKEN_LEN);
        assert!(token
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
    }

    #[test]
    fn no_collisions_across_ten_thousand_generations() {
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            assert!(seen.insert(generate()), "token collision");
        }
    }

    #[test]
    fn compare_accepts_equal_tokens() {
        let token = generate();
        assert!(compare(&token, &token));
    }

    #[test]
    fn compare_rejects_different_tokens() {
        assert!(!compare(&generate(), &generate()));
    }

    #[test]
    fn compare_rejects_malformed_input_without_panicking() {
        let stored = generate();
        assert!(!compare("", &stored));
        assert!(!compare("deadbeef", &stored)); // wrong length
        assert!(!compare(&"g".repeat(TOKEN_LEN), &stored)); // non-hex
        assert!(!compare(&stored, ""));
        // uppercase hex is well-formed, but differs bytewise only in
        // text; decoded comparison still matches
        assert!(compare(&stored, &stored.to_uppercase()));
    }

    #[test]
    fn expiry_is_24_hours_out() {
        let now = Utc::now();
        assert_eq!(expiry(now) - now, Duration::hours(24));
    }
}
