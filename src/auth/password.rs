//! PBKDF2-HMAC-SHA256 password hashing with a random per-user salt.
//!
//! Stored encoding: `pbkdf2$<iterations>$<salt hex>$<hash hex>`.

use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;
use subtle::ConstantTimeEq;

const ITERATIONS: u32 = 100_000;
const SALT_LEN: usize = 16;
const OUTPUT_LEN: usize = 32;

pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    OsRng.fill_bytes(&mut salt);

    let mut out = [0u8; OUTPUT_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, ITERATIONS, &mut out);

    format!(
        "pbkdf2${ITERATIONS}${}${}",
        hex::encode(salt),
        hex::encode(out)
    )
}

/// Constant-time verification. Any parse failure of the stored encoding
/// yields `false` rather than an error.
pub fn verify_password(password: &str, encoded: &str) -> bool {
    let mut parts = encoded.split('$');
    let (Some("pbkdf2"), Some(iterations), Some(salt_hex), Some(hash_hex), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };

    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    if iterations == 0 {
        return false;
    }
    let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(hash_hex)) else {
        return false;
    };
    if expected.len() != OUTPUT_LEN {
        return false;
    }

    let mut out = [0u8; OUTPUT_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut out);
    out.ct_eq(&expected).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify() {
        let encoded = hash_password("correct horse battery staple");
        assert!(verify_password("correct horse battery staple", &encoded));
        assert!(!verify_password("Tr0ub4dor&3", &encoded));
    }

    #[test]
    fn salts_differ_between_hashes() {
        assert_ne!(hash_password("same"), hash_password("same"));
    }

    #[test]
    fn malformed_encodings_verify_false() {
        assert!(!verify_password("pw", ""));
        assert!(!verify_password("pw", "bcrypt$10$xx$yy"));
        assert!(!verify_password("pw", "pbkdf2$0$aa$bb"));
        assert!(!verify_password("pw", "pbkdf2$1000$zz$not-hex"));
    }
}
