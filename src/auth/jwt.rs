//! Minimal HS256 JWT encode/decode.
//!
//! Base64url without padding; signature checked with
//! `Hmac::verify_slice`. Expiry validation lives in the claim helpers
//! in the parent module, not here.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::de::DeserializeOwned;
use serde::Serialize;
use sha2::Sha256;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("malformed token")]
    Malformed,

    #[error("unsupported header")]
    UnsupportedHeader,

    #[error("signature mismatch")]
    BadSignature,

    #[error("token expired")]
    Expired,

    #[error("claims serialization failed: {0}")]
    Serde(String),

    #[error("invalid HMAC key")]
    BadKey,
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
struct JwtHeader {
    alg: String,
    typ: String,
}

fn b64url_encode(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn b64url_decode(s: &str) -> Result<Vec<u8>, JwtError> {
    URL_SAFE_NO_PAD
        .decode(s.as_bytes())
        .map_err(|_| JwtError::Malformed)
}

pub fn encode_hs256<T: Serialize>(secret: &[u8], claims: &T) -> Result<String, JwtError> {
    let header = JwtHeader {
        alg: "HS256".to_string(),
        typ: "JWT".to_string(),
    };

    let header_json = serde_json::to_vec(&header).map_err(|e| JwtError::Serde(e.to_string()))?;
    let claims_json = serde_json::to_vec(claims).map_err(|e| JwtError::Serde(e.to_string()))?;

    let signing_input = format!(
        "{}.{}",
        b64url_encode(&header_json),
        b64url_encode(&claims_json)
    );

    let mut mac = Hmac::<Sha256>::new_from_slice(secret).map_err(|_| JwtError::BadKey)?;
    mac.update(signing_input.as_bytes());
    let signature = mac.finalize().into_bytes();

    Ok(format!("{signing_input}.{}", b64url_encode(&signature)))
}

pub fn decode_hs256<T: DeserializeOwned>(secret: &[u8], token: &str) -> Result<T, JwtError> {
    let token = token.trim();
    let mut parts = token.split('.');
    let (Some(header_b64), Some(payload_b64), Some(sig_b64), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(JwtError::Malformed);
    };

    let header_raw = b64url_decode(header_b64)?;
    let header: JwtHeader =
        serde_json::from_slice(&header_raw).map_err(|_| JwtError::Malformed)?;
    if header.alg != "HS256" || !header.typ.eq_ignore_ascii_case("JWT") {
        return Err(JwtError::UnsupportedHeader);
    }

    let signing_input = format!("{header_b64}.{payload_b64}");
    let sig = b64url_decode(sig_b64)?;

    let mut mac = Hmac::<Sha256>::new_from_slice(secret).map_err(|_| JwtError::BadKey)?;
    mac.update(signing_input.as_bytes());
    mac.verify_slice(&sig).map_err(|_| JwtError::BadSignature)?;

    let payload_raw = b64url_decode(payload_b64)?;
    serde_json::from_slice(&payload_raw).map_err(|_| JwtError::Malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Claims {
        sub: String,
        exp: i64,
    }

    #[test]
    fn round_trip() {
        let claims = Claims {
            sub: "abc".into(),
            exp: 1_900_000_000,
        };
        let token = encode_hs256(b"secret", &claims).unwrap();
        let decoded: Claims = decode_hs256(b"secret", &token).unwrap();
        assert_eq!(decoded, claims);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let claims = Claims {
            sub: "abc".into(),
            exp: 0,
        };
        let token = encode_hs256(b"secret", &claims).unwrap();
        assert!(matches!(
            decode_hs256::<Claims>(b"other", &token),
            Err(JwtError::BadSignature)
        ));
    }

    #[test]
    fn garbage_is_malformed() {
        assert!(decode_hs256::<Claims>(b"secret", "not-a-jwt").is_err());
        assert!(decode_hs256::<Claims>(b"secret", "a.b.c.d").is_err());
    }
}
