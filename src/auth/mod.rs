pub mod extract;
pub mod jwt;
pub mod password;

pub use extract::{AdminUser, AuthUser};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::models::Role;
use jwt::JwtError;

const ACCESS_TTL_SECS: i64 = 60 * 60;
const REFRESH_TTL_SECS: i64 = 7 * 24 * 60 * 60;

#[derive(Debug, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid,
    pub iat: i64,
    pub exp: i64,
}

pub fn issue_access_token(secret: &str, user_id: Uuid, role: Role) -> Result<String, JwtError> {
    let now = Utc::now().timestamp();
    jwt::encode_hs256(
        secret.as_bytes(),
        &AccessClaims {
            sub: user_id,
            role,
            iat: now,
            exp: now + ACCESS_TTL_SECS,
        },
    )
}

pub fn issue_refresh_token(secret: &str, user_id: Uuid) -> Result<String, JwtError> {
    let now = Utc::now().timestamp();
    jwt::encode_hs256(
        secret.as_bytes(),
        &RefreshClaims {
            sub: user_id,
            iat: now,
            exp: now + REFRESH_TTL_SECS,
        },
    )
}

pub fn verify_access_token(secret: &str, token: &str) -> Result<AccessClaims, JwtError> {
    let claims: AccessClaims = jwt::decode_hs256(secret.as_bytes(), token)?;
    if claims.exp <= Utc::now().timestamp() {
        return Err(JwtError::Expired);
    }
    Ok(claims)
}

pub fn verify_refresh_token(secret: &str, token: &str) -> Result<RefreshClaims, JwtError> {
    let claims: RefreshClaims = jwt::decode_hs256(secret.as_bytes(), token)?;
    if claims.exp <= Utc::now().timestamp() {
        return Err(JwtError::Expired);
    }
    Ok(claims)
}

/// Fingerprint stored against the user row instead of the raw refresh
/// token (64 hex chars, comparable with `token::compare`).
pub fn fingerprint(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn access_token_round_trips() {
        let user_id = Uuid::new_v4();
        let token = issue_access_token("s3cret", user_id, Role::Admin).unwrap();
        let claims = verify_access_token("s3cret", &token).unwrap();
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.role, Role::Admin);
    }

    #[test]
    fn expired_access_token_is_rejected() {
        let now = Utc::now().timestamp();
        let stale = jwt::encode_hs256(
            b"s3cret",
            &AccessClaims {
                sub: Uuid::new_v4(),
                role: Role::User,
                iat: now - 7200,
                exp: now - 3600,
            },
        )
        .unwrap();
        assert!(matches!(
            verify_access_token("s3cret", &stale),
            Err(JwtError::Expired)
        ));
    }

    #[test]
    fn fingerprint_is_64_hex() {
        let fp = fingerprint("some-refresh-token");
        assert_eq!(fp.len(), 64);
        assert_eq!(fp, fingerprint("some-refresh-token"));
        assert_ne!(fp, fingerprint("other"));
    }
}
