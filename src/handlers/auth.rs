use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::auth::{self, AuthUser};
use crate::models::{NewUser, Role};
use crate::state::AppState;
use crate::token;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

const MIN_PASSWORD_LEN: usize = 8;
const MAX_NAME_LEN: usize = 100;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Serialize)]
struct TokenPair {
    access_token: String,
    refresh_token: String,
    role: Role,
}

#[derive(Serialize)]
struct AccessToken {
    access_token: String,
}

fn validate_email(email: &str) -> bool {
    // Same shape check the SPA applies before submitting.
    let mut parts = email.split('@');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.')
        }
        _ => false,
    }
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<Response, AppError> {
    let name = body.name.trim();
    if name.len() < 2 || name.len() > MAX_NAME_LEN {
        return Err(AppError::Validation(
            "Name must be between 2 and 100 characters".to_string(),
        ));
    }

    let email = body.email.trim().to_lowercase();
    if !validate_email(&email) {
        return Err(AppError::Validation("Invalid email format".to_string()));
    }

    if body.password.len() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(
            "Password must be at least 8 characters".to_string(),
        ));
    }

    let user = state
        .store
        .create_user(NewUser {
            name: name.to_string(),
            email,
            password_hash: auth::password::hash_password(&body.password),
            role: Role::User,
        })
        .await?;

    tracing::info!(user_id = %user.id, "user registered");
    Ok(created(
        serde_json::json!({ "user_id": user.id }),
        "User registered successfully",
    )
    .into_response())
}

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<Response, AppError> {
    let email = body.email.trim().to_lowercase();

    // One uniform failure for unknown email and wrong password.
    let invalid = || AppError::Auth("Invalid email or password".to_string());

    let user = state
        .store
        .find_user_by_email(&email)
        .await?
        .ok_or_else(invalid)?;

    if !auth::password::verify_password(&body.password, &user.password_hash) {
        return Err(invalid());
    }

    let access_token = auth::issue_access_token(&state.config.jwt_secret, user.id, user.role)
        .map_err(|e| AppError::Storage(e.to_string()))?;
    let refresh_token = auth::issue_refresh_token(&state.config.jwt_refresh_secret, user.id)
        .map_err(|e| AppError::Storage(e.to_string()))?;

    state
        .store
        .set_refresh_token_hash(user.id, Some(auth::fingerprint(&refresh_token)))
        .await?;

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(success(
        TokenPair {
            access_token,
            refresh_token,
            role: user.role,
        },
        "Login successful",
    )
    .into_response())
}

pub async fn refresh(
    State(state): State<AppState>,
    Json(body): Json<RefreshRequest>,
) -> Result<Response, AppError> {
    let rejected = || AppError::Auth("Invalid or expired refresh token".to_string());

    let claims = auth::verify_refresh_token(&state.config.jwt_refresh_secret, &body.refresh_token)
        .map_err(|_| rejected())?;

    let user = state.store.find_user(claims.sub).await?.ok_or_else(rejected)?;

    let stored = user.refresh_token_hash.as_deref().ok_or_else(rejected)?;
    if !token::compare(&auth::fingerprint(&body.refresh_token), stored) {
        return Err(rejected());
    }

    let access_token = auth::issue_access_token(&state.config.jwt_secret, user.id, user.role)
        .map_err(|e| AppError::Storage(e.to_string()))?;

    Ok(success(AccessToken { access_token }, "Token refreshed").into_response())
}

pub async fn logout(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, AppError> {
    state.store.set_refresh_token_hash(user.id, None).await?;
    Ok(empty_success("Logged out").into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shape_check() {
        assert!(validate_email("ada@example.com"));
        assert!(validate_email("a.b+c@sub.example.org"));
        assert!(!validate_email("ada@example"));
        assert!(!validate_email("@example.com"));
        assert!(!validate_email("ada@@example.com"));
        assert!(!validate_email("plainaddress"));
    }
}
