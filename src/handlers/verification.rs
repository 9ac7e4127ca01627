use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;

use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

/// Minimal projection returned to a scanner. Never the token, never
/// payment details.
#[derive(Serialize)]
struct VerificationView {
    name: String,
    email: String,
    event_title: String,
    event_date: NaiveDate,
    event_time: NaiveTime,
    registered_at: DateTime<Utc>,
}

/// Resolve a verification token.
///
/// "Not found" and "expired" are deliberately indistinguishable, and so
/// is a registration whose user or event has since been deleted. No
/// state transition happens here; resolving is read-only.
pub async fn resolve(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<Response, AppError> {
    let registration = state
        .store
        .find_by_valid_token(&token, Utc::now())
        .await?
        .ok_or(AppError::InvalidOrExpiredToken)?;

    let user = state
        .store
        .find_user(registration.user_id)
        .await?
        .ok_or(AppError::InvalidOrExpiredToken)?;
    let event = state
        .store
        .find_event(registration.event_id)
        .await?
        .ok_or(AppError::InvalidOrExpiredToken)?;

    Ok(success(
        VerificationView {
            name: user.name,
            email: user.email,
            event_title: event.title,
            event_date: event.event_date,
            event_time: event.event_time,
            registered_at: registration.registered_at,
        },
        "Registration verified",
    )
    .into_response())
}
