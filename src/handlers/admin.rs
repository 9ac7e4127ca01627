use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::models::{
    Event, FeedbackStatus, PaymentStatus, RegistrationStatus, UserSummary,
};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

/// Admin projection of a registration. Event and user summaries are
/// populated when the referenced rows still exist; orphaned references
/// surface as nulls instead of breaking the listing.
#[derive(Serialize)]
struct AdminRegistration {
    id: Uuid,
    status: RegistrationStatus,
    payment_status: PaymentStatus,
    registered_at: DateTime<Utc>,
    event: Option<Event>,
    user: Option<UserSummary>,
}

#[derive(Deserialize)]
pub struct PaymentUpdate {
    pub payment_status: String,
}

#[derive(Deserialize)]
pub struct ModerationUpdate {
    pub status: String,
}

pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Response, AppError> {
    let users = state.store.list_users().await?;
    let summaries: Vec<UserSummary> = users.iter().map(UserSummary::from).collect();
    Ok(success(summaries, "Users fetched").into_response())
}

pub async fn list_registrations(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Response, AppError> {
    let registrations = state.store.list_all_registrations().await?;

    let mut items = Vec::with_capacity(registrations.len());
    for registration in registrations {
        let event = state.store.find_event(registration.event_id).await?;
        let user = state
            .store
            .find_user(registration.user_id)
            .await?
            .map(|u| UserSummary::from(&u));
        items.push(AdminRegistration {
            id: registration.id,
            status: registration.status,
            payment_status: registration.payment_status,
            registered_at: registration.registered_at,
            event,
            user,
        });
    }

    Ok(success(items, "Registrations fetched").into_response())
}

pub async fn set_payment_status(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<PaymentUpdate>,
) -> Result<Response, AppError> {
    let status: PaymentStatus = body
        .payment_status
        .parse()
        .map_err(|_| AppError::Validation("Invalid payment status".to_string()))?;

    let registration = state.store.set_payment_status(id, status).await?;
    tracing::info!(registration_id = %id, status = %status, "payment status updated");
    Ok(success(registration, "Payment status updated").into_response())
}

pub async fn pending_feedback(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Response, AppError> {
    let items = state
        .store
        .list_feedback_by_status(FeedbackStatus::Pending)
        .await?;
    Ok(success(items, "Pending feedback fetched").into_response())
}

pub async fn moderate_feedback(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<ModerationUpdate>,
) -> Result<Response, AppError> {
    let status: FeedbackStatus = body
        .status
        .parse()
        .map_err(|_| AppError::Validation("Invalid moderation status".to_string()))?;
    if status == FeedbackStatus::Pending {
        return Err(AppError::Validation(
            "Moderation must approve or reject".to_string(),
        ));
    }

    let feedback = state.store.set_feedback_status(id, status).await?;
    Ok(success(feedback, "Feedback moderated").into_response())
}
