use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::{
    Event, NewRegistration, PaymentStatus, Registration, RegistrationStatus, UserSummary,
};
use crate::receipt;
use crate::state::AppState;
use crate::token;
use crate::utils::error::AppError;
use crate::utils::response::{created, pdf_attachment, success};

#[derive(Serialize)]
struct RegistrationCreated {
    registration_id: Uuid,
    verification_token: String,
    token_expires_at: DateTime<Utc>,
}

/// Registration plus its event, for the user dashboard. Orphaned
/// registrations (event deleted since) are skipped before this is
/// built.
#[derive(Serialize)]
struct OwnRegistration {
    id: Uuid,
    status: RegistrationStatus,
    payment_status: PaymentStatus,
    registered_at: DateTime<Utc>,
    event: Event,
}

#[derive(Serialize)]
struct Registrant {
    registration_id: Uuid,
    status: RegistrationStatus,
    payment_status: PaymentStatus,
    registered_at: DateTime<Utc>,
    user: UserSummary,
}

pub async fn register_for_event(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let registration = state
        .store
        .create_registration(NewRegistration {
            user_id: user.id,
            event_id,
            verification_token: token::generate(),
            token_expires_at: token::expiry(Utc::now()),
        })
        .await?;

    tracing::info!(
        registration_id = %registration.id,
        event_id = %event_id,
        "registration created"
    );

    Ok(created(
        RegistrationCreated {
            registration_id: registration.id,
            verification_token: registration.verification_token,
            token_expires_at: registration.token_expires_at,
        },
        "Successfully registered!",
    )
    .into_response())
}

pub async fn my_registrations(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Response, AppError> {
    let registrations = state.store.list_registrations_for_user(user.id).await?;

    let mut items = Vec::with_capacity(registrations.len());
    for registration in registrations {
        // Orphan filtering: the event may have been deleted after the
        // registration was created.
        let Some(event) = state.store.find_event(registration.event_id).await? else {
            continue;
        };
        items.push(OwnRegistration {
            id: registration.id,
            status: registration.status,
            payment_status: registration.payment_status,
            registered_at: registration.registered_at,
            event,
        });
    }

    Ok(success(items, "Registrations fetched").into_response())
}

pub async fn event_registrants(
    State(state): State<AppState>,
    user: AuthUser,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden("Admin access required".to_string()));
    }

    let registrations = state.store.list_registrations_for_event(event_id).await?;

    let mut items = Vec::with_capacity(registrations.len());
    for registration in registrations {
        let Some(owner) = state.store.find_user(registration.user_id).await? else {
            continue;
        };
        items.push(Registrant {
            registration_id: registration.id,
            status: registration.status,
            payment_status: registration.payment_status,
            registered_at: registration.registered_at,
            user: UserSummary::from(&owner),
        });
    }

    Ok(success(items, "Registrants fetched").into_response())
}

pub async fn cancel_registration(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let registration = fetch_owned(&state, id, user).await?;

    let cancelled = state.store.cancel_registration(registration.id).await?;
    tracing::info!(registration_id = %cancelled.id, "registration cancelled");
    Ok(success(cancelled, "Registration cancelled").into_response())
}

pub async fn receipt(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let registration = fetch_owned(&state, id, user).await?;

    let owner = state
        .store
        .find_user(registration.user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Registration owner not found".to_string()))?;
    let event = state
        .store
        .find_event(registration.event_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event no longer exists".to_string()))?;

    let verify_url = format!(
        "{}/verify/{}",
        state.config.frontend_base_url.trim_end_matches('/'),
        registration.verification_token
    );

    let mut buffer = Vec::new();
    receipt::render(&registration, &owner, &event, &verify_url, &mut buffer)?;

    Ok(pdf_attachment(&format!("receipt_{id}.pdf"), buffer))
}

/// Load a registration and enforce owner-or-admin access.
async fn fetch_owned(
    state: &AppState,
    id: Uuid,
    user: AuthUser,
) -> Result<Registration, AppError> {
    let registration = state
        .store
        .find_registration(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Registration not found".to_string()))?;

    if registration.user_id != user.id && !user.is_admin() {
        return Err(AppError::Forbidden(
            "You do not have access to this registration".to_string(),
        ));
    }
    Ok(registration)
}
