use axum::extract::{Path, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::models::{FeedbackStatus, NewFeedback};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, success};

const MAX_BODY_LEN: usize = 2000;

#[derive(Deserialize)]
pub struct FeedbackRequest {
    pub event_id: Uuid,
    pub body: String,
    pub rating: Option<i32>,
}

pub async fn submit_feedback(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<FeedbackRequest>,
) -> Result<Response, AppError> {
    let text = body.body.trim();
    if text.is_empty() || text.len() > MAX_BODY_LEN {
        return Err(AppError::Validation(
            "Feedback text must be between 1 and 2000 characters".to_string(),
        ));
    }
    if let Some(rating) = body.rating {
        if !(1..=5).contains(&rating) {
            return Err(AppError::Validation(
                "Rating must be between 1 and 5".to_string(),
            ));
        }
    }

    if state.store.find_event(body.event_id).await?.is_none() {
        return Err(AppError::NotFound("Event not found".to_string()));
    }

    let feedback = state
        .store
        .submit_feedback(NewFeedback {
            user_id: user.id,
            event_id: body.event_id,
            body: text.to_string(),
            rating: body.rating,
        })
        .await?;

    Ok(created(feedback, "Feedback submitted").into_response())
}

/// Public listing; only approved feedback is visible.
pub async fn event_feedback(
    State(state): State<AppState>,
    Path(event_id): Path<Uuid>,
) -> Result<Response, AppError> {
    let items = state
        .store
        .list_feedback_for_event(event_id, FeedbackStatus::Approved)
        .await?;
    Ok(success(items, "Feedback fetched").into_response())
}
