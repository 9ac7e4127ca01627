use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::{NaiveDate, NaiveTime};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use crate::auth::AdminUser;
use crate::models::{EventCategory, NewEvent};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{created, empty_success, success};

const MAX_TITLE_LEN: usize = 200;

#[derive(Deserialize)]
pub struct EventFilter {
    pub category: Option<String>,
}

/// Typed request body for create and update; validated into a
/// [`NewEvent`] before anything touches the store.
#[derive(Deserialize)]
pub struct EventPayload {
    pub title: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub description: String,
    pub image_path: String,
    pub category: String,
    pub rule_book_path: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub registration_fields: Vec<String>,
}

impl EventPayload {
    fn validate(self, created_by: Uuid) -> Result<NewEvent, AppError> {
        let title = self.title.trim().to_string();
        if title.is_empty() || title.len() > MAX_TITLE_LEN {
            return Err(AppError::Validation("Title is required".to_string()));
        }
        if self.description.trim().is_empty() {
            return Err(AppError::Validation("Description is required".to_string()));
        }
        if self.image_path.trim().is_empty() {
            return Err(AppError::Validation("Event image is required".to_string()));
        }
        if self.price < Decimal::ZERO {
            return Err(AppError::Validation(
                "Price must be zero or positive".to_string(),
            ));
        }
        let category: EventCategory = self
            .category
            .parse()
            .map_err(|_| AppError::Validation("Invalid category".to_string()))?;

        Ok(NewEvent {
            title,
            event_date: self.date,
            event_time: self.time,
            description: self.description.trim().to_string(),
            image_path: self.image_path,
            category,
            rule_book_path: self.rule_book_path,
            price: self.price,
            registration_fields: self.registration_fields,
            created_by,
        })
    }
}

pub async fn list_events(
    State(state): State<AppState>,
    Query(filter): Query<EventFilter>,
) -> Result<Response, AppError> {
    let category = filter
        .category
        .as_deref()
        .map(str::parse::<EventCategory>)
        .transpose()
        .map_err(|_| AppError::Validation("Invalid category".to_string()))?;

    let events = state.store.list_events(category).await?;
    Ok(success(events, "Events fetched").into_response())
}

pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    let event = state
        .store
        .find_event(id)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".to_string()))?;
    Ok(success(event, "Event fetched").into_response())
}

pub async fn create_event(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Json(body): Json<EventPayload>,
) -> Result<Response, AppError> {
    let event = state.store.create_event(body.validate(admin.id)?).await?;
    tracing::info!(event_id = %event.id, "event created");
    Ok(created(event, "Event added successfully").into_response())
}

pub async fn update_event(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(body): Json<EventPayload>,
) -> Result<Response, AppError> {
    let event = state
        .store
        .update_event(id, body.validate(admin.id)?)
        .await?;
    Ok(success(event, "Event updated successfully").into_response())
}

pub async fn delete_event(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Response, AppError> {
    // Registrations referencing this event are left in place and
    // filtered out of listings as orphans.
    state.store.delete_event(id).await?;
    Ok(empty_success("Event deleted").into_response())
}
