use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::error;

use crate::receipt::ReceiptError;
use crate::store::StoreError;
use crate::utils::response::error as error_response;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    // Deliberately undifferentiated: "unknown token" and "expired
    // token" must be indistinguishable to the caller.
    #[error("Invalid or expired token")]
    InvalidOrExpiredToken,

    #[error("Receipt generation failed")]
    Rendering(#[source] ReceiptError),

    #[error("Storage error")]
    Storage(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidOrExpiredToken => StatusCode::UNAUTHORIZED,
            AppError::Rendering(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Auth(_) => "AUTH_ERROR",
            AppError::Forbidden(_) => "FORBIDDEN",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::InvalidOrExpiredToken => "INVALID_OR_EXPIRED_TOKEN",
            AppError::Rendering(_) => "RECEIPT_GENERATION_FAILED",
            AppError::Storage(_) => "STORAGE_ERROR",
        }
    }

    fn log(&self) {
        match self {
            AppError::Validation(msg)
            | AppError::Auth(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => {
                error!(error = ?self, message = %msg, "Application error");
            }
            AppError::InvalidOrExpiredToken => {
                error!("Verification token rejected");
            }
            AppError::Rendering(source) => {
                error!(error = ?source, "Receipt generation error");
            }
            AppError::Storage(detail) => {
                error!(detail = %detail, "Storage error");
            }
        }
    }
}

/// Translation boundary: storage discriminants become taxonomy errors
/// here, and raw driver details stop at the log line.
impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EventNotFound => AppError::NotFound("Event not found".to_string()),
            StoreError::UserNotFound => AppError::NotFound("User not found".to_string()),
            StoreError::RegistrationNotFound => {
                AppError::NotFound("Registration not found".to_string())
            }
            StoreError::FeedbackNotFound => AppError::NotFound("Feedback not found".to_string()),
            StoreError::DuplicateRegistration => {
                AppError::Conflict("You already registered for this event".to_string())
            }
            StoreError::EmailTaken => AppError::Conflict("User already exists".to_string()),
            StoreError::DuplicateFeedback => {
                AppError::Conflict("Feedback already submitted for this event".to_string())
            }
            StoreError::AlreadyCancelled => {
                AppError::Conflict("Registration is already cancelled".to_string())
            }
            StoreError::AlreadyPaid => {
                AppError::Conflict("Paid registrations cannot be cancelled".to_string())
            }
            StoreError::Transient(detail) => AppError::Storage(detail),
        }
    }
}

impl From<ReceiptError> for AppError {
    fn from(err: ReceiptError) -> Self {
        AppError::Rendering(err)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        // Log internal details
        self.log();

        // Only expose high-level messages to the client
        let public_message = match &self {
            AppError::Validation(msg)
            | AppError::Auth(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::InvalidOrExpiredToken => "Invalid or expired token".to_string(),
            AppError::Rendering(_) => "Error generating receipt".to_string(),
            AppError::Storage(_) => "A storage error occurred".to_string(),
        };

        error_response(code, public_message, None, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_to_taxonomy() {
        let dup: AppError = StoreError::DuplicateRegistration.into();
        assert_eq!(dup.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(dup.code(), "CONFLICT");

        let missing: AppError = StoreError::EventNotFound.into();
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);

        let transient: AppError = StoreError::Transient("connection reset".into()).into();
        assert_eq!(transient.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn token_failure_is_unauthorized_and_uniform() {
        let err = AppError::InvalidOrExpiredToken;
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(err.code(), "INVALID_OR_EXPIRED_TOKEN");
    }
}
