use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use uuid::Uuid;

use super::{EventStore, FeedbackStore, RegistrationStore, StoreError, UserStore};
use crate::models::{
    Event, EventCategory, Feedback, FeedbackStatus, NewEvent, NewFeedback, NewRegistration,
    NewUser, PaymentStatus, Registration, RegistrationStatus, User,
};

const EVENT_COLUMNS: &str = "id, title, event_date, event_time, description, image_path, \
     category, rule_book_path, price, registration_fields, created_by, created_at, updated_at";

const REGISTRATION_COLUMNS: &str = "id, user_id, event_id, registered_at, verification_token, \
     token_expires_at, status, payment_status, created_at, updated_at";

const USER_COLUMNS: &str =
    "id, name, email, password_hash, role, refresh_token_hash, created_at, updated_at";

const FEEDBACK_COLUMNS: &str = "id, user_id, event_id, body, rating, status, submitted_at";

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn transient(err: sqlx::Error) -> StoreError {
    tracing::error!(error = ?err, "storage failure");
    StoreError::Transient(err.to_string())
}

/// True when the error is a unique-constraint violation on the named
/// constraint (or, lacking a constraint name, any unique violation).
fn is_unique_violation(err: &sqlx::Error, constraint: &str) -> bool {
    match err {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some("23505")
                && db.constraint().map_or(true, |c| c == constraint)
        }
        _ => false,
    }
}

#[async_trait]
impl UserStore for PostgresStore {
    async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (name, email, password_hash, role) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&new.name)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(new.role)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                if is_unique_violation(&err, "users_email_key") {
                    StoreError::EmailTaken
                } else {
                    transient(err)
                }
            })
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(transient)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(transient)
    }

    async fn set_refresh_token_hash(
        &self,
        id: Uuid,
        hash: Option<String>,
    ) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE users SET refresh_token_hash = $2, updated_at = now() WHERE id = $1")
                .bind(id)
                .bind(hash)
                .execute(&self.pool)
                .await
                .map_err(transient)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::UserNotFound);
        }
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY created_at DESC");
        sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(transient)
    }
}

#[async_trait]
impl EventStore for PostgresStore {
    async fn create_event(&self, new: NewEvent) -> Result<Event, StoreError> {
        let sql = format!(
            "INSERT INTO events (title, event_date, event_time, description, image_path, \
             category, rule_book_path, price, registration_fields, created_by) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {EVENT_COLUMNS}"
        );
        sqlx::query_as::<_, Event>(&sql)
            .bind(&new.title)
            .bind(new.event_date)
            .bind(new.event_time)
            .bind(&new.description)
            .bind(&new.image_path)
            .bind(new.category)
            .bind(&new.rule_book_path)
            .bind(new.price)
            .bind(sqlx::types::Json(&new.registration_fields))
            .bind(new.created_by)
            .fetch_one(&self.pool)
            .await
            .map_err(transient)
    }

    async fn update_event(&self, id: Uuid, new: NewEvent) -> Result<Event, StoreError> {
        let sql = format!(
            "UPDATE events SET title = $2, event_date = $3, event_time = $4, description = $5, \
             image_path = $6, category = $7, rule_book_path = $8, price = $9, \
             registration_fields = $10, updated_at = now() \
             WHERE id = $1 RETURNING {EVENT_COLUMNS}"
        );
        sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .bind(&new.title)
            .bind(new.event_date)
            .bind(new.event_time)
            .bind(&new.description)
            .bind(&new.image_path)
            .bind(new.category)
            .bind(&new.rule_book_path)
            .bind(new.price)
            .bind(sqlx::types::Json(&new.registration_fields))
            .fetch_optional(&self.pool)
            .await
            .map_err(transient)?
            .ok_or(StoreError::EventNotFound)
    }

    async fn delete_event(&self, id: Uuid) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(transient)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::EventNotFound);
        }
        Ok(())
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        sqlx::query_as::<_, Event>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(transient)
    }

    async fn list_events(
        &self,
        category: Option<EventCategory>,
    ) -> Result<Vec<Event>, StoreError> {
        match category {
            Some(category) => {
                let sql = format!(
                    "SELECT {EVENT_COLUMNS} FROM events WHERE category = $1 ORDER BY event_date"
                );
                sqlx::query_as::<_, Event>(&sql)
                    .bind(category)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(transient)
            }
            None => {
                let sql = format!("SELECT {EVENT_COLUMNS} FROM events ORDER BY event_date");
                sqlx::query_as::<_, Event>(&sql)
                    .fetch_all(&self.pool)
                    .await
                    .map_err(transient)
            }
        }
    }
}

#[async_trait]
impl RegistrationStore for PostgresStore {
    async fn create_registration(
        &self,
        new: NewRegistration,
    ) -> Result<Registration, StoreError> {
        let mut tx = self.pool.begin().await.map_err(transient)?;

        let event_exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM events WHERE id = $1)")
                .bind(new.event_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(transient)?;

        if !event_exists {
            // tx rolls back on drop
            return Err(StoreError::EventNotFound);
        }

        let sql = format!(
            "INSERT INTO registrations (user_id, event_id, verification_token, token_expires_at) \
             VALUES ($1, $2, $3, $4) RETURNING {REGISTRATION_COLUMNS}"
        );
        let registration = sqlx::query_as::<_, Registration>(&sql)
            .bind(new.user_id)
            .bind(new.event_id)
            .bind(&new.verification_token)
            .bind(new.token_expires_at)
            .fetch_one(&mut *tx)
            .await
            .map_err(|err| {
                if is_unique_violation(&err, "registrations_user_event_active") {
                    StoreError::DuplicateRegistration
                } else {
                    transient(err)
                }
            })?;

        tx.commit().await.map_err(transient)?;
        Ok(registration)
    }

    async fn find_registration(&self, id: Uuid) -> Result<Option<Registration>, StoreError> {
        let sql = format!("SELECT {REGISTRATION_COLUMNS} FROM registrations WHERE id = $1");
        sqlx::query_as::<_, Registration>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(transient)
    }

    async fn find_by_valid_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Registration>, StoreError> {
        let sql = format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations \
             WHERE verification_token = $1 AND token_expires_at > $2"
        );
        sqlx::query_as::<_, Registration>(&sql)
            .bind(token)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(transient)
    }

    async fn list_registrations_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Registration>, StoreError> {
        let sql = format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations \
             WHERE user_id = $1 ORDER BY registered_at DESC"
        );
        sqlx::query_as::<_, Registration>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await
            .map_err(transient)
    }

    async fn list_registrations_for_event(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<Registration>, StoreError> {
        let sql = format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations \
             WHERE event_id = $1 ORDER BY registered_at DESC"
        );
        sqlx::query_as::<_, Registration>(&sql)
            .bind(event_id)
            .fetch_all(&self.pool)
            .await
            .map_err(transient)
    }

    async fn list_all_registrations(&self) -> Result<Vec<Registration>, StoreError> {
        let sql = format!(
            "SELECT {REGISTRATION_COLUMNS} FROM registrations ORDER BY registered_at DESC"
        );
        sqlx::query_as::<_, Registration>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(transient)
    }

    async fn cancel_registration(&self, id: Uuid) -> Result<Registration, StoreError> {
        // Conditional update keeps check-and-flip atomic on the row.
        let sql = format!(
            "UPDATE registrations SET status = $2, updated_at = now() \
             WHERE id = $1 AND status <> $2 AND payment_status = $3 \
             RETURNING {REGISTRATION_COLUMNS}"
        );
        let cancelled = sqlx::query_as::<_, Registration>(&sql)
            .bind(id)
            .bind(RegistrationStatus::Cancelled)
            .bind(PaymentStatus::Unpaid)
            .fetch_optional(&self.pool)
            .await
            .map_err(transient)?;

        if let Some(registration) = cancelled {
            return Ok(registration);
        }

        // Distinguish why the conditional update matched nothing.
        match self.find_registration(id).await? {
            None => Err(StoreError::RegistrationNotFound),
            Some(reg) if reg.status == RegistrationStatus::Cancelled => {
                Err(StoreError::AlreadyCancelled)
            }
            Some(_) => Err(StoreError::AlreadyPaid),
        }
    }

    async fn set_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
    ) -> Result<Registration, StoreError> {
        let sql = format!(
            "UPDATE registrations SET payment_status = $2, updated_at = now() \
             WHERE id = $1 RETURNING {REGISTRATION_COLUMNS}"
        );
        sqlx::query_as::<_, Registration>(&sql)
            .bind(id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await
            .map_err(transient)?
            .ok_or(StoreError::RegistrationNotFound)
    }
}

#[async_trait]
impl FeedbackStore for PostgresStore {
    async fn submit_feedback(&self, new: NewFeedback) -> Result<Feedback, StoreError> {
        let sql = format!(
            "INSERT INTO feedback (user_id, event_id, body, rating) \
             VALUES ($1, $2, $3, $4) RETURNING {FEEDBACK_COLUMNS}"
        );
        sqlx::query_as::<_, Feedback>(&sql)
            .bind(new.user_id)
            .bind(new.event_id)
            .bind(&new.body)
            .bind(new.rating)
            .fetch_one(&self.pool)
            .await
            .map_err(|err| {
                if is_unique_violation(&err, "feedback_user_id_event_id_key") {
                    StoreError::DuplicateFeedback
                } else {
                    transient(err)
                }
            })
    }

    async fn list_feedback_for_event(
        &self,
        event_id: Uuid,
        status: FeedbackStatus,
    ) -> Result<Vec<Feedback>, StoreError> {
        let sql = format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedback \
             WHERE event_id = $1 AND status = $2 ORDER BY submitted_at DESC"
        );
        sqlx::query_as::<_, Feedback>(&sql)
            .bind(event_id)
            .bind(status)
            .fetch_all(&self.pool)
            .await
            .map_err(transient)
    }

    async fn list_feedback_by_status(
        &self,
        status: FeedbackStatus,
    ) -> Result<Vec<Feedback>, StoreError> {
        let sql = format!(
            "SELECT {FEEDBACK_COLUMNS} FROM feedback WHERE status = $1 ORDER BY submitted_at"
        );
        sqlx::query_as::<_, Feedback>(&sql)
            .bind(status)
            .fetch_all(&self.pool)
            .await
            .map_err(transient)
    }

    async fn set_feedback_status(
        &self,
        id: Uuid,
        status: FeedbackStatus,
    ) -> Result<Feedback, StoreError> {
        let sql = format!(
            "UPDATE feedback SET status = $2 WHERE id = $1 RETURNING {FEEDBACK_COLUMNS}"
        );
        sqlx::query_as::<_, Feedback>(&sql)
            .bind(id)
            .bind(status)
            .fetch_optional(&self.pool)
            .await
            .map_err(transient)?
            .ok_or(StoreError::FeedbackNotFound)
    }
}
