//! Storage abstraction.
//!
//! Handlers only ever see these traits; the sqlx-backed store lives in
//! [`postgres`], and [`memory`] provides a mutex-guarded in-memory
//! implementation with the same atomicity guarantees for tests.

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Event, EventCategory, Feedback, FeedbackStatus, NewEvent, NewFeedback, NewRegistration,
    NewUser, PaymentStatus, Registration, User,
};

/// Storage-layer failures, translated at the store boundary. Raw driver
/// error codes never cross this line.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("event not found")]
    EventNotFound,

    #[error("user not found")]
    UserNotFound,

    #[error("registration not found")]
    RegistrationNotFound,

    #[error("feedback not found")]
    FeedbackNotFound,

    #[error("duplicate registration for this user and event")]
    DuplicateRegistration,

    #[error("email is already registered")]
    EmailTaken,

    #[error("feedback already submitted for this event")]
    DuplicateFeedback,

    #[error("registration is already cancelled")]
    AlreadyCancelled,

    #[error("paid registrations cannot be cancelled")]
    AlreadyPaid,

    #[error("storage failure: {0}")]
    Transient(String),
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with [`StoreError::EmailTaken`] when the email exists.
    async fn create_user(&self, new: NewUser) -> Result<User, StoreError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Store or clear the sha256 fingerprint of the refresh token.
    async fn set_refresh_token_hash(
        &self,
        id: Uuid,
        hash: Option<String>,
    ) -> Result<(), StoreError>;

    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn create_event(&self, new: NewEvent) -> Result<Event, StoreError>;

    async fn update_event(&self, id: Uuid, new: NewEvent) -> Result<Event, StoreError>;

    /// No cascade: registrations referencing the event become orphans
    /// and are filtered at read time.
    async fn delete_event(&self, id: Uuid) -> Result<(), StoreError>;

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, StoreError>;

    async fn list_events(
        &self,
        category: Option<EventCategory>,
    ) -> Result<Vec<Event>, StoreError>;
}

#[async_trait]
pub trait RegistrationStore: Send + Sync {
    /// Atomically create a registration.
    ///
    /// Runs as a single transaction: the event lookup and the insert
    /// either both take effect or neither does. The (user, event)
    /// uniqueness is enforced by the storage engine, so concurrent
    /// duplicate attempts yield exactly one success; the loser gets
    /// [`StoreError::DuplicateRegistration`]. A missing event aborts
    /// with [`StoreError::EventNotFound`]. Anything else is
    /// [`StoreError::Transient`].
    async fn create_registration(
        &self,
        new: NewRegistration,
    ) -> Result<Registration, StoreError>;

    async fn find_registration(&self, id: Uuid) -> Result<Option<Registration>, StoreError>;

    /// Indexed-equality lookup: token matches AND expiry is strictly in
    /// the future. Misses and expired tokens are indistinguishable.
    async fn find_by_valid_token(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Registration>, StoreError>;

    async fn list_registrations_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Registration>, StoreError>;

    async fn list_registrations_for_event(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<Registration>, StoreError>;

    async fn list_all_registrations(&self) -> Result<Vec<Registration>, StoreError>;

    /// Soft-cancel. Only `unpaid`, non-cancelled registrations flip; the
    /// check and the write are one atomic read-modify-write on the row.
    async fn cancel_registration(&self, id: Uuid) -> Result<Registration, StoreError>;

    async fn set_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
    ) -> Result<Registration, StoreError>;
}

#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// At most one feedback per (user, event); duplicates fail with
    /// [`StoreError::DuplicateFeedback`].
    async fn submit_feedback(&self, new: NewFeedback) -> Result<Feedback, StoreError>;

    async fn list_feedback_for_event(
        &self,
        event_id: Uuid,
        status: FeedbackStatus,
    ) -> Result<Vec<Feedback>, StoreError>;

    async fn list_feedback_by_status(
        &self,
        status: FeedbackStatus,
    ) -> Result<Vec<Feedback>, StoreError>;

    async fn set_feedback_status(
        &self,
        id: Uuid,
        status: FeedbackStatus,
    ) -> Result<Feedback, StoreError>;
}

pub trait Store: UserStore + EventStore + RegistrationStore + FeedbackStore {}

impl<T: UserStore + EventStore + RegistrationStore + FeedbackStore> Store for T {}
