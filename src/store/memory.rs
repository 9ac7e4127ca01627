//! In-memory store used by the test suite.
//!
//! A single mutex guards all tables, so the check-then-insert in
//! [`create_registration`](super::RegistrationStore::create_registration)
//! is exactly as atomic as the Postgres transaction it stands in for.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use uuid::Uuid;

use super::{EventStore, FeedbackStore, RegistrationStore, StoreError, UserStore};
use crate::models::{
    Event, EventCategory, Feedback, FeedbackStatus, NewEvent, NewFeedback, NewRegistration,
    NewUser, PaymentStatus, Registration, RegistrationStatus, User,
};
use crate::token;

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    events: HashMap<Uuid, Event>,
    registrations: HashMap<Uuid, Registration>,
    feedback: HashMap<Uuid, Feedback>,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new: NewUser) -> Result<User, StoreError> {
        let mut tables = self.lock();
        if tables.users.values().any(|u| u.email == new.email) {
            return Err(StoreError::EmailTaken);
        }
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: new.name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            refresh_token_hash: None,
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.lock().users.get(&id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self
            .lock()
            .users
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn set_refresh_token_hash(
        &self,
        id: Uuid,
        hash: Option<String>,
    ) -> Result<(), StoreError> {
        let mut tables = self.lock();
        let user = tables.users.get_mut(&id).ok_or(StoreError::UserNotFound)?;
        user.refresh_token_hash = hash;
        user.updated_at = Utc::now();
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.lock().users.values().cloned().collect();
        users.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(users)
    }
}

#[async_trait]
impl EventStore for MemoryStore {
    async fn create_event(&self, new: NewEvent) -> Result<Event, StoreError> {
        let now = Utc::now();
        let event = Event {
            id: Uuid::new_v4(),
            title: new.title,
            event_date: new.event_date,
            event_time: new.event_time,
            description: new.description,
            image_path: new.image_path,
            category: new.category,
            rule_book_path: new.rule_book_path,
            price: new.price,
            registration_fields: Json(new.registration_fields),
            created_by: new.created_by,
            created_at: now,
            updated_at: now,
        };
        self.lock().events.insert(event.id, event.clone());
        Ok(event)
    }

    async fn update_event(&self, id: Uuid, new: NewEvent) -> Result<Event, StoreError> {
        let mut tables = self.lock();
        let event = tables.events.get_mut(&id).ok_or(StoreError::EventNotFound)?;
        event.title = new.title;
        event.event_date = new.event_date;
        event.event_time = new.event_time;
        event.description = new.description;
        event.image_path = new.image_path;
        event.category = new.category;
        event.rule_book_path = new.rule_book_path;
        event.price = new.price;
        event.registration_fields = Json(new.registration_fields);
        event.updated_at = Utc::now();
        Ok(event.clone())
    }

    async fn delete_event(&self, id: Uuid) -> Result<(), StoreError> {
        // No cascade into registrations, matching the schema.
        self.lock()
            .events
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::EventNotFound)
    }

    async fn find_event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        Ok(self.lock().events.get(&id).cloned())
    }

    async fn list_events(
        &self,
        category: Option<EventCategory>,
    ) -> Result<Vec<Event>, StoreError> {
        let mut events: Vec<Event> = self
            .lock()
            .events
            .values()
            .filter(|e| category.map_or(true, |c| e.category == c))
            .cloned()
            .collect();
        events.sort_by_key(|e| e.event_date);
        Ok(events)
    }
}

#[async_trait]
impl RegistrationStore for MemoryStore {
    async fn create_registration(
        &self,
        new: NewRegistration,
    ) -> Result<Registration, StoreError> {
        let mut tables = self.lock();

        if !tables.events.contains_key(&new.event_id) {
            return Err(StoreError::EventNotFound);
        }

        let duplicate = tables.registrations.values().any(|r| {
            r.user_id == new.user_id
                && r.event_id == new.event_id
                && r.status != RegistrationStatus::Cancelled
        });
        if duplicate {
            return Err(StoreError::DuplicateRegistration);
        }

        let now = Utc::now();
        let registration = Registration {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            event_id: new.event_id,
            registered_at: now,
            verification_token: new.verification_token,
            token_expires_at: new.token_expires_at,
            status: RegistrationStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            created_at: now,
            updated_at: now,
        };
        tables
            .registrations
            .insert(registration.id, registration.clone());
        Ok(registration)
    }

    async fn find_registration(&self, id: Uuid) -> Result<Option<Registration>, StoreError> {
        Ok(self.lock().registrations.get(&id).cloned())
    }

    async fn find_by_valid_token(
        &self,
        candidate: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Registration>, StoreError> {
        Ok(self
            .lock()
            .registrations
            .values()
            .find(|r| token::compare(candidate, &r.verification_token) && r.token_expires_at > now)
            .cloned())
    }

    async fn list_registrations_for_user(
        &self,
        user_id: Uuid,
    ) -> Result<Vec<Registration>, StoreError> {
        let mut regs: Vec<Registration> = self
            .lock()
            .registrations
            .values()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect();
        regs.sort_by(|a, b| b.registered_at.cmp(&a.registered_at));
        Ok(regs)
    }

    async fn list_registrations_for_event(
        &self,
        event_id: Uuid,
    ) -> Result<Vec<Registration>, StoreError> {
        let mut regs: Vec<Registration> = self
            .lock()
            .registrations
            .values()
            .filter(|r| r.event_id == event_id)
            .cloned()
            .collect();
        regs.sort_by(|a, b| b.registered_at.cmp(&a.registered_at));
        Ok(regs)
    }

    async fn list_all_registrations(&self) -> Result<Vec<Registration>, StoreError> {
        let mut regs: Vec<Registration> = self.lock().registrations.values().cloned().collect();
        regs.sort_by(|a, b| b.registered_at.cmp(&a.registered_at));
        Ok(regs)
    }

    async fn cancel_registration(&self, id: Uuid) -> Result<Registration, StoreError> {
        let mut tables = self.lock();
        let registration = tables
            .registrations
            .get_mut(&id)
            .ok_or(StoreError::RegistrationNotFound)?;

        if registration.status == RegistrationStatus::Cancelled {
            return Err(StoreError::AlreadyCancelled);
        }
        if registration.payment_status != PaymentStatus::Unpaid {
            return Err(StoreError::AlreadyPaid);
        }

        registration.status = RegistrationStatus::Cancelled;
        registration.updated_at = Utc::now();
        Ok(registration.clone())
    }

    async fn set_payment_status(
        &self,
        id: Uuid,
        status: PaymentStatus,
    ) -> Result<Registration, StoreError> {
        let mut tables = self.lock();
        let registration = tables
            .registrations
            .get_mut(&id)
            .ok_or(StoreError::RegistrationNotFound)?;
        registration.payment_status = status;
        registration.updated_at = Utc::now();
        Ok(registration.clone())
    }
}

#[async_trait]
impl FeedbackStore for MemoryStore {
    async fn submit_feedback(&self, new: NewFeedback) -> Result<Feedback, StoreError> {
        let mut tables = self.lock();
        let duplicate = tables
            .feedback
            .values()
            .any(|f| f.user_id == new.user_id && f.event_id == new.event_id);
        if duplicate {
            return Err(StoreError::DuplicateFeedback);
        }

        let feedback = Feedback {
            id: Uuid::new_v4(),
            user_id: new.user_id,
            event_id: new.event_id,
            body: new.body,
            rating: new.rating,
            status: FeedbackStatus::Pending,
            submitted_at: Utc::now(),
        };
        tables.feedback.insert(feedback.id, feedback.clone());
        Ok(feedback)
    }

    async fn list_feedback_for_event(
        &self,
        event_id: Uuid,
        status: FeedbackStatus,
    ) -> Result<Vec<Feedback>, StoreError> {
        let mut items: Vec<Feedback> = self
            .lock()
            .feedback
            .values()
            .filter(|f| f.event_id == event_id && f.status == status)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.submitted_at.cmp(&a.submitted_at));
        Ok(items)
    }

    async fn list_feedback_by_status(
        &self,
        status: FeedbackStatus,
    ) -> Result<Vec<Feedback>, StoreError> {
        let mut items: Vec<Feedback> = self
            .lock()
            .feedback
            .values()
            .filter(|f| f.status == status)
            .cloned()
            .collect();
        items.sort_by_key(|f| f.submitted_at);
        Ok(items)
    }

    async fn set_feedback_status(
        &self,
        id: Uuid,
        status: FeedbackStatus,
    ) -> Result<Feedback, StoreError> {
        let mut tables = self.lock();
        let feedback = tables
            .feedback
            .get_mut(&id)
            .ok_or(StoreError::FeedbackNotFound)?;
        feedback.status = status;
        Ok(feedback.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rust_decimal::Decimal;

    async fn sample_event(store: &MemoryStore) -> Event {
        store
            .create_event(NewEvent {
                title: "Autonomous Rover Challenge".into(),
                event_date: "2026-09-12".parse().unwrap(),
                event_time: "10:30:00".parse().unwrap(),
                description: "Line-following rovers".into(),
                image_path: "/uploads/rover.png".into(),
                category: EventCategory::Robotics,
                rule_book_path: None,
                price: Decimal::ZERO,
                registration_fields: vec!["team_name".into()],
                created_by: Uuid::new_v4(),
            })
            .await
            .unwrap()
    }

    fn fresh_registration(user_id: Uuid, event_id: Uuid) -> NewRegistration {
        NewRegistration {
            user_id,
            event_id,
            verification_token: token::generate(),
            token_expires_at: token::expiry(Utc::now()),
        }
    }

    #[tokio::test]
    async fn duplicate_registration_is_rejected() {
        let store = MemoryStore::new();
        let event = sample_event(&store).await;
        let user_id = Uuid::new_v4();

        assert!(store
            .create_registration(fresh_registration(user_id, event.id))
            .await
            .is_ok());
        assert!(matches!(
            store
                .create_registration(fresh_registration(user_id, event.id))
                .await,
            Err(StoreError::DuplicateRegistration)
        ));
    }

    #[tokio::test]
    async fn missing_event_aborts_registration() {
        let store = MemoryStore::new();
        assert!(matches!(
            store
                .create_registration(fresh_registration(Uuid::new_v4(), Uuid::new_v4()))
                .await,
            Err(StoreError::EventNotFound)
        ));
    }

    #[tokio::test]
    async fn cancelled_registration_frees_the_pair() {
        let store = MemoryStore::new();
        let event = sample_event(&store).await;
        let user_id = Uuid::new_v4();

        let reg = store
            .create_registration(fresh_registration(user_id, event.id))
            .await
            .unwrap();

        store.cancel_registration(reg.id).await.unwrap();
        assert!(matches!(
            store.cancel_registration(reg.id).await,
            Err(StoreError::AlreadyCancelled)
        ));

        // re-registering after cancellation is allowed
        assert!(store
            .create_registration(fresh_registration(user_id, event.id))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn paid_registration_cannot_be_cancelled() {
        let store = MemoryStore::new();
        let event = sample_event(&store).await;

        let reg = store
            .create_registration(fresh_registration(Uuid::new_v4(), event.id))
            .await
            .unwrap();

        store
            .set_payment_status(reg.id, PaymentStatus::Paid)
            .await
            .unwrap();
        assert!(matches!(
            store.cancel_registration(reg.id).await,
            Err(StoreError::AlreadyPaid)
        ));
    }

    #[tokio::test]
    async fn expired_token_does_not_resolve() {
        let store = MemoryStore::new();
        let event = sample_event(&store).await;
        let tok = token::generate();

        store
            .create_registration(NewRegistration {
                user_id: Uuid::new_v4(),
                event_id: event.id,
                verification_token: tok.clone(),
                token_expires_at: Utc::now() - Duration::minutes(1),
            })
            .await
            .unwrap();

        assert!(store
            .find_by_valid_token(&tok, Utc::now())
            .await
            .unwrap()
            .is_none());
        assert!(store
            .find_by_valid_token(&token::generate(), Utc::now())
            .await
            .unwrap()
            .is_none());
    }
}
