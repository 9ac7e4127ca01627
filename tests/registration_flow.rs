//! End-to-end registration flow over the real router with the
//! in-memory store.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use eventra_server::auth;
use eventra_server::config::Config;
use eventra_server::models::{EventCategory, NewEvent, NewRegistration, NewUser, Role};
use eventra_server::routes::create_routes;
use eventra_server::state::AppState;
use eventra_server::store::{
    EventStore, MemoryStore, RegistrationStore, StoreError, UserStore,
};
use eventra_server::token;

fn test_config() -> Config {
    Config {
        database_url: String::new(),
        bind_addr: SocketAddr::from(([127, 0, 0, 1], 0)),
        frontend_base_url: "http://localhost:3000".to_string(),
        jwt_secret: "test-secret".to_string(),
        jwt_refresh_secret: "test-refresh-secret".to_string(),
    }
}

struct TestApp {
    app: Router,
    store: MemoryStore,
    config: Config,
}

fn test_app() -> TestApp {
    let store = MemoryStore::new();
    let config = test_config();
    let state = AppState::new(Arc::new(store.clone()), Arc::new(config.clone()));
    TestApp {
        app: create_routes(state),
        store,
        config,
    }
}

impl TestApp {
    async fn request(
        &self,
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(tok) = bearer {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {tok}"));
        }
        let request = match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes.to_vec())
    }

    async fn request_json(
        &self,
        method: Method,
        uri: &str,
        bearer: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = self.request(method, uri, bearer, body).await;
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    async fn seed_user(&self, name: &str, email: &str, role: Role) -> (Uuid, String) {
        let user = self
            .store
            .create_user(NewUser {
                name: name.to_string(),
                email: email.to_string(),
                password_hash: auth::password::hash_password("hunter2hunter2"),
                role,
            })
            .await
            .unwrap();
        let access = auth::issue_access_token(&self.config.jwt_secret, user.id, role).unwrap();
        (user.id, access)
    }

    async fn seed_event(&self, title: &str, price: Decimal) -> Uuid {
        self.store
            .create_event(NewEvent {
                title: title.to_string(),
                event_date: "2026-10-03".parse().unwrap(),
                event_time: "09:00:00".parse().unwrap(),
                description: "demo event".to_string(),
                image_path: "/uploads/demo.png".to_string(),
                category: EventCategory::Software,
                rule_book_path: None,
                price,
                registration_fields: vec!["college".to_string()],
                created_by: Uuid::new_v4(),
            })
            .await
            .unwrap()
            .id
    }
}

#[tokio::test]
async fn full_registration_lifecycle() {
    let app = test_app();
    let (_u1, u1_token) = app.seed_user("User One", "u1@example.com", Role::User).await;
    let event_id = app.seed_event("Code Sprint Finals", Decimal::ZERO).await;

    // register: 201 with a 64-char hex token expiring ~24h out
    let (status, body) = app
        .request_json(
            Method::POST,
            &format!("/api/events/{event_id}/register"),
            Some(&u1_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let data = &body["data"];
    let verification_token = data["verification_token"].as_str().unwrap().to_string();
    assert_eq!(verification_token.len(), 64);
    assert!(verification_token.bytes().all(|b| b.is_ascii_hexdigit()));
    let expires_at: chrono::DateTime<Utc> =
        data["token_expires_at"].as_str().unwrap().parse().unwrap();
    let ttl = expires_at - Utc::now();
    assert!(ttl > Duration::hours(23) && ttl <= Duration::hours(24));
    let registration_id = data["registration_id"].as_str().unwrap().to_string();

    // resolve: 200 with the event title, no token echoed back
    let (status, body) = app
        .request_json(
            Method::GET,
            &format!("/api/verify/{verification_token}"),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["event_title"], "Code Sprint Finals");
    assert_eq!(body["data"]["email"], "u1@example.com");
    assert!(body["data"].get("verification_token").is_none());
    assert!(body["data"].get("payment_status").is_none());

    // duplicate registration: 400 conflict
    let (status, body) = app
        .request_json(
            Method::POST,
            &format!("/api/events/{event_id}/register"),
            Some(&u1_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "CONFLICT");

    // cancel (unpaid): succeeds
    let (status, _) = app
        .request_json(
            Method::POST,
            &format!("/api/registrations/{registration_id}/cancel"),
            Some(&u1_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // second cancel: 400 already cancelled
    let (status, body) = app
        .request_json(
            Method::POST,
            &format!("/api/registrations/{registration_id}/cancel"),
            Some(&u1_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn register_for_missing_event_is_404() {
    let app = test_app();
    let (_u, token) = app.seed_user("User", "u@example.com", Role::User).await;
    let (status, body) = app
        .request_json(
            Method::POST,
            &format!("/api/events/{}/register", Uuid::new_v4()),
            Some(&token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn expired_and_unknown_tokens_are_indistinguishable() {
    let app = test_app();
    let event_id = app.seed_event("Drone Derby", Decimal::ZERO).await;

    let expired = token::generate();
    app.store
        .create_registration(NewRegistration {
            user_id: Uuid::new_v4(),
            event_id,
            verification_token: expired.clone(),
            token_expires_at: Utc::now() - Duration::minutes(1),
        })
        .await
        .unwrap();

    let (expired_status, expired_body) = app
        .request_json(Method::GET, &format!("/api/verify/{expired}"), None, None)
        .await;
    let unknown = token::generate();
    let (unknown_status, unknown_body) = app
        .request_json(Method::GET, &format!("/api/verify/{unknown}"), None, None)
        .await;

    assert_eq!(expired_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    // identical bodies: no way to tell "expired" from "never existed"
    assert_eq!(expired_body, unknown_body);
}

#[tokio::test]
async fn receipt_is_owner_or_admin_only() {
    let app = test_app();
    let (owner_id, owner_token) = app
        .seed_user("Owner", "owner@example.com", Role::User)
        .await;
    let (_stranger, stranger_token) = app
        .seed_user("Stranger", "stranger@example.com", Role::User)
        .await;
    let (_admin, admin_token) = app
        .seed_user("Admin", "admin@example.com", Role::Admin)
        .await;
    let event_id = app.seed_event("Capture The Flag", Decimal::new(499, 0)).await;

    let registration = app
        .store
        .create_registration(NewRegistration {
            user_id: owner_id,
            event_id,
            verification_token: token::generate(),
            token_expires_at: token::expiry(Utc::now()),
        })
        .await
        .unwrap();

    // mark it paid through the admin surface
    let (status, _) = app
        .request_json(
            Method::PATCH,
            &format!("/api/admin/registrations/{}/payment", registration.id),
            Some(&admin_token),
            Some(json!({ "payment_status": "paid" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);

    // non-owner, non-admin: 403
    let (status, body) = app
        .request_json(
            Method::GET,
            &format!("/api/registrations/{}/receipt", registration.id),
            Some(&stranger_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    // owner: gets a real PDF back
    let (status, bytes) = app
        .request(
            Method::GET,
            &format!("/api/registrations/{}/receipt", registration.id),
            Some(&owner_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(bytes.starts_with(b"%PDF"));

    // paid registrations cannot be cancelled
    let (status, body) = app
        .request_json(
            Method::POST,
            &format!("/api/registrations/{}/cancel", registration.id),
            Some(&owner_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

#[tokio::test]
async fn orphaned_registrations_are_filtered_from_dashboard() {
    let app = test_app();
    let (_user, user_token) = app.seed_user("User", "u@example.com", Role::User).await;
    let event_id = app.seed_event("Soldering 101", Decimal::ZERO).await;

    let (status, _) = app
        .request_json(
            Method::POST,
            &format!("/api/events/{event_id}/register"),
            Some(&user_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // admin deletes the event out from under the registration
    app.store.delete_event(event_id).await.unwrap();

    let (status, body) = app
        .request_json(Method::GET, "/api/registrations/mine", Some(&user_token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn fifty_concurrent_registrations_yield_one_success() {
    let store = Arc::new(MemoryStore::new());
    let event = store
        .create_event(NewEvent {
            title: "Stress Test".to_string(),
            event_date: "2026-10-03".parse().unwrap(),
            event_time: "09:00:00".parse().unwrap(),
            description: "d".to_string(),
            image_path: "/uploads/d.png".to_string(),
            category: EventCategory::Cybersecurity,
            rule_book_path: None,
            price: Decimal::ZERO,
            registration_fields: vec![],
            created_by: Uuid::new_v4(),
        })
        .await
        .unwrap();
    let user_id = Uuid::new_v4();

    let mut handles = Vec::new();
    for _ in 0..50 {
        let store = Arc::clone(&store);
        let event_id = event.id;
        handles.push(tokio::spawn(async move {
            store
                .create_registration(NewRegistration {
                    user_id,
                    event_id,
                    verification_token: token::generate(),
                    token_expires_at: token::expiry(Utc::now()),
                })
                .await
        }));
    }

    let mut successes = 0;
    let mut duplicates = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(_) => successes += 1,
            Err(StoreError::DuplicateRegistration) => duplicates += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    assert_eq!(successes, 1);
    assert_eq!(duplicates, 49);
}

#[tokio::test]
async fn auth_flow_issues_and_refreshes_tokens() {
    let app = test_app();

    let (status, _) = app
        .request_json(
            Method::POST,
            "/api/auth/register",
            None,
            Some(json!({
                "name": "Grace Hopper",
                "email": "Grace@Example.com",
                "password": "correct horse"
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);

    // email was lowercased on the way in
    let (status, body) = app
        .request_json(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "grace@example.com", "password": "correct horse" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    let refresh = body["data"]["refresh_token"].as_str().unwrap().to_string();
    assert_eq!(body["data"]["role"], "user");

    let (status, body) = app
        .request_json(
            Method::POST,
            "/api/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["access_token"].as_str().is_some());

    // wrong password: uniform 401
    let (status, _) = app
        .request_json(
            Method::POST,
            "/api/auth/login",
            None,
            Some(json!({ "email": "grace@example.com", "password": "wrong" })),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_routes_reject_plain_users() {
    let app = test_app();
    let (_u, user_token) = app.seed_user("User", "u@example.com", Role::User).await;

    let (status, body) = app
        .request_json(Method::GET, "/api/admin/users", Some(&user_token), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "FORBIDDEN");

    let (status, _) = app
        .request_json(Method::GET, "/api/admin/users", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn event_crud_via_admin_api() {
    let app = test_app();
    let (_admin, admin_token) = app
        .seed_user("Admin", "admin@example.com", Role::Admin)
        .await;

    let payload = json!({
        "title": "PCB Design Workshop",
        "date": "2026-11-20",
        "time": "14:00:00",
        "description": "Hands-on KiCad session",
        "image_path": "/uploads/pcb.png",
        "category": "HARDWARE DOMAIN EVENTS",
        "price": "150",
        "registration_fields": ["college", "year"]
    });

    let (status, body) = app
        .request_json(
            Method::POST,
            "/api/events",
            Some(&admin_token),
            Some(payload),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let event_id = body["data"]["id"].as_str().unwrap().to_string();

    // public list with category filter
    let (status, body) = app
        .request_json(
            Method::GET,
            "/api/events?category=HARDWARE%20DOMAIN%20EVENTS",
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 1);

    // bogus category is rejected at the boundary
    let (status, _) = app
        .request_json(Method::GET, "/api/events?category=KNITTING", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .request_json(
            Method::DELETE,
            &format!("/api/events/{event_id}"),
            Some(&admin_token),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
}
