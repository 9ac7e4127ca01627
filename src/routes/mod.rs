use axum::routing::{get, patch, post};
use axum::Router;

use crate::config::{create_cors_layer, create_security_headers_layer};
use crate::handlers::{admin, auth, events, feedback, health_check, registrations, verification};
use crate::state::AppState;

pub fn create_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // auth
        .route("/api/auth/register", post(auth::register))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/logout", post(auth::logout))
        // events
        .route(
            "/api/events",
            get(events::list_events).post(events::create_event),
        )
        .route(
            "/api/events/:id",
            get(events::get_event)
                .put(events::update_event)
                .delete(events::delete_event),
        )
        .route(
            "/api/events/:id/register",
            post(registrations::register_for_event),
        )
        .route(
            "/api/events/:id/registrants",
            get(registrations::event_registrants),
        )
        .route("/api/events/:id/feedback", get(feedback::event_feedback))
        // registrations
        .route(
            "/api/registrations/mine",
            get(registrations::my_registrations),
        )
        .route(
            "/api/registrations/:id/cancel",
            post(registrations::cancel_registration),
        )
        .route(
            "/api/registrations/:id/receipt",
            get(registrations::receipt),
        )
        // verification (public, scanned from the QR)
        .route("/api/verify/:token", get(verification::resolve))
        // feedback
        .route("/api/feedback", post(feedback::submit_feedback))
        // admin
        .route("/api/admin/users", get(admin::list_users))
        .route("/api/admin/registrations", get(admin::list_registrations))
        .route(
            "/api/admin/registrations/:id/payment",
            patch(admin::set_payment_status),
        )
        .route("/api/admin/feedback", get(admin::pending_feedback))
        .route("/api/admin/feedback/:id", patch(admin::moderate_feedback))
        .layer(create_security_headers_layer())
        .layer(create_cors_layer())
        .with_state(state)
}
