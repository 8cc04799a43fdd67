//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                                - Liveness check
//!
//! # Auth
//! POST /auth/login                            - Backend login, post-login redirect
//! POST /auth/register                         - Backend registration
//! POST /auth/logout                           - Clear session
//! POST /auth/refresh                          - Re-read user flags from the backend
//!
//! # Navigation
//! GET  /api/navigation                        - Menu items for the current role
//! GET  /api/access?target=                    - Admission decision for a navigation
//!
//! # Company onboarding
//! POST /company/onboarding/connect            - Redirect to provider onboarding
//! GET  /api/onboarding/reconciliation         - Reconciliation snapshot
//! POST /api/onboarding/reconciliation/start   - Start polling (query passthrough)
//! POST /api/onboarding/reconciliation/check   - One cycle now
//! POST /api/onboarding/reconciliation/stop    - Stop polling
//! ```

pub mod auth;
pub mod navigation;
pub mod onboarding;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", post(auth::login))
        .route("/register", post(auth::register))
        .route("/logout", post(auth::logout))
        .route("/refresh", post(auth::refresh))
}

/// Create the onboarding reconciliation API router.
pub fn reconciliation_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(onboarding::status))
        .route("/start", post(onboarding::start))
        .route("/check", post(onboarding::check))
        .route("/stop", post(onboarding::stop))
}

/// Create all routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/auth", auth_routes())
        .route("/api/navigation", get(navigation::navigation))
        .route("/api/access", get(navigation::access))
        .route("/company/onboarding/connect", post(onboarding::connect))
        .nest("/api/onboarding/reconciliation", reconciliation_routes())
}

/// Liveness health check endpoint.
async fn health() -> &'static str {
    "ok"
}
