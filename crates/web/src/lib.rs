//! Parcsal web access layer.
//!
//! Serves the session, admission and onboarding-reconciliation endpoints in
//! front of the Parcsal backend. Exposed as a library so the router can be
//! driven in tests.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod gate;
pub mod middleware;
pub mod onboarding;
pub mod routes;
pub mod session;
pub mod state;

use axum::{Router, http::StatusCode};
use tower_http::trace::TraceLayer;

use crate::config::ConfigError;
use crate::state::AppState;

/// Build the full application router with its middleware stack.
///
/// # Errors
///
/// Returns an error if the session layer cannot be configured.
pub fn app(state: AppState) -> Result<Router, ConfigError> {
    let session_layer = middleware::create_session_layer(state.config())?;

    Ok(routes::routes()
        .fallback(not_found)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::access_gate_middleware,
        ))
        .layer(session_layer)
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &axum::extract::Request| {
                tracing::info_span!(
                    "request",
                    method = %request.method(),
                    uri = %request.uri(),
                    request_id = tracing::field::Empty,
                )
            }),
        )
        .with_state(state))
}

/// Pages are rendered by the front end; anything admitted but unknown here is a 404.
async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}
