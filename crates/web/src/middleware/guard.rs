//! Access gate middleware.
//!
//! Every request is a navigation intent. Denied page requests are redirected
//! (`303 See Other`); denied API requests get `401` when a login is needed
//! and `403` otherwise.

use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use parcsal_core::{AccessDecision, NavigationIntent};
use tracing::debug;

use super::auth::{MissingSessionLayer, is_api_path};
use crate::error::add_breadcrumb;
use crate::gate;
use crate::session::SessionStore;
use crate::state::AppState;

pub async fn access_gate_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let intent = NavigationIntent::new(
        request.uri().path(),
        request.uri().query().map(String::from),
    );
    if state.gate().policy_for(&intent.path).is_none() {
        return next.run(request).await;
    }

    let Some(cookie_session) = request
        .extensions()
        .get::<tower_sessions::Session>()
        .cloned()
    else {
        return MissingSessionLayer.into_response();
    };
    let store = SessionStore::new(cookie_session);

    let decision = gate::admit(
        state.gate(),
        &intent,
        &store,
        state.reconciliations(),
        |token| state.backend().authorized(token),
    )
    .await;

    if decision.is_allowed() {
        return next.run(request).await;
    }
    deny(&intent, &decision)
}

fn deny(intent: &NavigationIntent, decision: &AccessDecision) -> Response {
    let reason = decision
        .denial()
        .map(|denial| denial.to_string())
        .unwrap_or_default();
    debug!(path = %intent.path, %reason, "Navigation denied");
    add_breadcrumb(
        "access",
        "Navigation denied",
        Some(&[("path", intent.path.as_str()), ("reason", reason.as_str())]),
    );

    if is_api_path(&intent.path) {
        let status = match decision {
            AccessDecision::RedirectToLogin { .. } => StatusCode::UNAUTHORIZED,
            _ => StatusCode::FORBIDDEN,
        };
        return (status, reason).into_response();
    }

    match decision.location() {
        Some(location) => Redirect::to(&location).into_response(),
        None => StatusCode::FORBIDDEN.into_response(),
    }
}
