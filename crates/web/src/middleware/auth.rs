//! Session extractors.
//!
//! The access gate has already run by the time a handler executes; these
//! extractors only hand the session to the handler.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use parcsal_core::{AccessDecision, NavigationIntent, Session};

use crate::session::{CookieSessionStore, SessionStore};

/// The session store for this request, logged in or not.
pub struct Sessions(pub CookieSessionStore);

/// Returned when the session layer is not installed.
pub struct MissingSessionLayer;

impl IntoResponse for MissingSessionLayer {
    fn into_response(self) -> Response {
        tracing::error!("Session layer missing from router");
        StatusCode::INTERNAL_SERVER_ERROR.into_response()
    }
}

impl<S> FromRequestParts<S> for Sessions
where
    S: Send + Sync,
{
    type Rejection = MissingSessionLayer;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<tower_sessions::Session>()
            .cloned()
            .map(|session| Self(SessionStore::new(session)))
            .ok_or(MissingSessionLayer)
    }
}

/// Extractor that requires a logged-in session.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireSession { session, .. }: RequireSession) -> String {
///     format!("Hello, {}!", session.user.email)
/// }
/// ```
pub struct RequireSession {
    pub session: Session,
    pub store: CookieSessionStore,
}

/// Error returned when a session is required but absent.
pub enum AuthRejection {
    /// Redirect to login with a redirect-back target (HTML requests).
    RedirectToLogin(String),
    /// Unauthorized response (API requests).
    Unauthorized,
    /// Router misconfiguration.
    MissingLayer,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin(location) => Redirect::to(&location).into_response(),
            Self::Unauthorized => StatusCode::UNAUTHORIZED.into_response(),
            Self::MissingLayer => MissingSessionLayer.into_response(),
        }
    }
}

impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Sessions(store) = Sessions::from_request_parts(parts, state)
            .await
            .map_err(|_| AuthRejection::MissingLayer)?;

        // Nested routers see a stripped path.
        let uri = parts
            .extensions
            .get::<OriginalUri>()
            .map_or(&parts.uri, |original| &original.0);

        match store.get_session().await {
            Some(session) => Ok(Self { session, store }),
            None if is_api_path(uri.path()) => Err(AuthRejection::Unauthorized),
            None => {
                let intent = NavigationIntent::new(uri.path(), uri.query().map(String::from));
                let location = AccessDecision::RedirectToLogin {
                    redirect_back: intent.target(),
                }
                .location()
                .unwrap_or_else(|| parcsal_core::paths::LOGIN.to_string());
                Err(AuthRejection::RedirectToLogin(location))
            }
        }
    }
}

/// API routes answer with status codes instead of redirects.
#[must_use]
pub fn is_api_path(path: &str) -> bool {
    parcsal_core::paths::has_prefix(path, "/api")
}
