//! Authentication route handlers.
//!
//! The backend issues the token; this layer only keeps it in the session and
//! decides where to send the browser next.

use axum::{
    Form, Json,
    extract::State,
    response::{IntoResponse, Redirect, Response},
};
use parcsal_core::{Role, Session, UserFieldsUpdate, paths};
use serde::Deserialize;
use tracing::{info, warn};

use crate::api::{ApiError, AuthResponse, LoginRequest, RegisterRequest};
use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::middleware::{RequireSession, Sessions};
use crate::session::CookieSessionStore;
use crate::state::AppState;

/// Minimum password length accepted before calling the backend.
const MIN_PASSWORD_LEN: usize = 8;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// Where to go after login, usually the gate's redirect-back target.
    #[serde(default)]
    pub redirect: Option<String>,
}

/// Registration form data.
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub password_confirm: String,
    /// `CUSTOMER` or `COMPANY_ADMIN`.
    pub role: String,
    #[serde(default)]
    pub company_name: Option<String>,
}

/// Where to land after logging in: a safe local `redirect`, else the role home.
#[must_use]
pub fn post_login_target(redirect: Option<&str>, role: Role) -> String {
    redirect
        .filter(|target| paths::is_safe_redirect(target))
        .map_or_else(|| role.home_path().to_string(), String::from)
}

async fn start_session(store: &CookieSessionStore, auth: AuthResponse) -> Session {
    let session = Session::new(auth.user, auth.access_token);
    store.save_session(&session).await;
    set_sentry_user(&session.user.id, Some(&session.user.email));
    session
}

fn login_error(code: &str) -> Response {
    Redirect::to(&format!("{}?error={code}", paths::LOGIN)).into_response()
}

/// Handle login form submission.
pub async fn login(
    State(state): State<AppState>,
    Sessions(store): Sessions,
    Form(form): Form<LoginForm>,
) -> Response {
    let request = LoginRequest {
        email: form.email,
        password: form.password,
    };

    match state.backend().login(&request).await {
        Ok(auth) => {
            let session = start_session(&store, auth).await;
            info!(user_id = %session.user.id, role = %session.role(), "User logged in");
            let target = post_login_target(form.redirect.as_deref(), session.role());
            Redirect::to(&target).into_response()
        }
        Err(ApiError::Unauthorized) => login_error("invalid_credentials"),
        Err(e) => {
            warn!(error = %e, "Login failed");
            login_error("unavailable")
        }
    }
}

/// Handle registration form submission.
///
/// New accounts start unverified, so the browser goes to email verification.
pub async fn register(
    State(state): State<AppState>,
    Sessions(store): Sessions,
    Form(form): Form<RegisterForm>,
) -> Response {
    if form.password != form.password_confirm {
        return Redirect::to("/register?error=password_mismatch").into_response();
    }
    if form.password.len() < MIN_PASSWORD_LEN {
        return Redirect::to("/register?error=password_too_short").into_response();
    }
    let role = match form.role.parse::<Role>() {
        Ok(role @ (Role::Customer | Role::CompanyAdmin)) => role,
        _ => return Redirect::to("/register?error=invalid_role").into_response(),
    };
    if role == Role::CompanyAdmin && form.company_name.as_deref().is_none_or(str::is_empty) {
        return Redirect::to("/register?error=company_name_required").into_response();
    }

    let request = RegisterRequest {
        email: form.email,
        password: form.password,
        role,
        company_name: form.company_name.filter(|_| role == Role::CompanyAdmin),
    };

    match state.backend().register(&request).await {
        Ok(auth) => {
            let session = start_session(&store, auth).await;
            info!(user_id = %session.user.id, role = %role, "User registered");
            let target = if session.user.is_email_verified {
                role.home_path()
            } else {
                paths::VERIFY_EMAIL
            };
            Redirect::to(target).into_response()
        }
        Err(ApiError::Api { status: 409, .. }) => {
            Redirect::to("/register?error=email_taken").into_response()
        }
        Err(e) => {
            warn!(error = %e, "Registration failed");
            Redirect::to("/register?error=failed").into_response()
        }
    }
}

/// Handle logout. Safe to call when already logged out.
///
/// Any onboarding reconciliation the user left running is stopped.
pub async fn logout(State(state): State<AppState>, Sessions(store): Sessions) -> Redirect {
    if let Some(session) = store.get_session().await {
        state.reconciliations().remove(&session.user.id).await;
        info!(user_id = %session.user.id, "User logged out");
    }
    store.clear_session().await;
    clear_sentry_user();
    Redirect::to(paths::LOGIN)
}

/// Re-read the user from the backend and merge the flags into the session.
///
/// A rejected token ends the session.
pub async fn refresh(
    State(state): State<AppState>,
    RequireSession { session, store }: RequireSession,
) -> Result<Json<parcsal_core::SessionUser>> {
    let user = match state
        .backend()
        .authorized(&session.access_token)
        .current_user()
        .await
    {
        Ok(user) => user,
        Err(ApiError::Unauthorized) => {
            state.reconciliations().remove(&session.user.id).await;
            store.clear_session().await;
            clear_sentry_user();
            return Err(AppError::Unauthorized("session expired".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    let updated = store
        .update_user_fields(&UserFieldsUpdate::from_user(&user))
        .await
        .ok_or_else(|| AppError::Unauthorized("session ended during refresh".to_string()))?;
    Ok(Json(updated.user))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_login_target_prefers_safe_redirect() {
        assert_eq!(
            post_login_target(Some("/company/payouts?tab=history"), Role::CompanyAdmin),
            "/company/payouts?tab=history"
        );
    }

    #[test]
    fn test_post_login_target_rejects_open_redirects() {
        assert_eq!(
            post_login_target(Some("//evil.example"), Role::Customer),
            "/customer/dashboard"
        );
        assert_eq!(
            post_login_target(Some("https://evil.example"), Role::SuperAdmin),
            "/admin/dashboard"
        );
    }

    #[test]
    fn test_post_login_target_defaults_to_role_home() {
        assert_eq!(post_login_target(None, Role::CompanyStaff), "/company/overview");
    }
}
