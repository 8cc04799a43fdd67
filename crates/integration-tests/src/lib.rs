//! Integration tests for Parcsal.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p parcsal-integration-tests
//! ```
//!
//! Everything runs in-process: [`FakeBackend`] stands in for the Parcsal
//! REST API on an ephemeral port and [`TestApp`] serves the real web router
//! against it. No database or network access is needed.
//!
//! # Test Categories
//!
//! - `status_client` - Backend client against the fake API
//! - `access_flow` - Login, guarded navigation and session handling
//! - `reconciliation_flow` - Payout onboarding polling over HTTP

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use parcsal_core::{AccessToken, Role, SessionUser, StepState, UserId};
use parcsal_web::config::{ApiConfig, OnboardingPollConfig, WebConfig};
use parcsal_web::state::AppState;
use serde::Deserialize;
use serde_json::json;
use tokio::net::TcpListener;

/// Password every fake account accepts.
pub const PASSWORD: &str = "correct-horse-battery";

/// URL the fake backend hands out for hosted provider onboarding.
pub const PROVIDER_ONBOARDING_URL: &str = "https://connect.example.test/setup/acct_test";

const SESSION_SECRET: &str =
    "integration-test-session-secret-0123456789abcdefghijklmnopqrstuvwxyz-ABCDEFGHIJKLMNOP";

#[derive(Debug, Clone)]
struct Account {
    user: SessionUser,
    token: String,
}

#[derive(Debug, Default)]
struct BackendState {
    accounts: HashMap<String, Account>,
    revoked: Vec<String>,
    payout_done: bool,
    onboarding_link_requests: Vec<serde_json::Value>,
}

/// In-process stand-in for the Parcsal REST API.
#[derive(Clone)]
pub struct FakeBackend {
    url: String,
    state: Arc<Mutex<BackendState>>,
    onboarding_fetches: Arc<AtomicUsize>,
}

#[derive(Clone)]
struct Shared {
    state: Arc<Mutex<BackendState>>,
    onboarding_fetches: Arc<AtomicUsize>,
}

impl Shared {
    fn lock(&self) -> std::sync::MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn account_for(&self, headers: &HeaderMap) -> Option<Account> {
        let token = headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")?;
        let state = self.lock();
        if state.revoked.iter().any(|t| t == token) {
            return None;
        }
        state.accounts.values().find(|a| a.token == token).cloned()
    }
}

#[derive(Debug, Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct StatusQuery {
    #[serde(rename = "type")]
    subject: String,
}

async fn login(State(shared): State<Shared>, Json(body): Json<LoginBody>) -> Response {
    let account = shared.lock().accounts.get(&body.email).cloned();
    match account {
        Some(account) if body.password == PASSWORD => Json(json!({
            "accessToken": account.token,
            "user": account.user,
        }))
        .into_response(),
        _ => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn me(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    match shared.account_for(&headers) {
        Some(account) => {
            let mut user = account.user;
            user.onboarding_completed = shared.lock().payout_done;
            Json(user).into_response()
        }
        None => StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn onboarding_status(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<StatusQuery>,
) -> Response {
    if shared.account_for(&headers).is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    shared.onboarding_fetches.fetch_add(1, Ordering::SeqCst);
    if query.subject != "company" {
        return (StatusCode::BAD_REQUEST, "unsupported subject").into_response();
    }

    let done = shared.lock().payout_done;
    let step = |completed| StepState {
        completed,
        completed_at: None,
    };
    Json(json!({
        "steps": {
            "company_profile": step(true),
            "payment_setup": step(true),
            "payout_setup": step(done),
            "first_shipment_slot": step(true),
        },
        "completed": done,
        "progress": if done { 100 } else { 50 },
    }))
    .into_response()
}

async fn connect_status(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    if shared.account_for(&headers).is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    let done = shared.lock().payout_done;
    Json(json!({
        "stripeAccountId": "acct_test",
        "stripeOnboardingStatus": if done { "COMPLETE" } else { "IN_PROGRESS" },
        "chargesEnabled": done,
        "payoutsEnabled": done,
    }))
    .into_response()
}

async fn onboarding_link(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<serde_json::Value>,
) -> Response {
    if shared.account_for(&headers).is_none() {
        return StatusCode::UNAUTHORIZED.into_response();
    }
    shared.lock().onboarding_link_requests.push(body);
    Json(json!({ "url": PROVIDER_ONBOARDING_URL })).into_response()
}

async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

impl FakeBackend {
    /// Serve a fresh fake API on an ephemeral port.
    pub async fn spawn() -> Self {
        let shared = Shared {
            state: Arc::new(Mutex::new(BackendState::default())),
            onboarding_fetches: Arc::new(AtomicUsize::new(0)),
        };
        let router = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/me", get(me))
            .route("/onboarding/status", get(onboarding_status))
            .route("/company/connect/status", get(connect_status))
            .route("/company/connect/onboarding-link", post(onboarding_link))
            .with_state(shared.clone());

        Self {
            url: serve(router).await,
            state: shared.state,
            onboarding_fetches: shared.onboarding_fetches,
        }
    }

    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Register an account and return its token.
    pub fn add_account(&self, email: &str, role: Role, verified: bool) -> AccessToken {
        let token = format!("tok_{}", email.replace(['@', '.'], "_"));
        let user = SessionUser {
            id: UserId::new(format!("usr_{}", email.split('@').next().unwrap_or(email))),
            email: email.to_string(),
            role,
            is_email_verified: verified,
            onboarding_completed: false,
            company_id: None,
        };
        self.lock().accounts.insert(
            email.to_string(),
            Account {
                user,
                token: token.clone(),
            },
        );
        AccessToken::new(token)
    }

    /// Mark the payout step (and with it all of onboarding) done or not.
    pub fn set_payout_done(&self, done: bool) {
        self.lock().payout_done = done;
    }

    /// Make the backend reject `token` from now on.
    pub fn revoke(&self, token: &AccessToken) {
        self.lock().revoked.push(token.as_str().to_string());
    }

    #[must_use]
    pub fn onboarding_fetches(&self) -> usize {
        self.onboarding_fetches.load(Ordering::SeqCst)
    }

    /// Bodies of `POST /company/connect/onboarding-link` calls so far.
    #[must_use]
    pub fn onboarding_link_requests(&self) -> Vec<serde_json::Value> {
        self.lock().onboarding_link_requests.clone()
    }

    #[must_use]
    pub fn api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: url::Url::parse(&self.url).unwrap(),
            timeout: Duration::from_secs(5),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BackendState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// The web router served against a [`FakeBackend`], plus a cookie-keeping
/// browser that does not follow redirects.
pub struct TestApp {
    pub url: String,
    pub backend: FakeBackend,
    pub browser: reqwest::Client,
}

impl TestApp {
    /// Serve with polling fast enough for real-time tests.
    pub async fn spawn() -> Self {
        Self::spawn_with(OnboardingPollConfig {
            interval: Duration::from_millis(50),
            max_polling_time: Duration::from_secs(5),
        })
        .await
    }

    pub async fn spawn_with(onboarding: OnboardingPollConfig) -> Self {
        let backend = FakeBackend::spawn().await;
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let url = format!("http://{addr}");

        let config = WebConfig {
            host: addr.ip(),
            port: addr.port(),
            base_url: url.clone(),
            session_secret: SESSION_SECRET.to_string().into(),
            api: backend.api_config(),
            onboarding,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 0.0,
            sentry_traces_sample_rate: 0.0,
        };
        let app = parcsal_web::app(AppState::new(config).unwrap()).unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let browser = reqwest::Client::builder()
            .cookie_store(true)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .unwrap();

        Self {
            url,
            backend,
            browser,
        }
    }

    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.url)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.browser.get(self.url(path)).send().await.unwrap()
    }

    pub async fn post(&self, path: &str) -> reqwest::Response {
        self.browser.post(self.url(path)).send().await.unwrap()
    }

    /// Submit the login form.
    pub async fn login(&self, email: &str, redirect: Option<&str>) -> reqwest::Response {
        let mut form = vec![("email", email), ("password", PASSWORD)];
        if let Some(target) = redirect {
            form.push(("redirect", target));
        }
        self.browser
            .post(self.url("/auth/login"))
            .form(&form)
            .send()
            .await
            .unwrap()
    }
}

/// `Location` header of a redirect response.
#[must_use]
pub fn location(response: &reqwest::Response) -> String {
    response
        .headers()
        .get(reqwest::header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}
