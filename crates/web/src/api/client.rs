//! Parcsal backend REST client.
//!
//! [`BackendClient`] handles the unauthenticated calls (login, registration)
//! and hands out [`AuthorizedClient`]s bound to a session token for
//! everything else.

use parcsal_core::{
    AccessToken, ConnectStatus, OnboardingStatus, Role, SessionUser, SubjectType,
};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{ApiError, StatusClient};
use crate::config::ApiConfig;

/// Credentials for `POST /auth/login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Payload for `POST /auth/register`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_name: Option<String>,
}

/// Token plus user, returned by login and registration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub access_token: AccessToken,
    pub user: SessionUser,
}

/// Hosted onboarding URL from the payment provider.
#[derive(Debug, Clone, Deserialize)]
pub struct OnboardingLink {
    pub url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct OnboardingLinkRequest<'a> {
    return_url: &'a str,
    from_onboarding: bool,
}

/// Shared HTTP client for the backend. Cheap to clone.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &ApiConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ApiError::Config(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.as_str().trim_end_matches('/').to_string(),
        })
    }

    /// Client that authenticates as the holder of `token`.
    #[must_use]
    pub fn authorized(&self, token: &AccessToken) -> AuthorizedClient {
        AuthorizedClient {
            backend: self.clone(),
            token: token.clone(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Exchange credentials for a session.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` for bad credentials, or another
    /// `ApiError` if the request fails.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let response = self
            .client
            .post(self.url("/auth/login"))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }

    /// Create an account and log it in.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` if the backend rejects the registration.
    #[instrument(skip(self, request), fields(email = %request.email, role = %request.role))]
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let response = self
            .client
            .post(self.url("/auth/register"))
            .json(request)
            .send()
            .await?;
        decode(response).await
    }
}

/// Backend client bound to one session token.
#[derive(Debug, Clone)]
pub struct AuthorizedClient {
    backend: BackendClient,
    token: AccessToken,
}

impl AuthorizedClient {
    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .backend
            .client
            .get(self.backend.url(path))
            .bearer_auth(self.token.as_str())
            .send()
            .await?;
        decode(response).await
    }

    /// `GET /auth/me`: refreshed user flags.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the token is no longer valid.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<SessionUser, ApiError> {
        self.get("/auth/me").await
    }

    /// Ask the backend for a hosted payment-provider onboarding link.
    ///
    /// # Errors
    ///
    /// Returns an `ApiError` if the request fails.
    #[instrument(skip(self))]
    pub async fn create_onboarding_link(
        &self,
        return_url: &str,
        from_onboarding: bool,
    ) -> Result<OnboardingLink, ApiError> {
        let response = self
            .backend
            .client
            .post(self.backend.url("/company/connect/onboarding-link"))
            .bearer_auth(self.token.as_str())
            .json(&OnboardingLinkRequest {
                return_url,
                from_onboarding,
            })
            .send()
            .await?;
        decode(response).await
    }
}

impl StatusClient for AuthorizedClient {
    #[instrument(skip(self), fields(subject = %subject))]
    async fn fetch_onboarding_status(
        &self,
        subject: SubjectType,
    ) -> Result<OnboardingStatus, ApiError> {
        let status: OnboardingStatus = self
            .get(&format!("/onboarding/status?type={}", subject.as_str()))
            .await?;
        debug!(progress = status.progress, completed = status.completed, "Fetched onboarding status");
        Ok(status)
    }

    #[instrument(skip(self))]
    async fn fetch_connect_status(&self) -> Result<ConnectStatus, ApiError> {
        let status: ConnectStatus = self.get("/company/connect/status").await?;
        debug!(state = ?status.onboarding_state, "Fetched connect status");
        Ok(status)
    }
}

/// Map a backend response to `T` or an `ApiError`.
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, ApiError> {
    let status = response.status();

    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }

    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ApiError::Api {
            status: status.as_u16(),
            message,
        });
    }

    response
        .json()
        .await
        .map_err(|e| ApiError::Parse(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    fn backend(base: &str) -> BackendClient {
        BackendClient::new(&ApiConfig {
            base_url: url::Url::parse(base).unwrap(),
            timeout: Duration::from_secs(1),
        })
        .unwrap()
    }

    #[test]
    fn test_url_joins_without_double_slash() {
        let client = backend("http://localhost:4000/api/");
        assert_eq!(
            client.url("/onboarding/status"),
            "http://localhost:4000/api/onboarding/status"
        );
    }

    #[test]
    fn test_authorized_client_debug_redacts_token() {
        let client = backend("http://localhost:4000").authorized(&AccessToken::new("tok_secret"));
        let debug = format!("{client:?}");
        assert!(!debug.contains("tok_secret"));
    }

    #[test]
    fn test_onboarding_link_request_wire_format() {
        let json = serde_json::to_value(OnboardingLinkRequest {
            return_url: "https://app.parcsal.com/company/onboarding/payout-setup?from_stripe=true",
            from_onboarding: true,
        })
        .unwrap();
        assert_eq!(json["fromOnboarding"], true);
        assert!(json["returnUrl"].as_str().unwrap().ends_with("from_stripe=true"));
    }

    #[test]
    fn test_auth_response_parses() {
        let parsed: AuthResponse = serde_json::from_str(
            r#"{"accessToken": "tok_1", "user": {"id": "usr_1", "email": "a@b.co",
                "role": "CUSTOMER", "isEmailVerified": true, "onboardingCompleted": false}}"#,
        )
        .unwrap();
        assert_eq!(parsed.access_token.as_str(), "tok_1");
        assert_eq!(parsed.user.role, Role::Customer);
    }
}
