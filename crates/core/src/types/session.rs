//! Session model: who is logged in and with which token.

use serde::{Deserialize, Serialize};

use super::id::{CompanyId, UserId};
use super::role::Role;

/// Opaque bearer token issued by the backend.
///
/// `Debug` is redacted so tokens never end up in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccessToken(String);

impl AccessToken {
    /// Wrap a raw token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The raw token, for building an `Authorization` header.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// A blank token is the same as no token.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

/// User fields mirrored from `GET /auth/me`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: UserId,
    #[serde(default)]
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub is_email_verified: bool,
    #[serde(default)]
    pub onboarding_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<CompanyId>,
}

/// The logged-in user together with their token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub user: SessionUser,
    pub access_token: AccessToken,
}

impl Session {
    #[must_use]
    pub const fn new(user: SessionUser, access_token: AccessToken) -> Self {
        Self { user, access_token }
    }

    /// A session is usable only with a non-blank token.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.access_token.is_blank()
    }

    #[must_use]
    pub const fn role(&self) -> Role {
        self.user.role
    }

    /// Merge refreshed user fields without touching the token.
    pub fn apply(&mut self, update: &UserFieldsUpdate) {
        if let Some(role) = update.role {
            self.user.role = role;
        }
        if let Some(email) = &update.email {
            self.user.email.clone_from(email);
        }
        if let Some(verified) = update.is_email_verified {
            self.user.is_email_verified = verified;
        }
        if let Some(completed) = update.onboarding_completed {
            self.user.onboarding_completed = completed;
        }
    }
}

/// Partial update merged into a stored session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFieldsUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_email_verified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub onboarding_completed: Option<bool>,
}

impl UserFieldsUpdate {
    /// Update carrying only the onboarding flag.
    #[must_use]
    pub const fn onboarding_completed(completed: bool) -> Self {
        Self {
            role: None,
            email: None,
            is_email_verified: None,
            onboarding_completed: Some(completed),
        }
    }

    /// Everything `GET /auth/me` can change about the session.
    #[must_use]
    pub fn from_user(user: &SessionUser) -> Self {
        Self {
            role: Some(user.role),
            email: Some(user.email.clone()),
            is_email_verified: Some(user.is_email_verified),
            onboarding_completed: Some(user.onboarding_completed),
        }
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.role.is_none()
            && self.email.is_none()
            && self.is_email_verified.is_none()
            && self.onboarding_completed.is_none()
    }
}
