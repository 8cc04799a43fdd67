//! The two read operations the onboarding machinery depends on.

use std::future::Future;
use std::sync::Arc;

use parcsal_core::{ConnectStatus, OnboardingStatus, SubjectType};

use super::ApiError;

/// Idempotent status reads against the backend.
///
/// Implementations must not cache; callers own the freshness policy.
pub trait StatusClient: Send + Sync {
    /// `GET /onboarding/status?type={user|company}`
    fn fetch_onboarding_status(
        &self,
        subject: SubjectType,
    ) -> impl Future<Output = Result<OnboardingStatus, ApiError>> + Send;

    /// `GET /company/connect/status`. `NOT_STARTED` is a valid answer, not an error.
    fn fetch_connect_status(&self) -> impl Future<Output = Result<ConnectStatus, ApiError>> + Send;
}

impl<T: StatusClient> StatusClient for Arc<T> {
    fn fetch_onboarding_status(
        &self,
        subject: SubjectType,
    ) -> impl Future<Output = Result<OnboardingStatus, ApiError>> + Send {
        (**self).fetch_onboarding_status(subject)
    }

    fn fetch_connect_status(&self) -> impl Future<Output = Result<ConnectStatus, ApiError>> + Send {
        (**self).fetch_connect_status()
    }
}
