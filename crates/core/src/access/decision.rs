//! Admission decisions and the denial taxonomy.

use serde::Serialize;
use thiserror::Error;

use crate::paths;

/// Outcome of evaluating a navigation against a route guard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum AccessDecision {
    Allow,
    /// Carries the originally requested path (and query) to come back to.
    RedirectToLogin { redirect_back: String },
    RedirectToVerifyEmail,
    RedirectToOnboarding { path: &'static str },
    RedirectToRoleHome { path: &'static str },
}

/// Why a navigation was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessDenial {
    #[error("authentication required")]
    AuthMissing,
    #[error("role not permitted for this area")]
    RoleForbidden,
    #[error("email verification required")]
    VerificationRequired,
    #[error("onboarding incomplete")]
    OnboardingIncomplete,
}

impl AccessDecision {
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    /// Where to send the browser, or `None` when access is allowed.
    #[must_use]
    pub fn location(&self) -> Option<String> {
        match self {
            Self::Allow => None,
            Self::RedirectToLogin { redirect_back } => Some(format!(
                "{}?{}={}",
                paths::LOGIN,
                paths::REDIRECT_PARAM,
                urlencoding::encode(redirect_back)
            )),
            Self::RedirectToVerifyEmail => Some(paths::VERIFY_EMAIL.to_string()),
            Self::RedirectToOnboarding { path } | Self::RedirectToRoleHome { path } => {
                Some((*path).to_string())
            }
        }
    }

    /// The denial this decision represents, if any.
    #[must_use]
    pub const fn denial(&self) -> Option<AccessDenial> {
        match self {
            Self::Allow => None,
            Self::RedirectToLogin { .. } => Some(AccessDenial::AuthMissing),
            Self::RedirectToVerifyEmail => Some(AccessDenial::VerificationRequired),
            Self::RedirectToOnboarding { .. } => Some(AccessDenial::OnboardingIncomplete),
            Self::RedirectToRoleHome { .. } => Some(AccessDenial::RoleForbidden),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_location_encodes_redirect_back() {
        let decision = AccessDecision::RedirectToLogin {
            redirect_back: "/company/payouts?tab=history".to_string(),
        };
        assert_eq!(
            decision.location().as_deref(),
            Some("/login?redirect=%2Fcompany%2Fpayouts%3Ftab%3Dhistory")
        );
        assert_eq!(decision.denial(), Some(AccessDenial::AuthMissing));
    }

    #[test]
    fn test_allow_has_no_location() {
        assert_eq!(AccessDecision::Allow.location(), None);
        assert_eq!(AccessDecision::Allow.denial(), None);
    }

    #[test]
    fn test_role_home_location() {
        let decision = AccessDecision::RedirectToRoleHome {
            path: paths::COMPANY_OVERVIEW,
        };
        assert_eq!(decision.location().as_deref(), Some("/company/overview"));
        assert_eq!(decision.denial(), Some(AccessDenial::RoleForbidden));
    }
}
