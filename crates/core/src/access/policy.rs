//! Per-route-group admission requirements.

use serde::Serialize;

use crate::types::Role;

/// Static admission requirements attached to a route group.
///
/// Declared once at composition time and evaluated fresh on every navigation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteGuardPolicy {
    /// Roles admitted by this group. Empty admits any authenticated role.
    pub allowed_roles: &'static [Role],
    pub require_auth: bool,
    pub require_email_verification: bool,
    pub require_onboarding: bool,
}

impl RouteGuardPolicy {
    /// No requirements at all.
    pub const PUBLIC: Self = Self {
        allowed_roles: &[],
        require_auth: false,
        require_email_verification: false,
        require_onboarding: false,
    };

    /// Any logged-in user, no further checks.
    pub const AUTHENTICATED: Self = Self {
        allowed_roles: &[],
        require_auth: true,
        require_email_verification: false,
        require_onboarding: false,
    };

    /// Logged-in user holding one of `roles`.
    #[must_use]
    pub const fn roles(roles: &'static [Role]) -> Self {
        Self {
            allowed_roles: roles,
            require_auth: true,
            require_email_verification: false,
            require_onboarding: false,
        }
    }

    #[must_use]
    pub const fn with_email_verification(mut self) -> Self {
        self.require_email_verification = true;
        self
    }

    #[must_use]
    pub const fn with_onboarding(mut self) -> Self {
        self.require_onboarding = true;
        self
    }

    /// Returns `true` if `role` passes the role check.
    #[must_use]
    pub fn admits_role(&self, role: Role) -> bool {
        self.allowed_roles.is_empty() || self.allowed_roles.contains(&role)
    }
}
