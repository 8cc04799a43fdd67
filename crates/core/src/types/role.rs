//! User roles and the role-derived home and onboarding paths.

use serde::{Deserialize, Serialize};

use crate::paths;
use crate::types::onboarding::SubjectType;

/// Role of an authenticated Parcsal user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    /// Shipper booking capacity.
    Customer,
    /// Owner/manager of a carrier company.
    CompanyAdmin,
    /// Employee of a carrier company with reduced permissions.
    CompanyStaff,
    /// Platform operator.
    SuperAdmin,
}

/// Top-level application area a role lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Area {
    Customer,
    Company,
    Admin,
}

impl Role {
    /// All roles, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::Customer,
        Self::CompanyAdmin,
        Self::CompanyStaff,
        Self::SuperAdmin,
    ];

    /// Landing page for this role, used after login and when a role is
    /// refused by a route group.
    #[must_use]
    pub const fn home_path(self) -> &'static str {
        match self {
            Self::Customer => paths::CUSTOMER_DASHBOARD,
            Self::CompanyAdmin | Self::CompanyStaff => paths::COMPANY_OVERVIEW,
            Self::SuperAdmin => paths::ADMIN_DASHBOARD,
        }
    }

    /// Onboarding entry point, or `None` for roles that never onboard.
    #[must_use]
    pub const fn onboarding_path(self) -> Option<&'static str> {
        match self {
            Self::Customer => Some(paths::CUSTOMER_ONBOARDING),
            Self::CompanyAdmin | Self::CompanyStaff => Some(paths::COMPANY_ONBOARDING),
            Self::SuperAdmin => None,
        }
    }

    /// Which onboarding record tracks this role's progress.
    #[must_use]
    pub const fn onboarding_subject(self) -> Option<SubjectType> {
        match self {
            Self::Customer => Some(SubjectType::User),
            Self::CompanyAdmin | Self::CompanyStaff => Some(SubjectType::Company),
            Self::SuperAdmin => None,
        }
    }

    /// Application area this role navigates in.
    #[must_use]
    pub const fn area(self) -> Area {
        match self {
            Self::Customer => Area::Customer,
            Self::CompanyAdmin | Self::CompanyStaff => Area::Company,
            Self::SuperAdmin => Area::Admin,
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Customer => write!(f, "CUSTOMER"),
            Self::CompanyAdmin => write!(f, "COMPANY_ADMIN"),
            Self::CompanyStaff => write!(f, "COMPANY_STAFF"),
            Self::SuperAdmin => write!(f, "SUPER_ADMIN"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "CUSTOMER" => Ok(Self::Customer),
            "COMPANY_ADMIN" => Ok(Self::CompanyAdmin),
            "COMPANY_STAFF" => Ok(Self::CompanyStaff),
            "SUPER_ADMIN" => Ok(Self::SuperAdmin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}
