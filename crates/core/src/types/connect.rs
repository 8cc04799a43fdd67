//! Payment-provider (Stripe Connect) linkage status.
//!
//! A read-through mirror of provider state. Each fetch replaces the previous
//! snapshot wholesale; nothing here is locally authoritative.

use serde::{Deserialize, Serialize};

/// How far the company got through the provider's hosted onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectOnboardingState {
    #[default]
    NotStarted,
    InProgress,
    Complete,
}

/// Snapshot from `GET /company/connect/status`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectStatus {
    #[serde(rename = "stripeAccountId", default)]
    pub provider_account_id: Option<String>,
    #[serde(rename = "stripeOnboardingStatus", default)]
    pub onboarding_state: ConnectOnboardingState,
    #[serde(rename = "chargesEnabled", default)]
    pub charges_enabled: bool,
    #[serde(rename = "payoutsEnabled", default)]
    pub payouts_enabled: bool,
}

impl ConnectStatus {
    /// The account exists and the provider lets it both charge and pay out.
    #[must_use]
    pub const fn is_fully_enabled(&self) -> bool {
        matches!(self.onboarding_state, ConnectOnboardingState::Complete)
            && self.charges_enabled
            && self.payouts_enabled
    }

    #[must_use]
    pub const fn has_account(&self) -> bool {
        self.provider_account_id.is_some()
    }
}
