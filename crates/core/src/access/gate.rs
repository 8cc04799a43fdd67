//! Route admission rules.
//!
//! The first matching rule wins, in this exact order:
//!
//! 1. auth required and no valid session → login (with redirect-back)
//! 2. role not allowed → the role's own home
//! 3. verification required and email unverified → verify-email
//! 4. onboarding required and incomplete → the role's onboarding entry
//! 5. allow
//!
//! [`AccessGate::evaluate`] is pure. Fetching fresher onboarding evidence is
//! the caller's job and happens before evaluation, never during it.

use crate::paths::{self, has_prefix};
use crate::types::Session;

use super::{AccessDecision, GuardTable, NavigationIntent, RouteGuardPolicy};

/// Source of the onboarding-completed flag used by rule 4.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingEvidence {
    /// Use the flag cached on the session.
    Cached,
    /// A status check made for this navigation. Trusted over the cached flag.
    Fresh(bool),
}

/// Evaluates navigations against a [`GuardTable`].
#[derive(Debug, Clone)]
pub struct AccessGate {
    table: GuardTable,
    in_progress_paths: Vec<String>,
}

impl AccessGate {
    #[must_use]
    pub const fn new(table: GuardTable) -> Self {
        Self {
            table,
            in_progress_paths: Vec::new(),
        }
    }

    /// The Parcsal route groups, with payout setup reachable mid-onboarding.
    #[must_use]
    pub fn parcsal() -> Self {
        Self::new(GuardTable::parcsal()).with_in_progress_path(paths::COMPANY_PAYOUTS)
    }

    /// Exempt an exact path from the onboarding rule.
    #[must_use]
    pub fn with_in_progress_path(mut self, path: impl Into<String>) -> Self {
        self.in_progress_paths.push(path.into());
        self
    }

    /// Policy guarding `path`, if any.
    #[must_use]
    pub fn policy_for(&self, path: &str) -> Option<&RouteGuardPolicy> {
        self.table.lookup(path)
    }

    /// Decide whether `session` may render `intent` under `policy`.
    #[must_use]
    pub fn evaluate(
        &self,
        session: Option<&Session>,
        policy: &RouteGuardPolicy,
        intent: &NavigationIntent,
        evidence: OnboardingEvidence,
    ) -> AccessDecision {
        let session = session.filter(|s| s.is_valid());
        if let Some(decision) = Self::identity_rules(session, policy, intent) {
            return decision;
        }

        let Some(session) = session else {
            return AccessDecision::Allow;
        };

        match self.pending_onboarding_path(session, policy, &intent.path) {
            Some(path) if !Self::onboarding_completed(session, evidence) => {
                AccessDecision::RedirectToOnboarding { path }
            }
            _ => AccessDecision::Allow,
        }
    }

    /// Returns `true` when rule 4 is the deciding rule, i.e. when fresh
    /// onboarding evidence could change the outcome.
    #[must_use]
    pub fn needs_onboarding_check(
        &self,
        session: Option<&Session>,
        policy: &RouteGuardPolicy,
        intent: &NavigationIntent,
    ) -> bool {
        let session = session.filter(|s| s.is_valid());
        if Self::identity_rules(session, policy, intent).is_some() {
            return false;
        }
        session.is_some_and(|s| {
            self.pending_onboarding_path(s, policy, &intent.path)
                .is_some()
        })
    }

    /// Rules 1 to 3.
    fn identity_rules(
        session: Option<&Session>,
        policy: &RouteGuardPolicy,
        intent: &NavigationIntent,
    ) -> Option<AccessDecision> {
        let Some(session) = session else {
            return policy
                .require_auth
                .then(|| AccessDecision::RedirectToLogin {
                    redirect_back: intent.target(),
                });
        };

        let role = session.role();
        if !policy.admits_role(role) {
            return Some(AccessDecision::RedirectToRoleHome {
                path: role.home_path(),
            });
        }

        if policy.require_email_verification
            && !session.user.is_email_verified
            && intent.path != paths::VERIFY_EMAIL
        {
            return Some(AccessDecision::RedirectToVerifyEmail);
        }

        None
    }

    /// Onboarding entry for rule 4, or `None` when rule 4 cannot apply here.
    fn pending_onboarding_path(
        &self,
        session: &Session,
        policy: &RouteGuardPolicy,
        path: &str,
    ) -> Option<&'static str> {
        if !policy.require_onboarding {
            return None;
        }
        let onboarding = session.role().onboarding_path()?;
        let exempt = has_prefix(path, onboarding)
            || path == paths::VERIFY_EMAIL
            || self.in_progress_paths.iter().any(|p| p == path);
        (!exempt).then_some(onboarding)
    }

    const fn onboarding_completed(session: &Session, evidence: OnboardingEvidence) -> bool {
        match evidence {
            OnboardingEvidence::Fresh(completed) => completed,
            OnboardingEvidence::Cached => session.user.onboarding_completed,
        }
    }
}

impl Default for AccessGate {
    fn default() -> Self {
        Self::parcsal()
    }
}
