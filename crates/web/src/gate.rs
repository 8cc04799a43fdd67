//! Admission for one navigation: gather evidence, then evaluate.
//!
//! Evaluation itself is pure ([`AccessGate::evaluate`]). This module does the
//! async part that may precede it: reading the session and, only when the
//! onboarding rule can decide the outcome, refreshing onboarding status.

use parcsal_core::{
    AccessDecision, AccessGate, AccessToken, NavigationIntent, OnboardingEvidence, Session,
    UserFieldsUpdate,
};
use tracing::{debug, warn};

use crate::api::{ApiError, StatusClient};
use crate::onboarding::ReconciliationRegistry;
use crate::session::{SessionBackend, SessionStore};

/// Decide whether the current session may proceed to `intent`. Never errors.
///
/// - No guard for the path: allow without touching the session.
/// - Onboarding evidence is fetched at most once, and only when rule 4 is
///   reachable. A completed snapshot from an active reconciliation is used
///   instead of fetching.
/// - `Unauthorized` from the backend drops the session and any reconciliation
///   of its user, then sends the user to login.
/// - Any other fetch failure falls back to the cached session flag.
pub async fn admit<B, C, F>(
    gate: &AccessGate,
    intent: &NavigationIntent,
    store: &SessionStore<B>,
    registry: &ReconciliationRegistry<C>,
    client_for: F,
) -> AccessDecision
where
    B: SessionBackend,
    C: StatusClient + 'static,
    F: FnOnce(&AccessToken) -> C,
{
    let Some(policy) = gate.policy_for(&intent.path) else {
        return AccessDecision::Allow;
    };

    let session = store.get_session().await;
    let evidence = match &session {
        Some(current) if gate.needs_onboarding_check(Some(current), policy, intent) => {
            match onboarding_evidence(current, store, registry, client_for).await {
                Ok(evidence) => evidence,
                Err(ApiError::Unauthorized) => {
                    debug!(path = %intent.path, "Backend rejected session token");
                    registry.remove(&current.user.id).await;
                    store.clear_session().await;
                    return AccessDecision::RedirectToLogin {
                        redirect_back: intent.target(),
                    };
                }
                Err(e) => {
                    warn!(error = %e, "Onboarding check failed, using cached flag");
                    OnboardingEvidence::Cached
                }
            }
        }
        _ => OnboardingEvidence::Cached,
    };

    gate.evaluate(session.as_ref(), policy, intent, evidence)
}

async fn onboarding_evidence<B, C, F>(
    session: &Session,
    store: &SessionStore<B>,
    registry: &ReconciliationRegistry<C>,
    client_for: F,
) -> Result<OnboardingEvidence, ApiError>
where
    B: SessionBackend,
    C: StatusClient + 'static,
    F: FnOnce(&AccessToken) -> C,
{
    let Some(subject) = session.role().onboarding_subject() else {
        return Ok(OnboardingEvidence::Cached);
    };

    let recent = registry.recent_status(&session.user.id, subject).await;
    let completed = if recent.is_some_and(|status| status.completed) {
        debug!("Using completed status from active reconciliation");
        true
    } else {
        client_for(&session.access_token)
            .fetch_onboarding_status(subject)
            .await?
            .completed
    };

    if completed != session.user.onboarding_completed {
        debug!(completed, "Refreshing cached onboarding flag");
        store
            .update_user_fields(&UserFieldsUpdate::onboarding_completed(completed))
            .await;
    }
    Ok(OnboardingEvidence::Fresh(completed))
}
