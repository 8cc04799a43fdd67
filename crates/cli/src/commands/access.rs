//! Offline access-gate and navigation commands. No backend calls.

use parcsal_core::{
    AccessGate, AccessToken, NavTree, NavigationIntent, OnboardingEvidence, Role, Session,
    SessionUser, UserId,
};
use thiserror::Error;

/// Errors that can occur during access commands.
#[derive(Debug, Error)]
pub enum AccessError {
    /// Path is not absolute.
    #[error("Path must start with '/': {0}")]
    InvalidPath(String),
}

/// Build a hypothetical session for `role`.
fn session_for(role: Role, verified: bool, onboarded: bool) -> Session {
    Session::new(
        SessionUser {
            id: UserId::new("cli-dry-run"),
            email: String::new(),
            role,
            is_email_verified: verified,
            onboarding_completed: onboarded,
            company_id: None,
        },
        AccessToken::new("dry-run"),
    )
}

/// Print the gate's decision for `path`.
///
/// # Errors
///
/// Returns an error if `path` is not an absolute path.
pub fn gate(path: &str, role: Option<Role>, verified: bool, onboarded: bool) -> Result<(), AccessError> {
    if !path.starts_with('/') {
        return Err(AccessError::InvalidPath(path.to_string()));
    }

    let gate = AccessGate::parcsal();
    let intent = NavigationIntent::from_target(path);
    let Some(policy) = gate.policy_for(&intent.path) else {
        tracing::info!(path, "Unguarded path: allow");
        return Ok(());
    };

    let session = role.map(|role| session_for(role, verified, onboarded));
    let decision = gate.evaluate(session.as_ref(), policy, &intent, OnboardingEvidence::Cached);

    tracing::info!(?policy, "Matched policy");
    match decision.location() {
        Some(location) => tracing::info!(?decision, %location, "Denied"),
        None => tracing::info!("Allow"),
    }
    Ok(())
}

/// Print the navigation items visible to `role`.
pub fn nav(role: Role) {
    let tree = NavTree::for_role(role);
    tracing::info!(area = ?tree.area, home = role.home_path(), "Navigation");
    for item in tree.visible_items(role) {
        tracing::info!("  {:<16} {}", item.label, item.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gate_rejects_relative_path() {
        let err = gate("company/payouts", Some(Role::CompanyAdmin), true, true).unwrap_err();
        assert!(matches!(err, AccessError::InvalidPath(_)));
    }

    #[test]
    fn test_gate_accepts_guarded_and_unguarded_paths() {
        assert!(gate("/pricing", None, true, true).is_ok());
        assert!(gate("/company/payouts?tab=history", Some(Role::CompanyStaff), false, false).is_ok());
    }

    #[test]
    fn test_dry_run_session_is_valid() {
        let session = session_for(Role::CompanyAdmin, true, false);
        assert!(session.is_valid());
        assert!(!session.user.onboarding_completed);
    }
}
