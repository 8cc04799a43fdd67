//! Well-known application paths.
//!
//! Redirect targets produced by the access gate and the post-login flow.
//! These must stay in sync with the pages served by the front end.

/// Login page. The gate appends `?redirect=<path>` when bouncing a request.
pub const LOGIN: &str = "/login";

/// Email verification page.
pub const VERIFY_EMAIL: &str = "/verify-email";

/// Customer home.
pub const CUSTOMER_DASHBOARD: &str = "/customer/dashboard";

/// Company home (both company roles).
pub const COMPANY_OVERVIEW: &str = "/company/overview";

/// Platform admin home.
pub const ADMIN_DASHBOARD: &str = "/admin/dashboard";

/// Customer onboarding entry point.
pub const CUSTOMER_ONBOARDING: &str = "/customer/onboarding";

/// Company onboarding entry point.
pub const COMPANY_ONBOARDING: &str = "/company/onboarding";

/// Company payout setup page. Part of onboarding, so reachable before it completes.
pub const COMPANY_PAYOUTS: &str = "/company/payouts";

/// Page the payment provider sends company admins back to.
pub const COMPANY_PAYOUT_SETUP_RETURN: &str = "/company/onboarding/payout-setup";

/// Query parameter carrying the redirect-back target on the login page.
pub const REDIRECT_PARAM: &str = "redirect";

/// Returns `true` if `path` is `prefix` itself or lies beneath it.
///
/// Matching is segment-aware: `/company/onboarding-extra` is not under
/// `/company/onboarding`.
#[must_use]
pub fn has_prefix(path: &str, prefix: &str) -> bool {
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/') || prefix.ends_with('/'),
        None => false,
    }
}

/// Returns `true` if `target` is safe to redirect to after login.
///
/// Only local absolute paths qualify. Protocol-relative (`//host`) and
/// backslash tricks are rejected to prevent open redirects.
#[must_use]
pub fn is_safe_redirect(target: &str) -> bool {
    target.starts_with('/')
        && !target.starts_with("//")
        && !target.starts_with("/\\")
        && !target.contains(['\r', '\n'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_prefix_is_segment_aware() {
        assert!(has_prefix("/company/onboarding", COMPANY_ONBOARDING));
        assert!(has_prefix("/company/onboarding/payout-setup", COMPANY_ONBOARDING));
        assert!(!has_prefix("/company/onboarding-extra", COMPANY_ONBOARDING));
        assert!(!has_prefix("/customer", "/company"));
    }

    #[test]
    fn test_has_prefix_root() {
        assert!(has_prefix("/anything", "/"));
    }

    #[test]
    fn test_is_safe_redirect() {
        assert!(is_safe_redirect("/company/payouts"));
        assert!(is_safe_redirect("/customer/bookings?page=2"));
        assert!(!is_safe_redirect("https://evil.example"));
        assert!(!is_safe_redirect("//evil.example"));
        assert!(!is_safe_redirect("/\\evil.example"));
        assert!(!is_safe_redirect(""));
    }
}
