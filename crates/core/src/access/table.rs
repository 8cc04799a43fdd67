//! Route-group table mapping path prefixes to guard policies.

use crate::paths::{self, has_prefix};
use crate::types::Role;

use super::RouteGuardPolicy;

const CUSTOMER_ONLY: &[Role] = &[Role::Customer];
const COMPANY_ROLES: &[Role] = &[Role::CompanyAdmin, Role::CompanyStaff];
const COMPANY_ADMIN_ONLY: &[Role] = &[Role::CompanyAdmin];
const SUPER_ADMIN_ONLY: &[Role] = &[Role::SuperAdmin];

/// Ordered set of route groups. Lookups pick the longest matching prefix.
#[derive(Debug, Clone, Default)]
pub struct GuardTable {
    groups: Vec<(String, RouteGuardPolicy)>,
}

impl GuardTable {
    /// Empty table: every path is unguarded.
    #[must_use]
    pub const fn new() -> Self {
        Self { groups: Vec::new() }
    }

    /// Register a route group. A later entry with the same prefix replaces the earlier one.
    #[must_use]
    pub fn with_group(mut self, prefix: impl Into<String>, policy: RouteGuardPolicy) -> Self {
        let prefix = prefix.into();
        self.groups.retain(|(existing, _)| *existing != prefix);
        self.groups.push((prefix, policy));
        // Longest prefix first so the first hit is the most specific group.
        self.groups.sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()));
        self
    }

    /// The Parcsal customer/company/admin route groups.
    #[must_use]
    pub fn parcsal() -> Self {
        let customer = RouteGuardPolicy::roles(CUSTOMER_ONLY).with_email_verification();
        let company = RouteGuardPolicy::roles(COMPANY_ROLES)
            .with_email_verification()
            .with_onboarding();
        let company_admin = RouteGuardPolicy::roles(COMPANY_ADMIN_ONLY)
            .with_email_verification()
            .with_onboarding();

        Self::new()
            .with_group("/customer", customer)
            .with_group("/company", company)
            .with_group(paths::COMPANY_PAYOUTS, company_admin)
            .with_group("/company/team", company_admin)
            .with_group("/admin", RouteGuardPolicy::roles(SUPER_ADMIN_ONLY))
            .with_group(paths::VERIFY_EMAIL, RouteGuardPolicy::AUTHENTICATED)
            .with_group("/api/onboarding", RouteGuardPolicy::roles(COMPANY_ADMIN_ONLY))
            .with_group("/api/navigation", RouteGuardPolicy::AUTHENTICATED)
    }

    /// Policy for `path`, or `None` when no group covers it.
    #[must_use]
    pub fn lookup(&self, path: &str) -> Option<&RouteGuardPolicy> {
        self.groups
            .iter()
            .find(|(prefix, _)| has_prefix(path, prefix))
            .map(|(_, policy)| policy)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RouteGuardPolicy)> {
        self.groups.iter().map(|(prefix, policy)| (prefix.as_str(), policy))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_longest_prefix_wins() {
        let table = GuardTable::parcsal();
        let payouts = table.lookup("/company/payouts").expect("payouts guarded");
        assert_eq!(payouts.allowed_roles, COMPANY_ADMIN_ONLY);

        let overview = table.lookup("/company/overview").expect("company guarded");
        assert_eq!(overview.allowed_roles, COMPANY_ROLES);
    }

    #[test]
    fn test_unguarded_paths() {
        let table = GuardTable::parcsal();
        assert!(table.lookup("/").is_none());
        assert!(table.lookup("/login").is_none());
        assert!(table.lookup("/companyx").is_none());
    }

    #[test]
    fn test_with_group_replaces_same_prefix() {
        let table = GuardTable::new()
            .with_group("/x", RouteGuardPolicy::PUBLIC)
            .with_group("/x", RouteGuardPolicy::AUTHENTICATED);
        assert_eq!(table.iter().count(), 1);
        assert_eq!(table.lookup("/x/y"), Some(&RouteGuardPolicy::AUTHENTICATED));
    }

    #[test]
    fn test_admin_area_skips_verification_and_onboarding() {
        let table = GuardTable::parcsal();
        let admin = table.lookup("/admin/dashboard").expect("admin guarded");
        assert!(admin.require_auth);
        assert!(!admin.require_email_verification);
        assert!(!admin.require_onboarding);
    }
}
