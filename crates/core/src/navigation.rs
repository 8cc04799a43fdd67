//! Per-area navigation trees.
//!
//! Item visibility is decided by role only. Whether the target route is
//! actually reachable is the access gate's call; the tests below keep the
//! two in agreement.

use serde::Serialize;

use crate::paths;
use crate::types::{Area, Role};

const COMPANY_ROLES: &[Role] = &[Role::CompanyAdmin, Role::CompanyStaff];

/// A single sidebar/menu entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavItem {
    pub label: &'static str,
    pub path: &'static str,
    #[serde(skip)]
    pub roles: &'static [Role],
}

impl NavItem {
    const fn new(label: &'static str, path: &'static str, roles: &'static [Role]) -> Self {
        Self { label, path, roles }
    }

    /// Returns `true` if `role` should see this item.
    #[must_use]
    pub fn is_visible_to(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

const CUSTOMER_ITEMS: &[NavItem] = &[
    NavItem::new("Dashboard", paths::CUSTOMER_DASHBOARD, &[Role::Customer]),
    NavItem::new("Find capacity", "/customer/search", &[Role::Customer]),
    NavItem::new("Bookings", "/customer/bookings", &[Role::Customer]),
    NavItem::new("Messages", "/customer/messages", &[Role::Customer]),
    NavItem::new("Profile", "/customer/profile", &[Role::Customer]),
];

const COMPANY_ITEMS: &[NavItem] = &[
    NavItem::new("Overview", paths::COMPANY_OVERVIEW, COMPANY_ROLES),
    NavItem::new("Shipment slots", "/company/slots", COMPANY_ROLES),
    NavItem::new("Bookings", "/company/bookings", COMPANY_ROLES),
    NavItem::new("Messages", "/company/messages", COMPANY_ROLES),
    NavItem::new("Payouts", paths::COMPANY_PAYOUTS, &[Role::CompanyAdmin]),
    NavItem::new("Team", "/company/team", &[Role::CompanyAdmin]),
    NavItem::new("Settings", "/company/settings", COMPANY_ROLES),
];

const ADMIN_ITEMS: &[NavItem] = &[
    NavItem::new("Dashboard", paths::ADMIN_DASHBOARD, &[Role::SuperAdmin]),
    NavItem::new("Companies", "/admin/companies", &[Role::SuperAdmin]),
    NavItem::new("Users", "/admin/users", &[Role::SuperAdmin]),
    NavItem::new("Bookings", "/admin/bookings", &[Role::SuperAdmin]),
    NavItem::new("Payments", "/admin/payments", &[Role::SuperAdmin]),
];

/// Navigation tree of one application area.
#[derive(Debug, Clone, Copy)]
pub struct NavTree {
    pub area: Area,
    items: &'static [NavItem],
}

impl NavTree {
    #[must_use]
    pub const fn for_area(area: Area) -> Self {
        let items = match area {
            Area::Customer => CUSTOMER_ITEMS,
            Area::Company => COMPANY_ITEMS,
            Area::Admin => ADMIN_ITEMS,
        };
        Self { area, items }
    }

    /// Tree for the area `role` lives in.
    #[must_use]
    pub const fn for_role(role: Role) -> Self {
        Self::for_area(role.area())
    }

    #[must_use]
    pub const fn items(&self) -> &'static [NavItem] {
        self.items
    }

    /// Items `role` should see.
    #[must_use]
    pub fn visible_items(&self, role: Role) -> Vec<NavItem> {
        self.items
            .iter()
            .filter(|item| item.is_visible_to(role))
            .copied()
            .collect()
    }
}
