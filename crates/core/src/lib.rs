//! Parcsal Core - Shared domain types and access rules.
//!
//! This crate provides the types used across all Parcsal web components:
//! - `web` - The customer/company/admin access layer served over HTTP
//! - `cli` - Operator tooling for status checks and gate dry-runs
//!
//! # Architecture
//!
//! The core crate contains only types and pure logic - no I/O, no HTTP
//! clients, no timers. Route admission in particular is a pure function of
//! the session, the route policy, the path and the onboarding evidence, so it
//! can be evaluated anywhere and tested without a runtime.
//!
//! # Modules
//!
//! - [`types`] - Session, role, onboarding and payment-provider snapshots
//! - [`access`] - Route guard policies, the guard table and the access gate
//! - [`navigation`] - Per-area navigation trees
//! - [`paths`] - Well-known redirect targets

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod navigation;
pub mod paths;
pub mod types;

pub use access::*;
pub use navigation::{NavItem, NavTree};
pub use types::*;
