//! Role-based route admission.
//!
//! - [`RouteGuardPolicy`] - static requirements of a route group
//! - [`GuardTable`] - path prefix to policy mapping
//! - [`AccessGate`] - the pure five-rule evaluator
//! - [`AccessDecision`] / [`AccessDenial`] - outcomes and their taxonomy

pub mod decision;
pub mod gate;
pub mod intent;
pub mod policy;
pub mod table;

pub use decision::{AccessDecision, AccessDenial};
pub use gate::{AccessGate, OnboardingEvidence};
pub use intent::NavigationIntent;
pub use policy::RouteGuardPolicy;
pub use table::GuardTable;
