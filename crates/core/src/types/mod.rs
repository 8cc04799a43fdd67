//! Core types for Parcsal.
//!
//! Type-safe wrappers for the session, role and onboarding concepts shared by
//! the web layer and the CLI.

pub mod connect;
pub mod id;
pub mod onboarding;
pub mod role;
pub mod session;

pub use connect::{ConnectOnboardingState, ConnectStatus};
pub use id::{CompanyId, UserId};
pub use onboarding::{OnboardingStatus, StepKey, StepState, SubjectType};
pub use role::{Area, Role};
pub use session::{AccessToken, Session, SessionUser, UserFieldsUpdate};
