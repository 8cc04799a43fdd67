//! Parcsal backend API access.
//!
//! # Endpoints
//!
//! ```text
//! POST /auth/login                       - credentials → token + user
//! POST /auth/register                    - new account → token + user
//! GET  /auth/me                          - refreshed user flags
//! GET  /onboarding/status?type=...       - onboarding snapshot
//! GET  /company/connect/status           - payment-provider linkage
//! POST /company/connect/onboarding-link  - hosted provider onboarding URL
//! ```
//!
//! The backend is the source of truth. Nothing here caches responses.

mod client;
mod error;
mod status;

pub use client::{
    AuthResponse, AuthorizedClient, BackendClient, LoginRequest, OnboardingLink, RegisterRequest,
};
pub use error::ApiError;
pub use status::StatusClient;
