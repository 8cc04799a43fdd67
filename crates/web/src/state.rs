//! Application state shared across handlers.

use std::sync::Arc;

use parcsal_core::AccessGate;

use crate::api::{ApiError, BackendClient};
use crate::config::WebConfig;
use crate::onboarding::ReconciliationRegistry;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: WebConfig,
    backend: BackendClient,
    gate: AccessGate,
    reconciliations: ReconciliationRegistry,
}

impl AppState {
    /// Create a new application state with the Parcsal guard table.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn new(config: WebConfig) -> Result<Self, ApiError> {
        Self::with_gate(config, AccessGate::parcsal())
    }

    /// Create application state with a custom access gate.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend HTTP client cannot be built.
    pub fn with_gate(config: WebConfig, gate: AccessGate) -> Result<Self, ApiError> {
        let backend = BackendClient::new(&config.api)?;
        let reconciliations = ReconciliationRegistry::new(config.onboarding);

        Ok(Self {
            inner: Arc::new(AppStateInner {
                config,
                backend,
                gate,
                reconciliations,
            }),
        })
    }

    #[must_use]
    pub fn config(&self) -> &WebConfig {
        &self.inner.config
    }

    /// Backend REST client.
    #[must_use]
    pub fn backend(&self) -> &BackendClient {
        &self.inner.backend
    }

    #[must_use]
    pub fn gate(&self) -> &AccessGate {
        &self.inner.gate
    }

    /// Active onboarding reconciliations, per user.
    #[must_use]
    pub fn reconciliations(&self) -> &ReconciliationRegistry {
        &self.inner.reconciliations
    }
}
