//! Backend status commands.
//!
//! # Environment Variables
//!
//! - `PARCSAL_API_URL` - Backend base URL
//! - `PARCSAL_ACCESS_TOKEN` - Bearer token (or `--token`)

use std::sync::Arc;
use std::time::Duration;

use parcsal_core::{AccessToken, StepKey, SubjectType};
use parcsal_web::api::{ApiError, AuthorizedClient, BackendClient, StatusClient};
use parcsal_web::config::{ApiConfig, ConfigError, OnboardingPollConfig};
use parcsal_web::onboarding::{OnboardingReconciler, ReconcilerConfig, ReconcilerState, spawn_polling};
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Errors that can occur during status commands.
#[derive(Debug, Error)]
pub enum StatusError {
    /// No token given.
    #[error("Missing access token: pass --token or set PARCSAL_ACCESS_TOKEN")]
    MissingToken,

    /// Backend settings invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend call failed.
    #[error("Backend error: {0}")]
    Api(#[from] ApiError),

    /// Serializing output failed.
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),

    /// Polling ended without the step completing.
    #[error("Step {step} not completed: polling ended in state {state:?}")]
    NotCompleted {
        step: StepKey,
        state: ReconcilerState,
    },
}

fn client(token: Option<SecretString>) -> Result<AuthorizedClient, StatusError> {
    let token = token.ok_or(StatusError::MissingToken)?;
    let backend = BackendClient::new(&ApiConfig::from_env()?)?;
    Ok(backend.authorized(&AccessToken::new(token.expose_secret())))
}

/// Print the onboarding status of `subject`.
///
/// # Errors
///
/// Returns an error if the token is missing or the backend call fails.
pub async fn onboarding(token: Option<SecretString>, subject: SubjectType) -> Result<(), StatusError> {
    let status = client(token)?.fetch_onboarding_status(subject).await?;

    tracing::info!(
        subject = %subject,
        completed = status.completed,
        progress = status.progress,
        "Onboarding status"
    );
    for step in subject.required_steps() {
        tracing::info!(
            step = %step,
            completed = status.is_step_completed(*step),
            "  step"
        );
    }
    if !status.is_consistent_for(subject) {
        tracing::warn!("Backend reports `completed` inconsistently with its steps");
    }
    Ok(())
}

/// Print the payment-provider linkage status.
///
/// # Errors
///
/// Returns an error if the token is missing or the backend call fails.
pub async fn connect(token: Option<SecretString>) -> Result<(), StatusError> {
    let status = client(token)?.fetch_connect_status().await?;
    tracing::info!("{}", serde_json::to_string_pretty(&status)?);
    tracing::info!(
        has_account = status.has_account(),
        fully_enabled = status.is_fully_enabled(),
        "Connect status"
    );
    Ok(())
}

/// Poll until `step` completes, times out, or Ctrl+C.
///
/// # Errors
///
/// Returns an error if the token is missing or polling ends without completion.
pub async fn watch(
    token: Option<SecretString>,
    subject: SubjectType,
    step: StepKey,
    interval_ms: u64,
    max_ms: u64,
) -> Result<(), StatusError> {
    let timing = OnboardingPollConfig {
        interval: Duration::from_millis(interval_ms.max(1)),
        max_polling_time: Duration::from_millis(max_ms),
    };
    let reconciler = Arc::new(
        OnboardingReconciler::new(client(token)?, ReconcilerConfig::with_timing(subject, step, timing))
            .on_complete(move |status| {
                tracing::info!(step = %step, progress = status.progress, "Step completed");
            }),
    );

    tracing::info!(step = %step, interval_ms, max_ms, "Watching onboarding");
    let task = spawn_polling(Arc::clone(&reconciler));

    let mut report = tokio::time::interval(timing.interval);
    loop {
        tokio::select! {
            _ = report.tick() => {}
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted");
                break;
            }
        }
        let snapshot = reconciler.snapshot();
        tracing::info!(
            state = ?snapshot.state,
            progress = snapshot.progress,
            elapsed_ms = snapshot.elapsed_ms,
            "Polling"
        );
        if snapshot.state.is_terminal() {
            break;
        }
    }
    drop(task);

    match reconciler.state() {
        ReconcilerState::Completed => Ok(()),
        state => Err(StatusError::NotCompleted { step, state }),
    }
}
