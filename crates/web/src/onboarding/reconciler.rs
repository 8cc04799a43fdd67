//! Onboarding reconciliation state machine.
//!
//! ```text
//! Idle ──start_polling──▶ Polling ──awaited step done──▶ Completed
//!                           │  ├──elapsed >= max──────▶ TimedOut
//!                           │  └──stop_polling────────▶ Stopped
//! ```
//!
//! A cycle is one connect-status read followed by one onboarding-status read.
//! At most one cycle is in flight at a time; extra triggers are no-ops.
//! Responses that land after [`OnboardingReconciler::stop_polling`] are
//! discarded.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use parcsal_core::{ConnectStatus, OnboardingStatus, StepKey, SubjectType};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use super::clock::{Clock, SystemClock};
use crate::api::StatusClient;
use crate::config::OnboardingPollConfig;

/// Query parameters the payment provider appends when sending the user back.
const RETURN_MARKERS: &[&str] = &["from_stripe", "success"];

/// Callback run when the awaited step is observed completed.
pub type CompletionCallback = Box<dyn Fn(&OnboardingStatus) + Send + Sync>;

/// What is being awaited, and how patiently.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconcilerConfig {
    pub subject: SubjectType,
    pub awaited_step: StepKey,
    pub interval: Duration,
    pub max_polling_time: Duration,
}

impl ReconcilerConfig {
    /// Wait for `awaited_step` of `subject` with default timing.
    #[must_use]
    pub fn new(subject: SubjectType, awaited_step: StepKey) -> Self {
        Self::with_timing(subject, awaited_step, OnboardingPollConfig::default())
    }

    #[must_use]
    pub const fn with_timing(
        subject: SubjectType,
        awaited_step: StepKey,
        timing: OnboardingPollConfig,
    ) -> Self {
        Self {
            subject,
            awaited_step,
            interval: timing.interval,
            max_polling_time: timing.max_polling_time,
        }
    }

    /// Company payout setup at the provider.
    #[must_use]
    pub const fn payout_setup(timing: OnboardingPollConfig) -> Self {
        Self::with_timing(SubjectType::Company, StepKey::PayoutSetup, timing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcilerState {
    Idle,
    Polling,
    Completed,
    TimedOut,
    Stopped,
}

impl ReconcilerState {
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::TimedOut | Self::Stopped)
    }
}

/// Result of one trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleOutcome {
    /// `start_polling` while already polling.
    AlreadyPolling,
    /// Another cycle was already in flight.
    Skipped,
    /// Timer tick while not polling.
    Inactive,
    /// No return marker, or one already handled.
    Ignored,
    /// Fetched; awaited step still open.
    Pending,
    /// Onboarding fetch failed; state unchanged.
    Failed,
    /// Awaited step observed completed on this cycle.
    Completed,
    /// Response arrived after a stop and was dropped.
    Discarded,
    /// Polling budget exhausted; no fetch made.
    TimedOut,
}

/// Serializable view for the status endpoint and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcilerSnapshot {
    pub state: ReconcilerState,
    pub subject: SubjectType,
    pub awaited_step: StepKey,
    pub awaited_step_completed: bool,
    pub progress: u8,
    pub onboarding_completed: bool,
    pub remaining_steps: Vec<StepKey>,
    pub connect: Option<ConnectStatus>,
    pub elapsed_ms: u64,
}

#[derive(Debug)]
struct Inner {
    state: ReconcilerState,
    started_at: Option<Instant>,
    generation: u64,
    /// Generation of the cycle currently awaiting the backend.
    in_flight: Option<u64>,
    last_return_marker: Option<String>,
    onboarding: Option<OnboardingStatus>,
    connect: Option<ConnectStatus>,
}

/// Polls onboarding status until an awaited step completes.
pub struct OnboardingReconciler<C> {
    client: C,
    config: ReconcilerConfig,
    clock: Arc<dyn Clock>,
    on_complete: Option<CompletionCallback>,
    inner: Mutex<Inner>,
}

impl<C> std::fmt::Debug for OnboardingReconciler<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnboardingReconciler")
            .field("config", &self.config)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl<C: StatusClient> OnboardingReconciler<C> {
    #[must_use]
    pub fn new(client: C, config: ReconcilerConfig) -> Self {
        Self {
            client,
            config,
            clock: Arc::new(SystemClock),
            on_complete: None,
            inner: Mutex::new(Inner {
                state: ReconcilerState::Idle,
                started_at: None,
                generation: 0,
                in_flight: None,
                last_return_marker: None,
                onboarding: None,
                connect: None,
            }),
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    #[must_use]
    pub fn on_complete(mut self, callback: impl Fn(&OnboardingStatus) + Send + Sync + 'static) -> Self {
        self.on_complete = Some(Box::new(callback));
        self
    }

    /// Treat `marker` as already handled, e.g. when replacing a finished run.
    #[must_use]
    pub fn with_handled_return(mut self, marker: Option<String>) -> Self {
        self.inner
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .last_return_marker = marker;
        self
    }

    #[must_use]
    pub const fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Enter `Polling` and run the first cycle immediately.
    ///
    /// Returns [`CycleOutcome::AlreadyPolling`] without fetching if already polling.
    pub async fn start_polling(&self) -> CycleOutcome {
        {
            let mut inner = self.lock();
            if inner.state == ReconcilerState::Polling {
                return CycleOutcome::AlreadyPolling;
            }
            inner.state = ReconcilerState::Polling;
            inner.started_at = Some(self.clock.now());
        }
        info!(
            subject = %self.config.subject,
            step = %self.config.awaited_step,
            "Onboarding polling started"
        );
        self.reconcile().await
    }

    /// Scheduled tick. Times out once the polling budget is spent,
    /// otherwise runs a cycle.
    pub async fn tick(&self) -> CycleOutcome {
        {
            let mut inner = self.lock();
            if inner.state != ReconcilerState::Polling {
                return CycleOutcome::Inactive;
            }
            let elapsed = self.elapsed(&inner);
            if elapsed >= self.config.max_polling_time {
                inner.state = ReconcilerState::TimedOut;
                info!(
                    elapsed_ms = duration_ms(elapsed),
                    step = %self.config.awaited_step,
                    "Onboarding polling timed out"
                );
                return CycleOutcome::TimedOut;
            }
        }
        self.reconcile().await
    }

    /// One reconciliation cycle.
    #[instrument(skip(self), fields(subject = %self.config.subject, step = %self.config.awaited_step))]
    pub async fn reconcile(&self) -> CycleOutcome {
        let generation = {
            let mut inner = self.lock();
            if inner.in_flight == Some(inner.generation) {
                debug!("Cycle already in flight, skipping");
                return CycleOutcome::Skipped;
            }
            inner.in_flight = Some(inner.generation);
            inner.generation
        };
        let _in_flight = InFlight {
            inner: &self.inner,
            generation,
        };

        let connect = match self.client.fetch_connect_status().await {
            Ok(status) => Some(status),
            Err(e) => {
                warn!(error = %e, "Connect status fetch failed");
                None
            }
        };

        let status = match self.client.fetch_onboarding_status(self.config.subject).await {
            Ok(status) => status,
            Err(e) => {
                warn!(error = %e, transient = e.is_transient(), "Onboarding status fetch failed");
                return CycleOutcome::Failed;
            }
        };

        let step_done = status.is_step_completed(self.config.awaited_step);
        let transitioned = {
            let mut inner = self.lock();
            if inner.generation != generation {
                debug!("Dropping response from a stopped reconciliation");
                return CycleOutcome::Discarded;
            }
            if let Some(connect) = connect {
                inner.connect = Some(connect);
            }
            if let Some(previous) = &inner.onboarding
                && (status.progress < previous.progress || status.reverts_steps_of(previous))
            {
                warn!(
                    previous = previous.progress,
                    current = status.progress,
                    "Onboarding progress went backwards"
                );
            }
            inner.onboarding = Some(status.clone());

            let transitioned = step_done && inner.state != ReconcilerState::Completed;
            if transitioned {
                inner.state = ReconcilerState::Completed;
            }
            transitioned
        };

        if transitioned {
            info!(progress = status.progress, "Awaited onboarding step completed");
            if let Some(callback) = &self.on_complete {
                callback(&status);
            }
            CycleOutcome::Completed
        } else {
            debug!(progress = status.progress, "Awaited onboarding step still open");
            CycleOutcome::Pending
        }
    }

    /// Run one cycle if `query` carries a provider return marker not seen before.
    ///
    /// The whole query string is the dedupe key, so re-sending the same
    /// redirect does not refetch.
    pub async fn reconcile_on_return(&self, query: &str) -> CycleOutcome {
        if !self.mark_return_handled(query) {
            return CycleOutcome::Ignored;
        }
        info!("Returned from payment provider, reconciling");
        self.reconcile().await
    }
}

impl<C> OnboardingReconciler<C> {
    /// Record `query` as handled without fetching.
    ///
    /// Returns `true` if it carries a return marker that was not seen before.
    pub fn mark_return_handled(&self, query: &str) -> bool {
        let query = query.trim_start_matches('?');
        if !has_return_marker(query) {
            return false;
        }
        let mut inner = self.lock();
        if inner.last_return_marker.as_deref() == Some(query) {
            debug!("Return marker already handled");
            return false;
        }
        inner.last_return_marker = Some(query.to_string());
        true
    }

    /// Whether `query` is the return marker this reconciler last handled.
    #[must_use]
    pub fn is_return_handled(&self, query: &str) -> bool {
        let query = query.trim_start_matches('?');
        has_return_marker(query) && self.lock().last_return_marker.as_deref() == Some(query)
    }

    /// The last handled return query, if any.
    #[must_use]
    pub fn handled_return(&self) -> Option<String> {
        self.lock().last_return_marker.clone()
    }

    /// Leave `Polling`. Idempotent: any other state is left as is.
    ///
    /// A cycle already in flight is not cancelled; its response is discarded
    /// and it does not block the first cycle of a later restart.
    pub fn stop_polling(&self) {
        let mut inner = self.lock();
        if inner.state == ReconcilerState::Polling {
            inner.state = ReconcilerState::Stopped;
            inner.generation += 1;
            debug!("Onboarding polling stopped");
        }
    }

    #[must_use]
    pub fn state(&self) -> ReconcilerState {
        self.lock().state
    }

    #[must_use]
    pub fn is_polling(&self) -> bool {
        self.state() == ReconcilerState::Polling
    }

    /// Latest onboarding snapshot, if any cycle succeeded.
    #[must_use]
    pub fn onboarding_status(&self) -> Option<OnboardingStatus> {
        self.lock().onboarding.clone()
    }

    /// Latest connect snapshot, if any connect fetch succeeded.
    #[must_use]
    pub fn connect_status(&self) -> Option<ConnectStatus> {
        self.lock().connect.clone()
    }

    #[must_use]
    pub fn snapshot(&self) -> ReconcilerSnapshot {
        let inner = self.lock();
        let onboarding = inner.onboarding.as_ref();
        ReconcilerSnapshot {
            state: inner.state,
            subject: self.config.subject,
            awaited_step: self.config.awaited_step,
            awaited_step_completed: onboarding
                .is_some_and(|s| s.is_step_completed(self.config.awaited_step)),
            progress: onboarding.map_or(0, |s| s.progress),
            onboarding_completed: onboarding.is_some_and(|s| s.completed),
            remaining_steps: onboarding.map_or_else(
                || self.config.subject.required_steps().to_vec(),
                |s| s.remaining_steps(self.config.subject),
            ),
            connect: inner.connect.clone(),
            elapsed_ms: duration_ms(self.elapsed(&inner)),
        }
    }

    fn elapsed(&self, inner: &Inner) -> Duration {
        inner
            .started_at
            .map_or(Duration::ZERO, |start| self.clock.now().saturating_duration_since(start))
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Clears the in-flight marker when a cycle ends, including when its future
/// is dropped. A cycle from a stopped run leaves a newer run's marker alone.
struct InFlight<'a> {
    inner: &'a Mutex<Inner>,
    generation: u64,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        if inner.in_flight == Some(self.generation) {
            inner.in_flight = None;
        }
    }
}

fn has_return_marker(query: &str) -> bool {
    url::form_urlencoded::parse(query.as_bytes())
        .any(|(key, value)| RETURN_MARKERS.contains(&key.as_ref()) && value == "true")
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
