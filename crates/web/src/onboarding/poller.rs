//! Timer that drives a reconciler while it is polling.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::debug;

use super::reconciler::{CycleOutcome, OnboardingReconciler};
use crate::api::StatusClient;

/// Handle to a running poll loop.
///
/// Dropping it stops polling and cancels the timer, so an owner that goes
/// away can never leave an orphaned loop behind.
#[derive(Debug)]
pub struct PollingTask<C> {
    reconciler: Arc<OnboardingReconciler<C>>,
    handle: JoinHandle<()>,
}

impl<C> PollingTask<C> {
    #[must_use]
    pub const fn reconciler(&self) -> &Arc<OnboardingReconciler<C>> {
        &self.reconciler
    }

    /// Whether the loop has exited (completed, timed out or stopped).
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}

impl<C> Drop for PollingTask<C> {
    fn drop(&mut self) {
        self.reconciler.stop_polling();
        self.handle.abort();
    }
}

/// Start polling and tick every `interval` until the reconciler leaves `Polling`.
///
/// Ticks missed while a slow cycle was in flight are skipped, not replayed.
pub fn spawn_polling<C>(reconciler: Arc<OnboardingReconciler<C>>) -> PollingTask<C>
where
    C: StatusClient + 'static,
{
    let driver = Arc::clone(&reconciler);
    let handle = tokio::spawn(async move {
        if driver.start_polling().await == CycleOutcome::AlreadyPolling {
            debug!("Reconciler already polling, not starting a second loop");
            return;
        }

        let period = driver.config().interval;
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        while driver.is_polling() {
            ticker.tick().await;
            driver.tick().await;
        }
        debug!(state = ?driver.state(), "Polling loop finished");
    });

    PollingTask { reconciler, handle }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use parcsal_core::{ConnectStatus, OnboardingStatus, StepState, SubjectType};

    use super::*;
    use crate::api::ApiError;
    use crate::onboarding::{ReconcilerConfig, ReconcilerState};

    /// Reports the payout step completed from the `done_after`-th fetch on.
    struct CountingClient {
        fetches: AtomicUsize,
        done_after: usize,
        timestamps: Mutex<Vec<Instant>>,
    }

    impl CountingClient {
        fn new(done_after: usize) -> Arc<Self> {
            Arc::new(Self {
                fetches: AtomicUsize::new(0),
                done_after,
                timestamps: Mutex::new(Vec::new()),
            })
        }
    }

    impl StatusClient for CountingClient {
        async fn fetch_onboarding_status(
            &self,
            _subject: SubjectType,
        ) -> Result<OnboardingStatus, ApiError> {
            let n = self.fetches.fetch_add(1, Ordering::SeqCst) + 1;
            self.timestamps.lock().unwrap().push(Instant::now());
            let mut status = OnboardingStatus::default();
            status.steps.insert(
                "payout_setup".to_string(),
                StepState {
                    completed: n >= self.done_after,
                    completed_at: None,
                },
            );
            Ok(status)
        }

        async fn fetch_connect_status(&self) -> Result<ConnectStatus, ApiError> {
            Ok(ConnectStatus::default())
        }
    }

    fn config() -> ReconcilerConfig {
        ReconcilerConfig {
            subject: SubjectType::Company,
            awaited_step: parcsal_core::StepKey::PayoutSetup,
            interval: Duration::from_secs(5),
            max_polling_time: Duration::from_secs(300),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_polls_at_interval_until_completed() {
        let client = CountingClient::new(2);
        let reconciler = Arc::new(OnboardingReconciler::new(Arc::clone(&client), config()));
        let task = spawn_polling(Arc::clone(&reconciler));

        time::sleep(Duration::from_secs(12)).await;

        assert_eq!(reconciler.state(), ReconcilerState::Completed);
        assert_eq!(client.fetches.load(Ordering::SeqCst), 2);
        let stamps = client.timestamps.lock().unwrap().clone();
        assert!(stamps[1] - stamps[0] >= Duration::from_secs(5));
        assert!(task.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_with_system_clock() {
        let client = CountingClient::new(usize::MAX);
        let reconciler = Arc::new(OnboardingReconciler::new(Arc::clone(&client), config()));
        let _task = spawn_polling(Arc::clone(&reconciler));

        time::sleep(Duration::from_secs(301)).await;
        let fetched = client.fetches.load(Ordering::SeqCst);
        assert!(fetched > 1);

        time::sleep(Duration::from_secs(60)).await;
        assert_eq!(client.fetches.load(Ordering::SeqCst), fetched);
        assert_ne!(reconciler.state(), ReconcilerState::Polling);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_task_stops_polling() {
        let client = CountingClient::new(usize::MAX);
        let reconciler = Arc::new(OnboardingReconciler::new(Arc::clone(&client), config()));
        let task = spawn_polling(Arc::clone(&reconciler));

        time::sleep(Duration::from_secs(1)).await;
        assert_eq!(client.fetches.load(Ordering::SeqCst), 1);
        drop(task);

        time::sleep(Duration::from_secs(30)).await;
        assert_eq!(reconciler.state(), ReconcilerState::Stopped);
        assert_eq!(client.fetches.load(Ordering::SeqCst), 1);
    }
}
