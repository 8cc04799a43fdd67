//! Per-user reconciliations, kept alive while their owner keeps asking.
//!
//! Entries idle out of the cache; eviction drops the [`PollingTask`], which
//! stops polling.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use parcsal_core::{OnboardingStatus, SubjectType, UserId};
use tracing::{debug, info};

use super::poller::{PollingTask, spawn_polling};
use super::reconciler::{
    CycleOutcome, OnboardingReconciler, ReconcilerConfig, ReconcilerSnapshot, ReconcilerState,
};
use crate::api::{AuthorizedClient, StatusClient};
use crate::config::OnboardingPollConfig;

const MAX_ACTIVE: u64 = 10_000;

/// How long an untouched entry survives past its polling budget.
const IDLE_GRACE: Duration = Duration::from_secs(600);

struct ActiveReconciliation<C> {
    reconciler: Arc<OnboardingReconciler<C>>,
    _task: Option<PollingTask<C>>,
}

/// Active reconciliations keyed by user.
#[derive(Clone)]
pub struct ReconciliationRegistry<C = AuthorizedClient> {
    active: Cache<UserId, Arc<ActiveReconciliation<C>>>,
    timing: OnboardingPollConfig,
}

impl<C> std::fmt::Debug for ReconciliationRegistry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconciliationRegistry")
            .field("active", &self.active.entry_count())
            .field("timing", &self.timing)
            .finish()
    }
}

impl<C: StatusClient + 'static> ReconciliationRegistry<C> {
    #[must_use]
    pub fn new(timing: OnboardingPollConfig) -> Self {
        let active = Cache::builder()
            .max_capacity(MAX_ACTIVE)
            .time_to_idle(timing.max_polling_time + IDLE_GRACE)
            .build();
        Self { active, timing }
    }

    /// Start polling payout setup for `user`.
    ///
    /// An entry that is already polling is kept; `return_query` then triggers
    /// one deduplicated cycle on it. A completed or timed-out entry that
    /// already handled `return_query` is kept as is. Otherwise a fresh
    /// reconciliation replaces the old one and inherits its handled marker.
    pub async fn start(
        &self,
        user: &UserId,
        client: C,
        return_query: Option<&str>,
    ) -> ReconcilerSnapshot {
        let previous = self.active.get(user).await;
        if let Some(entry) = &previous {
            if entry.reconciler.is_polling() {
                if let Some(query) = return_query {
                    entry.reconciler.reconcile_on_return(query).await;
                }
                return entry.reconciler.snapshot();
            }
            let finished = matches!(
                entry.reconciler.state(),
                ReconcilerState::Completed | ReconcilerState::TimedOut
            );
            if finished && return_query.is_some_and(|q| entry.reconciler.is_return_handled(q)) {
                debug!(user_id = %user, "Return marker already handled by finished reconciliation");
                return entry.reconciler.snapshot();
            }
        }

        let handled = previous.and_then(|entry| entry.reconciler.handled_return());
        let reconciler = Arc::new(self.reconciler(user, client).with_handled_return(handled));
        if let Some(query) = return_query {
            reconciler.mark_return_handled(query);
        }
        let task = spawn_polling(Arc::clone(&reconciler));
        self.active
            .insert(
                user.clone(),
                Arc::new(ActiveReconciliation {
                    reconciler: Arc::clone(&reconciler),
                    _task: Some(task),
                }),
            )
            .await;
        reconciler.snapshot()
    }

    /// Manual "check again": one cycle now, polling or not.
    pub async fn check_now(&self, user: &UserId, client: C) -> (CycleOutcome, ReconcilerSnapshot) {
        let reconciler = match self.active.get(user).await {
            Some(entry) => Arc::clone(&entry.reconciler),
            None => {
                let reconciler = Arc::new(self.reconciler(user, client));
                self.active
                    .insert(
                        user.clone(),
                        Arc::new(ActiveReconciliation {
                            reconciler: Arc::clone(&reconciler),
                            _task: None,
                        }),
                    )
                    .await;
                reconciler
            }
        };
        let outcome = reconciler.reconcile().await;
        (outcome, reconciler.snapshot())
    }

    /// Stop polling for `user`. The entry stays so its final state can be read.
    pub async fn stop(&self, user: &UserId) -> Option<ReconcilerSnapshot> {
        let entry = self.active.get(user).await?;
        entry.reconciler.stop_polling();
        Some(entry.reconciler.snapshot())
    }

    /// Stop and forget `user`'s reconciliation, e.g. when their session ends.
    ///
    /// Returns `true` if there was one.
    pub async fn remove(&self, user: &UserId) -> bool {
        let Some(entry) = self.active.remove(user).await else {
            return false;
        };
        entry.reconciler.stop_polling();
        debug!(user_id = %user, "Reconciliation removed");
        true
    }

    pub async fn snapshot(&self, user: &UserId) -> Option<ReconcilerSnapshot> {
        self.active
            .get(user)
            .await
            .map(|entry| entry.reconciler.snapshot())
    }

    /// Latest onboarding snapshot seen for `user` about `subject`.
    pub async fn recent_status(&self, user: &UserId, subject: SubjectType) -> Option<OnboardingStatus> {
        let entry = self.active.get(user).await?;
        if entry.reconciler.config().subject != subject {
            return None;
        }
        entry.reconciler.onboarding_status()
    }

    fn reconciler(&self, user: &UserId, client: C) -> OnboardingReconciler<C> {
        let user_id = user.clone();
        OnboardingReconciler::new(client, ReconcilerConfig::payout_setup(self.timing)).on_complete(
            move |status| {
                info!(
                    user_id = %user_id,
                    progress = status.progress,
                    "Payout setup confirmed by provider"
                );
            },
        )
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parcsal_core::{ConnectStatus, StepState};

    use super::*;
    use crate::api::ApiError;

    struct FixedClient {
        payout_done: bool,
        fetches: AtomicUsize,
    }

    impl FixedClient {
        fn new(payout_done: bool) -> Arc<Self> {
            Arc::new(Self {
                payout_done,
                fetches: AtomicUsize::new(0),
            })
        }
    }

    impl StatusClient for FixedClient {
        async fn fetch_onboarding_status(
            &self,
            _subject: SubjectType,
        ) -> Result<OnboardingStatus, ApiError> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let mut status = OnboardingStatus {
                completed: self.payout_done,
                progress: if self.payout_done { 100 } else { 50 },
                ..OnboardingStatus::default()
            };
            status.steps.insert(
                "payout_setup".to_string(),
                StepState {
                    completed: self.payout_done,
                    completed_at: None,
                },
            );
            Ok(status)
        }

        async fn fetch_connect_status(&self) -> Result<ConnectStatus, ApiError> {
            Ok(ConnectStatus::default())
        }
    }

    fn registry() -> ReconciliationRegistry<Arc<FixedClient>> {
        ReconciliationRegistry::new(OnboardingPollConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_polls_and_stop_halts() {
        let registry = registry();
        let user = UserId::new("usr_company");
        let client = FixedClient::new(false);

        registry.start(&user, Arc::clone(&client), None).await;
        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(client.fetches.load(Ordering::SeqCst), 3);

        let stopped = registry.stop(&user).await.unwrap();
        assert_eq!(stopped.state, ReconcilerState::Stopped);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(client.fetches.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_start_reuses_polling_entry() {
        let registry = registry();
        let user = UserId::new("usr_company");
        let client = FixedClient::new(false);

        registry.start(&user, Arc::clone(&client), None).await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        registry
            .start(&user, Arc::clone(&client), Some("from_stripe=true"))
            .await;
        registry
            .start(&user, Arc::clone(&client), Some("from_stripe=true"))
            .await;

        assert_eq!(client.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_check_now_without_entry_fetches_once() {
        let registry = registry();
        let user = UserId::new("usr_company");
        let client = FixedClient::new(true);

        let (outcome, snapshot) = registry.check_now(&user, Arc::clone(&client)).await;
        assert_eq!(outcome, CycleOutcome::Completed);
        assert_eq!(snapshot.state, ReconcilerState::Completed);
        assert!(snapshot.awaited_step_completed);
        assert_eq!(client.fetches.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_recent_status_matches_subject() {
        let registry = registry();
        let user = UserId::new("usr_company");
        registry.check_now(&user, FixedClient::new(true)).await;

        let recent = registry.recent_status(&user, SubjectType::Company).await;
        assert!(recent.is_some_and(|s| s.completed));
        assert!(registry.recent_status(&user, SubjectType::User).await.is_none());
        assert!(
            registry
                .recent_status(&UserId::new("usr_other"), SubjectType::Company)
                .await
                .is_none()
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_remove_stops_polling_and_forgets_entry() {
        let registry = registry();
        let user = UserId::new("usr_company");
        let client = FixedClient::new(false);

        registry.start(&user, Arc::clone(&client), None).await;
        tokio::time::sleep(Duration::from_secs(6)).await;
        assert_eq!(client.fetches.load(Ordering::SeqCst), 2);

        assert!(registry.remove(&user).await);
        assert!(registry.snapshot(&user).await.is_none());
        assert!(!registry.remove(&user).await);

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(client.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_finished_entry_dedupes_same_return_marker() {
        let registry = registry();
        let user = UserId::new("usr_company");
        let client = FixedClient::new(true);

        registry
            .start(&user, Arc::clone(&client), Some("from_stripe=true"))
            .await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(client.fetches.load(Ordering::SeqCst), 1);

        let again = registry
            .start(&user, Arc::clone(&client), Some("?from_stripe=true"))
            .await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(again.state, ReconcilerState::Completed);
        assert_eq!(client.fetches.load(Ordering::SeqCst), 1);

        registry
            .start(&user, Arc::clone(&client), Some("from_stripe=true&attempt=2"))
            .await;
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(client.fetches.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_user_has_no_snapshot() {
        let registry = registry();
        let user = UserId::new("usr_nobody");
        assert!(registry.snapshot(&user).await.is_none());
        assert!(registry.stop(&user).await.is_none());
    }
}
