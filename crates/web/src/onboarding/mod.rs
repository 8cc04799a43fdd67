//! Onboarding reconciliation: polling the backend until a provider-side step
//! lands.

mod clock;
mod poller;
mod reconciler;
mod registry;

pub use clock::{Clock, ManualClock, SystemClock};
pub use poller::{PollingTask, spawn_polling};
pub use reconciler::{
    CompletionCallback, CycleOutcome, OnboardingReconciler, ReconcilerConfig, ReconcilerSnapshot,
    ReconcilerState,
};
pub use registry::ReconciliationRegistry;
