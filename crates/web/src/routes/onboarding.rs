//! Company payout onboarding: hand-off to the payment provider and
//! reconciliation once the user comes back.

use axum::{
    Json,
    extract::{RawQuery, State},
    response::Redirect,
};
use parcsal_core::paths;
use tracing::info;

use crate::error::{AppError, Result, add_breadcrumb};
use crate::middleware::RequireSession;
use crate::onboarding::{CycleOutcome, ReconcilerSnapshot};
use crate::state::AppState;

/// Query string the provider's return URL carries.
const RETURN_MARKER: &str = "from_stripe=true";

/// Create a hosted onboarding link and send the browser to it.
pub async fn connect(
    State(state): State<AppState>,
    RequireSession { session, .. }: RequireSession,
) -> Result<Redirect> {
    let return_url = state
        .config()
        .absolute_url(&format!("{}?{RETURN_MARKER}", paths::COMPANY_PAYOUT_SETUP_RETURN));

    let link = state
        .backend()
        .authorized(&session.access_token)
        .create_onboarding_link(&return_url, true)
        .await?;

    info!(user_id = %session.user.id, "Sending company admin to payout onboarding");
    add_breadcrumb("onboarding", "Payout onboarding started", None);
    Ok(Redirect::to(&link.url))
}

/// Current reconciliation state for the logged-in user.
pub async fn status(
    State(state): State<AppState>,
    RequireSession { session, .. }: RequireSession,
) -> Result<Json<ReconcilerSnapshot>> {
    state
        .reconciliations()
        .snapshot(&session.user.id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("no onboarding reconciliation".to_string()))
}

/// Start polling. The request's own query string is forwarded as the
/// provider return marker, e.g. `?from_stripe=true`.
pub async fn start(
    State(state): State<AppState>,
    RequireSession { session, .. }: RequireSession,
    RawQuery(query): RawQuery,
) -> Json<ReconcilerSnapshot> {
    let client = state.backend().authorized(&session.access_token);
    let snapshot = state
        .reconciliations()
        .start(&session.user.id, client, query.as_deref())
        .await;
    Json(snapshot)
}

#[derive(Debug, serde::Serialize)]
pub struct CheckResponse {
    pub outcome: CycleOutcome,
    #[serde(flatten)]
    pub snapshot: ReconcilerSnapshot,
}

/// Manual "check again", typically offered after polling timed out.
pub async fn check(
    State(state): State<AppState>,
    RequireSession { session, .. }: RequireSession,
) -> Json<CheckResponse> {
    let client = state.backend().authorized(&session.access_token);
    let (outcome, snapshot) = state
        .reconciliations()
        .check_now(&session.user.id, client)
        .await;
    Json(CheckResponse { outcome, snapshot })
}

/// Stop polling when the onboarding screen goes away.
pub async fn stop(
    State(state): State<AppState>,
    RequireSession { session, .. }: RequireSession,
) -> Result<Json<ReconcilerSnapshot>> {
    state
        .reconciliations()
        .stop(&session.user.id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("no onboarding reconciliation".to_string()))
}
