//! Navigation endpoints for the front end.

use axum::{
    Json,
    extract::{Query, State},
};
use parcsal_core::{AccessDecision, Area, NavItem, NavTree, NavigationIntent, paths};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::gate;
use crate::middleware::{RequireSession, Sessions};
use crate::state::AppState;

/// Navigation menu for the current role.
#[derive(Debug, Serialize)]
pub struct NavigationResponse {
    pub area: Area,
    pub home: &'static str,
    pub items: Vec<NavItem>,
}

/// Items the logged-in role should see.
pub async fn navigation(RequireSession { session, .. }: RequireSession) -> Json<NavigationResponse> {
    let role = session.role();
    let tree = NavTree::for_role(role);
    Json(NavigationResponse {
        area: tree.area,
        home: role.home_path(),
        items: tree.visible_items(role),
    })
}

#[derive(Debug, Deserialize)]
pub struct AccessQuery {
    /// Path (and optional query) the front end is about to render.
    pub target: String,
}

/// Admission decision for a navigation the front end is about to make.
#[derive(Debug, Serialize)]
pub struct AccessResponse {
    #[serde(flatten)]
    pub decision: AccessDecision,
    pub location: Option<String>,
}

/// Evaluate a navigation intent before the target view is constructed.
pub async fn access(
    State(state): State<AppState>,
    Sessions(store): Sessions,
    Query(query): Query<AccessQuery>,
) -> Result<Json<AccessResponse>> {
    if !paths::is_safe_redirect(&query.target) {
        return Err(AppError::BadRequest("target must be a local path".to_string()));
    }
    let intent = NavigationIntent::from_target(&query.target);
    let decision = gate::admit(
        state.gate(),
        &intent,
        &store,
        state.reconciliations(),
        |token| state.backend().authorized(token),
    )
    .await;

    Ok(Json(AccessResponse {
        location: decision.location(),
        decision,
    }))
}
