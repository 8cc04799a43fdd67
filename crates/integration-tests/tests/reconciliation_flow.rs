//! Payout onboarding reconciliation over HTTP.

#![allow(clippy::unwrap_used, clippy::indexing_slicing)]

use std::time::Duration;

use parcsal_core::Role;
use parcsal_integration_tests::{PROVIDER_ONBOARDING_URL, TestApp, location};
use parcsal_web::config::OnboardingPollConfig;
use reqwest::StatusCode;
use serde_json::Value;

const OWNER: &str = "owner@carrier.test";

async fn logged_in_owner(app: &TestApp) {
    app.backend.add_account(OWNER, Role::CompanyAdmin, true);
    app.login(OWNER, None).await;
}

async fn snapshot(app: &TestApp) -> Value {
    app.get("/api/onboarding/reconciliation")
        .await
        .json()
        .await
        .unwrap()
}

/// Poll the snapshot endpoint until `state` is reached or two seconds pass.
async fn wait_for_state(app: &TestApp, state: &str) -> Value {
    for _ in 0..40 {
        let body = snapshot(app).await;
        if body["state"] == state {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("reconciliation never reached {state}");
}

#[tokio::test]
async fn test_connect_hands_off_to_provider() {
    let app = TestApp::spawn().await;
    logged_in_owner(&app).await;

    let response = app.post("/company/onboarding/connect").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), PROVIDER_ONBOARDING_URL);

    let requests = app.backend.onboarding_link_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0]["returnUrl"],
        app.url("/company/onboarding/payout-setup?from_stripe=true")
    );
    assert_eq!(requests[0]["fromOnboarding"], true);
}

#[tokio::test]
async fn test_no_reconciliation_is_404() {
    let app = TestApp::spawn().await;
    logged_in_owner(&app).await;

    let response = app.get("/api/onboarding/reconciliation").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_polling_completes_when_provider_confirms() {
    let app = TestApp::spawn().await;
    logged_in_owner(&app).await;

    let started: Value = app
        .post("/api/onboarding/reconciliation/start?from_stripe=true")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(started["awaitedStep"], "payout_setup");
    assert_eq!(started["subject"], "company");

    let polling = wait_for_state(&app, "polling").await;
    assert_eq!(polling["awaitedStepCompleted"], false);
    assert_eq!(polling["connect"]["stripeOnboardingStatus"], "IN_PROGRESS");

    app.backend.set_payout_done(true);
    let done = wait_for_state(&app, "completed").await;
    assert_eq!(done["awaitedStepCompleted"], true);
    assert_eq!(done["progress"], 100);
    assert_eq!(done["remainingSteps"], Value::Array(Vec::new()));

    let fetched = app.backend.onboarding_fetches();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(app.backend.onboarding_fetches(), fetched);

    // The reconciliation's completed snapshot now admits the company area
    // without another fetch.
    let response = app.get("/company/bookings").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(app.backend.onboarding_fetches(), fetched);
}

#[tokio::test]
async fn test_stop_halts_polling() {
    let app = TestApp::spawn().await;
    logged_in_owner(&app).await;

    app.post("/api/onboarding/reconciliation/start").await;
    wait_for_state(&app, "polling").await;

    let stopped: Value = app
        .post("/api/onboarding/reconciliation/stop")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(stopped["state"], "stopped");

    let fetched = app.backend.onboarding_fetches();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(app.backend.onboarding_fetches(), fetched);
    assert_eq!(snapshot(&app).await["state"], "stopped");
}

#[tokio::test]
async fn test_logout_stops_polling() {
    let app = TestApp::spawn().await;
    logged_in_owner(&app).await;

    app.post("/api/onboarding/reconciliation/start").await;
    wait_for_state(&app, "polling").await;

    let response = app.post("/auth/logout").await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    // Let a cycle already awaiting the backend land.
    tokio::time::sleep(Duration::from_millis(150)).await;
    let fetched = app.backend.onboarding_fetches();
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(app.backend.onboarding_fetches(), fetched);

    // Logging back in finds nothing left running.
    app.login(OWNER, None).await;
    let response = app.get("/api/onboarding/reconciliation").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_timeout_then_manual_check() {
    let app = TestApp::spawn_with(OnboardingPollConfig {
        interval: Duration::from_millis(50),
        max_polling_time: Duration::from_millis(300),
    })
    .await;
    logged_in_owner(&app).await;

    app.post("/api/onboarding/reconciliation/start").await;
    wait_for_state(&app, "timed_out").await;

    let fetched = app.backend.onboarding_fetches();
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(app.backend.onboarding_fetches(), fetched);

    app.backend.set_payout_done(true);
    let checked: Value = app
        .post("/api/onboarding/reconciliation/check")
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(checked["outcome"], "completed");
    assert_eq!(checked["state"], "completed");
    assert_eq!(app.backend.onboarding_fetches(), fetched + 1);
}

#[tokio::test]
async fn test_reconciliation_api_is_company_admin_only() {
    let app = TestApp::spawn().await;
    app.backend
        .add_account("staff@carrier.test", Role::CompanyStaff, true);
    app.login("staff@carrier.test", None).await;

    let response = app.post("/api/onboarding/reconciliation/start").await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
