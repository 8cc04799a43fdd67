//! Backend client against the fake API.

#![allow(clippy::unwrap_used)]

use parcsal_core::{ConnectOnboardingState, Role, StepKey, SubjectType};
use parcsal_integration_tests::FakeBackend;
use parcsal_web::api::{ApiError, BackendClient, StatusClient};

async fn setup() -> (FakeBackend, BackendClient) {
    let fake = FakeBackend::spawn().await;
    let client = BackendClient::new(&fake.api_config()).unwrap();
    (fake, client)
}

#[tokio::test]
async fn test_fetch_onboarding_status_follows_backend() {
    let (fake, client) = setup().await;
    let token = fake.add_account("owner@carrier.test", Role::CompanyAdmin, true);
    let authorized = client.authorized(&token);

    let status = authorized
        .fetch_onboarding_status(SubjectType::Company)
        .await
        .unwrap();
    assert!(!status.completed);
    assert_eq!(status.progress, 50);
    assert!(status.is_step_completed(StepKey::CompanyProfile));
    assert!(!status.is_step_completed(StepKey::PayoutSetup));

    fake.set_payout_done(true);
    let status = authorized
        .fetch_onboarding_status(SubjectType::Company)
        .await
        .unwrap();
    assert!(status.completed);
    assert!(status.is_step_completed(StepKey::PayoutSetup));
    assert_eq!(fake.onboarding_fetches(), 2);
}

#[tokio::test]
async fn test_fetch_connect_status() {
    let (fake, client) = setup().await;
    let token = fake.add_account("owner@carrier.test", Role::CompanyAdmin, true);

    let status = client.authorized(&token).fetch_connect_status().await.unwrap();
    assert!(status.has_account());
    assert_eq!(status.onboarding_state, ConnectOnboardingState::InProgress);
    assert!(!status.is_fully_enabled());
}

#[tokio::test]
async fn test_revoked_token_is_unauthorized() {
    let (fake, client) = setup().await;
    let token = fake.add_account("owner@carrier.test", Role::CompanyAdmin, true);
    fake.revoke(&token);

    let err = client
        .authorized(&token)
        .fetch_onboarding_status(SubjectType::Company)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Unauthorized));
}

#[tokio::test]
async fn test_backend_rejection_keeps_status_code() {
    let (fake, client) = setup().await;
    let token = fake.add_account("shipper@example.test", Role::Customer, true);

    let err = client
        .authorized(&token)
        .fetch_onboarding_status(SubjectType::User)
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Api { status: 400, .. }));
}

#[tokio::test]
async fn test_current_user_reflects_backend_flags() {
    let (fake, client) = setup().await;
    let token = fake.add_account("owner@carrier.test", Role::CompanyAdmin, false);
    fake.set_payout_done(true);

    let user = client.authorized(&token).current_user().await.unwrap();
    assert_eq!(user.role, Role::CompanyAdmin);
    assert!(!user.is_email_verified);
    assert!(user.onboarding_completed);
}
