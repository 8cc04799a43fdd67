//! Onboarding progress snapshots as reported by `GET /onboarding/status`.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Whose onboarding record is being queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    /// Individual (customer) onboarding.
    User,
    /// Carrier company onboarding.
    Company,
}

impl SubjectType {
    /// Value of the `type` query parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Company => "company",
        }
    }

    /// Steps that must all be completed for this subject to count as onboarded.
    #[must_use]
    pub const fn required_steps(self) -> &'static [StepKey] {
        match self {
            Self::User => &[
                StepKey::EmailVerification,
                StepKey::ProfileCompletion,
                StepKey::FirstBooking,
            ],
            Self::Company => &[
                StepKey::CompanyProfile,
                StepKey::PaymentSetup,
                StepKey::PayoutSetup,
                StepKey::FirstShipmentSlot,
            ],
        }
    }
}

impl std::fmt::Display for SubjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SubjectType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "company" => Ok(Self::Company),
            _ => Err(format!("invalid onboarding subject: {s}")),
        }
    }
}

/// Onboarding steps the front end knows about.
///
/// The backend may report additional keys; those are kept as plain strings in
/// [`OnboardingStatus::steps`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKey {
    CompanyProfile,
    PaymentSetup,
    PayoutSetup,
    FirstShipmentSlot,
    EmailVerification,
    ProfileCompletion,
    FirstBooking,
}

impl StepKey {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CompanyProfile => "company_profile",
            Self::PaymentSetup => "payment_setup",
            Self::PayoutSetup => "payout_setup",
            Self::FirstShipmentSlot => "first_shipment_slot",
            Self::EmailVerification => "email_verification",
            Self::ProfileCompletion => "profile_completion",
            Self::FirstBooking => "first_booking",
        }
    }
}

impl std::fmt::Display for StepKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for StepKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::CompanyProfile,
            Self::PaymentSetup,
            Self::PayoutSetup,
            Self::FirstShipmentSlot,
            Self::EmailVerification,
            Self::ProfileCompletion,
            Self::FirstBooking,
        ]
        .into_iter()
        .find(|key| key.as_str() == s)
        .ok_or_else(|| format!("unknown onboarding step: {s}"))
    }
}

/// Completion state of a single step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StepState {
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Snapshot of an onboarding record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnboardingStatus {
    #[serde(default)]
    pub steps: BTreeMap<String, StepState>,
    #[serde(default)]
    pub completed: bool,
    /// Percentage in `0..=100`.
    #[serde(default, deserialize_with = "deserialize_progress")]
    pub progress: u8,
}

impl OnboardingStatus {
    /// State of a known step, if the backend reported it.
    #[must_use]
    pub fn step(&self, key: StepKey) -> Option<&StepState> {
        self.steps.get(key.as_str())
    }

    /// Missing steps count as not completed.
    #[must_use]
    pub fn is_step_completed(&self, key: StepKey) -> bool {
        self.step(key).is_some_and(|state| state.completed)
    }

    /// Required steps for `subject` that are still open.
    #[must_use]
    pub fn remaining_steps(&self, subject: SubjectType) -> Vec<StepKey> {
        subject
            .required_steps()
            .iter()
            .copied()
            .filter(|key| !self.is_step_completed(*key))
            .collect()
    }

    /// `completed` must be true exactly when every required step is.
    #[must_use]
    pub fn is_consistent_for(&self, subject: SubjectType) -> bool {
        self.completed == self.remaining_steps(subject).is_empty()
    }

    /// Returns `true` if some step completed in `previous` is open here.
    #[must_use]
    pub fn reverts_steps_of(&self, previous: &Self) -> bool {
        previous
            .steps
            .iter()
            .filter(|(_, state)| state.completed)
            .any(|(key, _)| !self.steps.get(key).is_some_and(|state| state.completed))
    }
}

/// The backend reports progress as a JSON number that may be fractional.
fn deserialize_progress<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    if !raw.is_finite() {
        return Ok(0);
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // clamped to 0..=100
    let percent = raw.round().clamp(0.0, 100.0) as u8;
    Ok(percent)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status(json: &str) -> OnboardingStatus {
        serde_json::from_str(json).expect("valid onboarding status")
    }

    #[test]
    fn test_parses_backend_shape() {
        let parsed = status(
            r#"{
                "steps": {
                    "company_profile": {"completed": true, "completedAt": "2025-03-01T10:00:00Z"},
                    "payout_setup": {"completed": false}
                },
                "completed": false,
                "progress": 50
            }"#,
        );
        assert!(parsed.is_step_completed(StepKey::CompanyProfile));
        assert!(!parsed.is_step_completed(StepKey::PayoutSetup));
        assert!(!parsed.is_step_completed(StepKey::FirstShipmentSlot));
        assert!(parsed.step(StepKey::CompanyProfile).and_then(|s| s.completed_at).is_some());
        assert_eq!(parsed.progress, 50);
    }

    #[test]
    fn test_fractional_progress_is_rounded_and_clamped() {
        assert_eq!(status(r#"{"progress": 66.67}"#).progress, 67);
        assert_eq!(status(r#"{"progress": 140}"#).progress, 100);
        assert_eq!(status(r#"{"progress": -3}"#).progress, 0);
    }

    #[test]
    fn test_unknown_steps_are_preserved() {
        let parsed = status(r#"{"steps": {"insurance_upload": {"completed": true}}}"#);
        assert!(parsed.steps.contains_key("insurance_upload"));
    }

    #[test]
    fn test_remaining_steps_for_company() {
        let parsed = status(
            r#"{"steps": {
                "company_profile": {"completed": true},
                "payment_setup": {"completed": true}
            }}"#,
        );
        assert_eq!(
            parsed.remaining_steps(SubjectType::Company),
            vec![StepKey::PayoutSetup, StepKey::FirstShipmentSlot]
        );
    }

    #[test]
    fn test_consistency_check() {
        let done = status(
            r#"{"completed": true, "progress": 100, "steps": {
                "email_verification": {"completed": true},
                "profile_completion": {"completed": true},
                "first_booking": {"completed": true}
            }}"#,
        );
        assert!(done.is_consistent_for(SubjectType::User));
        assert!(!done.is_consistent_for(SubjectType::Company));

        let lying = status(r#"{"completed": true, "steps": {}}"#);
        assert!(!lying.is_consistent_for(SubjectType::User));
    }

    #[test]
    fn test_reverted_steps_detected() {
        let before = status(r#"{"steps": {"payout_setup": {"completed": true}}}"#);
        let after = status(r#"{"steps": {"payout_setup": {"completed": false}}}"#);
        assert!(after.reverts_steps_of(&before));
        assert!(!before.reverts_steps_of(&after));
    }

    #[test]
    fn test_step_key_from_str() {
        assert_eq!("payout_setup".parse::<StepKey>(), Ok(StepKey::PayoutSetup));
        assert!("nope".parse::<StepKey>().is_err());
    }
}
