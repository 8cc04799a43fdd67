//! Single source of truth for "who is logged in".
//!
//! Storage failures never escape: a session that cannot be read is the same
//! as no session, and a failed write is logged and dropped. The app degrades
//! to logged-out rather than erroring.

use parcsal_core::{AccessToken, Session, SessionUser, UserFieldsUpdate};
use serde_json::Value;
use tracing::{debug, warn};

use super::SessionBackend;

/// Keys the session is persisted under.
pub mod keys {
    /// Bearer token.
    pub const ACCESS_TOKEN: &str = "accessToken";
    /// Token key used by older clients. Read, never written.
    pub const LEGACY_TOKEN: &str = "token";
    /// Serialized [`parcsal_core::SessionUser`].
    pub const USER: &str = "user";

    /// Every key owned by the session.
    pub const ALL: &[&str] = &[ACCESS_TOKEN, LEGACY_TOKEN, USER];
}

/// Session persistence over any [`SessionBackend`].
#[derive(Debug, Clone)]
pub struct SessionStore<B> {
    backend: B,
}

impl<B: SessionBackend> SessionStore<B> {
    #[must_use]
    pub const fn new(backend: B) -> Self {
        Self { backend }
    }

    #[must_use]
    pub const fn backend(&self) -> &B {
        &self.backend
    }

    /// The persisted session, or `None` if absent, malformed or unreadable.
    pub async fn get_session(&self) -> Option<Session> {
        let user = self.load_user().await?;
        let access_token = self.load_token().await?;
        Some(Session::new(user, access_token))
    }

    /// Persist `session`, replacing any previous one. All fields are written in one save.
    pub async fn save_session(&self, session: &Session) {
        let user = match serde_json::to_value(&session.user) {
            Ok(user) => user,
            Err(e) => {
                warn!(error = %e, "Failed to serialize session user");
                return;
            }
        };
        let entries = vec![
            (
                keys::ACCESS_TOKEN,
                Value::String(session.access_token.as_str().to_string()),
            ),
            (keys::USER, user),
        ];

        match self.backend.store_all(entries).await {
            Ok(()) => debug!(user_id = %session.user.id, "Session saved"),
            Err(e) => warn!(error = %e, "Failed to persist session"),
        }
    }

    /// Remove the persisted session. Safe to call when logged out.
    pub async fn clear_session(&self) {
        if let Err(e) = self.backend.remove_all(keys::ALL).await {
            warn!(error = %e, "Failed to clear session");
        }
    }

    /// Merge refreshed fields into the stored session, keeping its token.
    ///
    /// Returns the updated session, or `None` when nobody is logged in.
    pub async fn update_user_fields(&self, update: &UserFieldsUpdate) -> Option<Session> {
        let mut session = self.get_session().await?;
        if update.is_empty() {
            return Some(session);
        }
        session.apply(update);
        self.save_session(&session).await;
        Some(session)
    }

    async fn load_user(&self) -> Option<SessionUser> {
        let raw = self.load_key(keys::USER).await?;
        match serde_json::from_value(raw) {
            Ok(user) => Some(user),
            Err(e) => {
                debug!(error = %e, "Stored session user is malformed, treating as logged out");
                None
            }
        }
    }

    async fn load_token(&self) -> Option<AccessToken> {
        let raw = match self.load_key(keys::ACCESS_TOKEN).await {
            Some(raw) => raw,
            None => self.load_key(keys::LEGACY_TOKEN).await?,
        };
        match raw {
            Value::String(token) if !token.trim().is_empty() => Some(AccessToken::new(token)),
            _ => {
                debug!("Stored access token is missing or malformed");
                None
            }
        }
    }

    async fn load_key(&self, key: &'static str) -> Option<Value> {
        match self.backend.load(key).await {
            Ok(value) => value.filter(|v| !v.is_null()),
            Err(e) => {
                warn!(error = %e, key, "Session storage read failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::future::Future;

    use parcsal_core::{Role, UserId};
    use serde_json::json;

    use super::*;
    use crate::session::{MemoryBackend, StorageError};

    fn session(role: Role) -> Session {
        Session::new(
            SessionUser {
                id: UserId::new("usr_1"),
                email: "carrier@example.com".to_string(),
                role,
                is_email_verified: true,
                onboarding_completed: false,
                company_id: None,
            },
            AccessToken::new("tok_1"),
        )
    }

    /// Storage that fails every operation, like a browser with storage disabled.
    struct BrokenBackend;

    impl SessionBackend for BrokenBackend {
        fn load(
            &self,
            _key: &'static str,
        ) -> impl Future<Output = Result<Option<Value>, StorageError>> + Send {
            async { Err(StorageError("disabled".to_string())) }
        }

        fn store_all(
            &self,
            _entries: Vec<(&'static str, Value)>,
        ) -> impl Future<Output = Result<(), StorageError>> + Send {
            async { Err(StorageError("quota exceeded".to_string())) }
        }

        fn remove_all(
            &self,
            _keys: &'static [&'static str],
        ) -> impl Future<Output = Result<(), StorageError>> + Send {
            async { Err(StorageError("disabled".to_string())) }
        }
    }

    #[tokio::test]
    async fn test_save_then_get_round_trips_flags() {
        let store = SessionStore::new(MemoryBackend::new());
        let saved = session(Role::CompanyAdmin);
        store.save_session(&saved).await;
        assert_eq!(store.get_session().await, Some(saved));
    }

    #[tokio::test]
    async fn test_empty_storage_is_logged_out() {
        let store = SessionStore::new(MemoryBackend::new());
        assert_eq!(store.get_session().await, None);
    }

    #[tokio::test]
    async fn test_malformed_user_is_logged_out() {
        let backend = MemoryBackend::new();
        backend.put_raw(keys::ACCESS_TOKEN, json!("tok"));
        backend.put_raw(keys::USER, json!({"id": 5, "role": "ROOT"}));
        let store = SessionStore::new(backend);
        assert_eq!(store.get_session().await, None);
    }

    #[tokio::test]
    async fn test_user_without_token_is_logged_out() {
        let backend = MemoryBackend::new();
        let store = SessionStore::new(backend.clone());
        store.save_session(&session(Role::Customer)).await;
        backend.put_raw(keys::ACCESS_TOKEN, json!(""));
        assert_eq!(store.get_session().await, None);
    }

    #[tokio::test]
    async fn test_legacy_token_key_is_read() {
        let backend = MemoryBackend::new();
        backend.put_raw(keys::LEGACY_TOKEN, json!("legacy_tok"));
        backend.put_raw(
            keys::USER,
            json!({"id": "usr_2", "email": "x@y.z", "role": "CUSTOMER"}),
        );
        let store = SessionStore::new(backend);
        let loaded = store.get_session().await.expect("legacy session");
        assert_eq!(loaded.access_token.as_str(), "legacy_tok");
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let backend = MemoryBackend::new();
        let store = SessionStore::new(backend.clone());
        store.save_session(&session(Role::Customer)).await;
        store.clear_session().await;
        store.clear_session().await;
        assert!(backend.is_empty());
        assert_eq!(store.get_session().await, None);
    }

    #[tokio::test]
    async fn test_update_user_fields_keeps_token() {
        let store = SessionStore::new(MemoryBackend::new());
        store.save_session(&session(Role::CompanyAdmin)).await;

        let updated = store
            .update_user_fields(&UserFieldsUpdate::onboarding_completed(true))
            .await
            .expect("logged in");
        assert!(updated.user.onboarding_completed);

        let reloaded = store.get_session().await.expect("still logged in");
        assert!(reloaded.user.onboarding_completed);
        assert_eq!(reloaded.access_token.as_str(), "tok_1");
    }

    #[tokio::test]
    async fn test_update_without_session_is_noop() {
        let backend = MemoryBackend::new();
        let store = SessionStore::new(backend.clone());
        let result = store
            .update_user_fields(&UserFieldsUpdate::onboarding_completed(true))
            .await;
        assert_eq!(result, None);
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_storage_failures_degrade_to_logged_out() {
        let store = SessionStore::new(BrokenBackend);
        store.save_session(&session(Role::Customer)).await;
        store.clear_session().await;
        assert_eq!(store.get_session().await, None);
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_session() {
        let store = SessionStore::new(MemoryBackend::new());
        store.save_session(&session(Role::Customer)).await;
        store.save_session(&session(Role::SuperAdmin)).await;
        let loaded = store.get_session().await.expect("logged in");
        assert_eq!(loaded.role(), Role::SuperAdmin);
    }
}
