//! Storage backends for the persisted session.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;
use thiserror::Error;

/// Storage layer failure (quota, disabled storage, store unreachable).
#[derive(Debug, Error)]
#[error("session storage unavailable: {0}")]
pub struct StorageError(pub String);

/// Key/value storage the session is persisted in.
pub trait SessionBackend: Send + Sync {
    /// Read one key.
    fn load(&self, key: &'static str) -> impl Future<Output = Result<Option<Value>, StorageError>> + Send;

    /// Write all entries as one logical save.
    fn store_all(
        &self,
        entries: Vec<(&'static str, Value)>,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Remove keys. Missing keys are not an error.
    fn remove_all(
        &self,
        keys: &'static [&'static str],
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

/// Cookie-backed per-browser session from `tower-sessions`.
///
/// Inserts are buffered on the session record and persisted together when the
/// response is written, which gives `store_all` its all-or-nothing behaviour.
impl SessionBackend for tower_sessions::Session {
    async fn load(&self, key: &'static str) -> Result<Option<Value>, StorageError> {
        self.get_value(key)
            .await
            .map_err(|e| StorageError(e.to_string()))
    }

    async fn store_all(&self, entries: Vec<(&'static str, Value)>) -> Result<(), StorageError> {
        for (key, value) in entries {
            self.insert_value(key, value)
                .await
                .map_err(|e| StorageError(e.to_string()))?;
        }
        Ok(())
    }

    async fn remove_all(&self, keys: &'static [&'static str]) -> Result<(), StorageError> {
        for key in keys {
            self.remove_value(key)
                .await
                .map_err(|e| StorageError(e.to_string()))?;
        }
        Ok(())
    }
}

/// In-process storage for the CLI and tests. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    entries: Arc<Mutex<HashMap<&'static str, Value>>>,
}

impl MemoryBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw write, bypassing the session model. Lets tests plant malformed data.
    pub fn put_raw(&self, key: &'static str, value: Value) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, value);
    }

    /// Raw read.
    #[must_use]
    pub fn get_raw(&self, key: &'static str) -> Option<Value> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_empty()
    }
}

impl SessionBackend for MemoryBackend {
    async fn load(&self, key: &'static str) -> Result<Option<Value>, StorageError> {
        Ok(self.get_raw(key))
    }

    async fn store_all(&self, entries: Vec<(&'static str, Value)>) -> Result<(), StorageError> {
        let mut map = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        map.extend(entries);
        Ok(())
    }

    async fn remove_all(&self, keys: &'static [&'static str]) -> Result<(), StorageError> {
        let mut map = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        for key in keys {
            map.remove(key);
        }
        Ok(())
    }
}
