//! Persisted login session.

mod backend;
mod store;

pub use backend::{MemoryBackend, SessionBackend, StorageError};
pub use store::{SessionStore, keys};

/// Session store over the request's cookie session.
pub type CookieSessionStore = SessionStore<tower_sessions::Session>;
