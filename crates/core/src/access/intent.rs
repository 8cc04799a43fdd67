//! Navigation intents: the event a router emits before constructing a view.

use serde::Serialize;

/// A request to navigate to `path` (with an optional raw query string).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct NavigationIntent {
    pub path: String,
    pub query: Option<String>,
}

impl NavigationIntent {
    #[must_use]
    pub fn new(path: impl Into<String>, query: Option<String>) -> Self {
        Self {
            path: path.into(),
            query: query.filter(|q| !q.is_empty()),
        }
    }

    /// Split a `path?query` target.
    #[must_use]
    pub fn from_target(target: &str) -> Self {
        match target.split_once('?') {
            Some((path, query)) => Self::new(path, Some(query.to_string())),
            None => Self::new(target, None),
        }
    }

    /// The full target, suitable as a redirect-back value.
    #[must_use]
    pub fn target(&self) -> String {
        match &self.query {
            Some(query) => format!("{}?{query}", self.path),
            None => self.path.clone(),
        }
    }
}
