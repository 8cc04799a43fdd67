//! Backend API errors.

use thiserror::Error;

/// Errors that can occur when talking to the Parcsal backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Transport failure or timeout. Retryable.
    #[error("network error: {0}")]
    Network(String),

    /// Token missing, invalid or expired. The session must be dropped.
    #[error("unauthorized")]
    Unauthorized,

    /// Backend returned a non-success status.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape.
    #[error("parse error: {0}")]
    Parse(String),

    /// Client could not be constructed.
    #[error("client configuration error: {0}")]
    Config(String),
}

impl ApiError {
    /// Whether retrying the same call later may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Unauthorized | Self::Parse(_) | Self::Config(_) => false,
        }
    }

    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::Parse(err.to_string())
        } else {
            Self::Network(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ApiError::Network("reset".to_string()).is_transient());
        assert!(
            ApiError::Api {
                status: 503,
                message: String::new()
            }
            .is_transient()
        );
        assert!(
            !ApiError::Api {
                status: 404,
                message: String::new()
            }
            .is_transient()
        );
        assert!(!ApiError::Unauthorized.is_transient());
        assert!(ApiError::Unauthorized.is_unauthorized());
    }
}
