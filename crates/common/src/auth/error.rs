//! Error type for token lifecycle operations

use std::time::Duration;

use thiserror::Error;

use crate::error::{ErrorClassification, ErrorSeverity};

/// Errors surfaced by grants, the token manager and the request
/// authenticator.
///
/// `Clone` so a single exchange outcome can be handed to every caller that
/// waited on the same gate.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TokenError {
    /// No OAuth configuration present, or a required field is missing
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Transport-level failure talking to the authorization server
    #[error("Network error: {0}")]
    Network(String),

    /// Authorization server rejected the credentials, code or refresh token
    #[error("Authorization rejected: {0}")]
    Auth(String),

    /// Operation is not valid for the current lifecycle state
    #[error("Invalid state: {0}")]
    State(String),
}

impl TokenError {
    /// Shorthand for the "no OAuth config" case.
    #[must_use]
    pub fn missing_config() -> Self {
        Self::Configuration("OAuth config is not set".to_string())
    }

    /// Stable label suitable for structured logging.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Configuration(_) => "configuration",
            Self::Network(_) => "network",
            Self::Auth(_) => "auth",
            Self::State(_) => "state",
        }
    }
}

impl ErrorClassification for TokenError {
    fn is_retryable(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Network(_) => ErrorSeverity::Warning,
            Self::State(_) => ErrorSeverity::Info,
            Self::Configuration(_) | Self::Auth(_) => ErrorSeverity::Error,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Network(_) => Some(Duration::from_secs(5)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_network_errors_are_retryable() {
        assert!(TokenError::Network("connection refused".into()).is_retryable());
        assert!(!TokenError::Auth("invalid_client".into()).is_retryable());
        assert!(!TokenError::Configuration("missing".into()).is_retryable());
        assert!(!TokenError::State("no refresh token".into()).is_retryable());
    }

    #[test]
    fn test_display_and_label() {
        let err = TokenError::missing_config();
        assert_eq!(err.to_string(), "Configuration error: OAuth config is not set");
        assert_eq!(err.label(), "configuration");
        assert_eq!(TokenError::Auth("x".into()).label(), "auth");
    }

    #[test]
    fn test_severity() {
        assert_eq!(TokenError::Network("x".into()).severity(), ErrorSeverity::Warning);
        assert_eq!(TokenError::Auth("x".into()).severity(), ErrorSeverity::Error);
        assert!(TokenError::Network("x".into()).retry_after().is_some());
        assert!(TokenError::Auth("x".into()).retry_after().is_none());
    }
}
