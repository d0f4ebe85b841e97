//! API-specific error types
//!
//! Provides error classification for API operations with retry metadata.

use std::time::Duration;

use carthooks_common::auth::{TokenError, UnauthorizedSignal};
use carthooks_common::error::{ErrorClassification, ErrorSeverity};
use thiserror::Error;

/// Categories of API errors for retry logic
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiErrorCategory {
    /// Authentication errors (401, 403, rejected grants) - re-authenticate
    Authentication,
    /// Rate limiting errors (429) - retry with backoff
    RateLimit,
    /// Server errors (5xx) - retryable
    Server,
    /// Client errors (4xx except auth) - non-retryable
    Client,
    /// Network/connection errors - retryable
    Network,
    /// Configuration or lifecycle errors - non-retryable
    Config,
}

/// API operation errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP 401; triggers the single refresh-and-retry
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("Server error: {0}")]
    Server(String),

    #[error("Client error: {0}")]
    Client(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    /// Token acquisition or refresh failed
    #[error(transparent)]
    Token(#[from] TokenError),
}

impl ApiError {
    /// Get the error category for this error
    pub fn category(&self) -> ApiErrorCategory {
        match self {
            Self::Unauthorized(_) | Self::Auth(_) => ApiErrorCategory::Authentication,
            Self::RateLimit(_) => ApiErrorCategory::RateLimit,
            Self::Server(_) => ApiErrorCategory::Server,
            Self::Client(_) => ApiErrorCategory::Client,
            Self::Network(_) | Self::Timeout(_) => ApiErrorCategory::Network,
            Self::Config(_) => ApiErrorCategory::Config,
            Self::Token(err) => match err {
                TokenError::Network(_) => ApiErrorCategory::Network,
                TokenError::Auth(_) => ApiErrorCategory::Authentication,
                TokenError::Configuration(_) | TokenError::State(_) => ApiErrorCategory::Config,
            },
        }
    }

    /// Check if the caller may retry this error
    ///
    /// Authentication failures are not retryable here: the request
    /// authenticator has already spent its one refresh-and-retry.
    pub fn should_retry(&self) -> bool {
        matches!(
            self.category(),
            ApiErrorCategory::RateLimit | ApiErrorCategory::Server | ApiErrorCategory::Network
        )
    }

    /// Get suggested retry delay in seconds
    pub fn retry_delay_secs(&self) -> u64 {
        match self.category() {
            ApiErrorCategory::RateLimit => 60,
            ApiErrorCategory::Server => 10,
            ApiErrorCategory::Network => 5,
            ApiErrorCategory::Authentication
            | ApiErrorCategory::Client
            | ApiErrorCategory::Config => 0,
        }
    }
}

impl UnauthorizedSignal for ApiError {
    fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }
}

impl ErrorClassification for ApiError {
    fn is_retryable(&self) -> bool {
        self.should_retry()
    }

    fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ApiErrorCategory::RateLimit | ApiErrorCategory::Network => ErrorSeverity::Warning,
            ApiErrorCategory::Client => ErrorSeverity::Info,
            ApiErrorCategory::Authentication
            | ApiErrorCategory::Server
            | ApiErrorCategory::Config => ErrorSeverity::Error,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        self.should_retry().then(|| Duration::from_secs(self.retry_delay_secs()))
    }
}
