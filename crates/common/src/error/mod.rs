//! Error classification shared across Carthooks crates
//!
//! Every error type in the workspace implements [`ErrorClassification`] so
//! callers can make uniform retry and alerting decisions without matching on
//! crate-specific variants.
//!
//! | Level | Use Case | Examples |
//! |-------|----------|----------|
//! | **Info** | Expected conditions | Token not yet issued |
//! | **Warning** | Degraded but operational | Rate limiting, transient network failures |
//! | **Error** | Failure requiring attention | Rejected credentials, invalid configuration |
//! | **Critical** | System integrity at risk | Internal invariant violations |

use std::fmt;
use std::time::Duration;

/// Standard interface for classifying errors by their characteristics
pub trait ErrorClassification {
    /// Check if this error is retryable
    ///
    /// Retryable errors are transient issues that may succeed if the caller
    /// attempts the operation again, such as network timeouts or 5xx
    /// responses. Nothing in this workspace retries them automatically.
    fn is_retryable(&self) -> bool;

    /// Get the error severity level
    fn severity(&self) -> ErrorSeverity;

    /// Check if this is a critical error requiring immediate attention
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    /// Get the suggested retry delay if applicable
    fn retry_after(&self) -> Option<Duration>;
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for error.
    use super::*;

    struct Flaky;

    impl ErrorClassification for Flaky {
        fn is_retryable(&self) -> bool {
            true
        }

        fn severity(&self) -> ErrorSeverity {
            ErrorSeverity::Warning
        }

        fn retry_after(&self) -> Option<Duration> {
            Some(Duration::from_secs(1))
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(ErrorSeverity::Info < ErrorSeverity::Warning);
        assert!(ErrorSeverity::Warning < ErrorSeverity::Error);
        assert!(ErrorSeverity::Error < ErrorSeverity::Critical);
    }

    #[test]
    fn test_severity_display() {
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARN");
        assert_eq!(ErrorSeverity::Critical.to_string(), "CRITICAL");
    }

    #[test]
    fn test_default_is_critical_follows_severity() {
        assert!(!Flaky.is_critical());
        assert!(Flaky.is_retryable());
        assert_eq!(Flaky.retry_after(), Some(Duration::from_secs(1)));
    }
}
