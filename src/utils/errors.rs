//! Error handling for gatherly
//!
//! This module defines the public error taxonomy returned by the service
//! layer and provides a unified error handling strategy.

use thiserror::Error;

use crate::store::StoreError;

/// Main error type for gatherly operations
#[derive(Error, Debug)]
pub enum GatherlyError {
    #[error("Authorization required")]
    Unauthenticated,

    #[error("No activity found with key: {key}")]
    ActivityNotFound { key: String },

    #[error("Profile not found: {user_id}")]
    ProfileNotFound { user_id: String },

    #[error("Permission denied: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Transaction contention persisted after {attempts} attempts")]
    StoreContention { attempts: u32 },

    #[error("Storage error: {0}")]
    Store(#[source] StoreError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for gatherly operations
pub type Result<T> = std::result::Result<T, GatherlyError>;

impl From<StoreError> for GatherlyError {
    fn from(err: StoreError) -> Self {
        match err {
            // Exhausted optimistic retries surface as the retryable variant
            // so callers can distinguish "try again" from a broken store.
            StoreError::RetriesExhausted { attempts } => {
                GatherlyError::StoreContention { attempts }
            }
            other => GatherlyError::Store(other),
        }
    }
}

impl GatherlyError {
    /// Check if the error is recoverable by retrying the call
    pub fn is_recoverable(&self) -> bool {
        match self {
            GatherlyError::Unauthenticated => false,
            GatherlyError::ActivityNotFound { .. } => false,
            GatherlyError::ProfileNotFound { .. } => false,
            GatherlyError::Forbidden(_) => false,
            GatherlyError::Conflict(_) => false,
            GatherlyError::StoreContention { .. } => true,
            GatherlyError::Store(_) => false,
            GatherlyError::InvalidInput(_) => false,
            GatherlyError::Config(_) => false,
        }
    }

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            GatherlyError::Store(_) => ErrorSeverity::Critical,
            GatherlyError::Config(_) => ErrorSeverity::Critical,
            GatherlyError::Unauthenticated => ErrorSeverity::Warning,
            GatherlyError::Forbidden(_) => ErrorSeverity::Warning,
            GatherlyError::Conflict(_) => ErrorSeverity::Warning,
            GatherlyError::InvalidInput(_) => ErrorSeverity::Info,
            _ => ErrorSeverity::Error,
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    Info,
    Warning,
    Error,
    Critical,
}

impl std::fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contention_exhaustion_maps_to_retryable_variant() {
        let err = GatherlyError::from(StoreError::RetriesExhausted { attempts: 4 });
        assert!(matches!(err, GatherlyError::StoreContention { attempts: 4 }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn plain_store_errors_are_not_recoverable() {
        let err = GatherlyError::from(StoreError::Migration("boom".to_string()));
        assert!(matches!(err, GatherlyError::Store(_)));
        assert!(!err.is_recoverable());
        assert_eq!(err.severity(), ErrorSeverity::Critical);
    }
}
