//! Error types

use thiserror::Error;

/// Result type alias for form operations.
pub type FormResult<T> = Result<T, FormError>;

/// Errors surfaced by form operations.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FormError {
    /// Malformed path syntax, or a container type mismatch while traversing.
    #[error("invalid path '{path}': {reason}")]
    InvalidPath { path: String, reason: String },

    /// The validator capability failed; stored errors were left untouched.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidatorError),

    /// The submit capability failed.
    #[error("submit failed: {0}")]
    Submit(#[from] SubmitFailure),

    /// Validation was requested outside of a Tokio runtime.
    #[error("no async runtime available to run validation")]
    NoRuntime,

    /// A pending validation was dropped before it produced a result.
    #[error("validation request was dropped")]
    Closed,

    /// The form was reset while a submit attempt was validating.
    #[error("form was reset during submit")]
    Reset,
}

impl FormError {
    /// Creates a new invalid path error.
    pub fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Returns `true` for structural (path) errors.
    pub fn is_invalid_path(&self) -> bool {
        matches!(self, Self::InvalidPath { .. })
    }
}

/// Failure reported by a validator capability.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct ValidatorError {
    pub message: String,
}

impl ValidatorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for ValidatorError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for ValidatorError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

/// Failure reported by a submit capability.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{message}")]
pub struct SubmitFailure {
    pub message: String,
}

impl SubmitFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for SubmitFailure {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

impl From<&str> for SubmitFailure {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}
