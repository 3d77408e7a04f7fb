//! Error taxonomy for the analytics core
//!
//! Four classes cover every failure the engine can produce. Validation and
//! Unauthorized reject inputs before any state is touched; NotFound covers
//! missing reference data; Storage wraps the underlying store failure and
//! propagates so callers choose their own retry policy.

use thiserror::Error;

/// Core error taxonomy shared by the daemon and domain modules.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input rejected before any write happened.
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    /// Missing or malformed caller identity.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Referenced user, paper, or question does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Underlying store failed; never swallowed.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),
}

impl CoreError {
    /// Shorthand for a validation failure naming the offending field.
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;
