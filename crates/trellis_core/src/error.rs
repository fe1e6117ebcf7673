//! Core error types for Trellis.

use std::fmt;

/// Core result type
pub type CoreResult<T> = Result<T, CoreError>;

/// Core error type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Invalid ID format
    InvalidId {
        /// Why the ID was rejected
        reason: String,
    },

    /// Parse error
    ParseError {
        /// Error message
        message: String,
    },

    /// Validation error
    Validation {
        /// Offending field or entity
        field: String,
        /// Why validation failed
        reason: String,
    },

    /// Not found
    NotFound {
        /// Entity kind
        kind: String,
        /// Entity ID
        id: String,
    },

    /// Already exists
    AlreadyExists {
        /// Entity kind
        kind: String,
        /// Entity ID
        id: String,
    },
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidId { reason } => write!(f, "Invalid ID: {}", reason),
            Self::ParseError { message } => write!(f, "Parse error: {}", message),
            Self::Validation { field, reason } => {
                write!(f, "Validation failed for {}: {}", field, reason)
            }
            Self::NotFound { kind, id } => write!(f, "{} not found: {}", kind, id),
            Self::AlreadyExists { kind, id } => write!(f, "{} already exists: {}", kind, id),
        }
    }
}

impl std::error::Error for CoreError {}
