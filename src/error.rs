//! Error types for Reality.
//!
//! All errors are strongly typed using thiserror. Lookups that find nothing
//! are not errors: a missing page or fact record is represented by absence
//! and still counts as a completed resolution.

use thiserror::Error;

use crate::source::SourceError;

/// Validation errors that occur while constructing entities.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The entity name is empty or whitespace-only.
    #[error("Invalid entity name {name:?}: name cannot be empty")]
    InvalidName {
        name: String,
    },
}

/// A raw value could not be turned into a typed value.
///
/// Raised at attribute access time (never during resolution) when the
/// underlying payload holds data of the wrong shape.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Malformed {kind} value {input:?}: {reason}")]
pub struct MalformedValueError {
    /// What was being built (`measure`, `coordinate`, `utc offset`, ...).
    pub kind: &'static str,
    /// The offending raw input, rendered as text.
    pub input: String,
    /// Why the input was rejected.
    pub reason: String,
}

impl MalformedValueError {
    /// Creates a new malformed value error.
    #[must_use]
    pub fn new(kind: &'static str, input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            kind,
            input: input.into(),
            reason: reason.into(),
        }
    }
}

impl From<std::convert::Infallible> for MalformedValueError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

/// Top-level error type for Reality.
#[derive(Debug, Error)]
pub enum RealityError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Value error: {0}")]
    Value(#[from] MalformedValueError),

    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl RealityError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is a malformed value error.
    #[must_use]
    pub const fn is_value(&self) -> bool {
        matches!(self, Self::Value(_))
    }

    /// Returns true if an external source failed.
    #[must_use]
    pub const fn is_source(&self) -> bool {
        matches!(self, Self::Source(_))
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Source(e) => e.is_retryable(),
            Self::Validation(_) | Self::Value(_) | Self::Internal { .. } => false,
        }
    }
}

/// Result type alias for Reality operations.
pub type RealityResult<T> = Result<T, RealityError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_name_message() {
        let err = ValidationError::InvalidName { name: "   ".to_string() };
        let msg = format!("{err}");
        assert!(msg.contains("cannot be empty"));
    }

    #[test]
    fn test_malformed_value_message() {
        let err = MalformedValueError::new("utc offset", "GMT+x", "expected hours");
        let msg = format!("{err}");
        assert!(msg.contains("utc offset"));
        assert!(msg.contains("GMT+x"));
        assert!(msg.contains("expected hours"));
    }

    #[test]
    fn test_reality_error_from_validation() {
        let err: RealityError = ValidationError::InvalidName { name: String::new() }.into();
        assert!(err.is_validation());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_reality_error_from_source() {
        let err: RealityError = SourceError::Timeout { duration_ms: 3000 }.into();
        assert!(err.is_source());
        assert!(err.is_retryable());
        assert!(format!("{err}").contains("3000ms"));

        let err: RealityError = SourceError::MalformedResponse("bad json".to_string()).into();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_reality_error_internal() {
        let err = RealityError::internal("unexpected state");
        assert!(!err.is_retryable());
        assert!(format!("{err}").contains("unexpected state"));
    }
}
