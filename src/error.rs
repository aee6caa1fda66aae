//! Error types for the test resources
//!
//! Every failure is handed back to the immediate caller. Nothing here is
//! retried, so [`Error::is_retryable`] is `false` across the board; the
//! method exists so callers can treat these errors like any other operator
//! error.

use thiserror::Error;

use crate::field::ErrorList;

/// Main error type for fixture operations
#[derive(Debug, Error)]
pub enum Error {
    /// A lifecycle hook received an object of the wrong concrete type
    #[error("expected {argument} to be {expected}, got {actual}")]
    TypeMismatch {
        /// Name of the offending argument (e.g., "obj", "oldObj", "newObj")
        argument: String,
        /// Kind the hook accepts
        expected: String,
        /// Kind the hook was handed
        actual: String,
    },

    /// Encoding was refused or failed
    #[error("encode error [{kind}]: {message}")]
    Encode {
        /// Kind or record being encoded
        kind: String,
        /// Description of what failed
        message: String,
    },

    /// Decoding was refused or the input was malformed
    #[error("decode error [{kind}]: {message}")]
    Decode {
        /// Kind or record being decoded
        kind: String,
        /// Description of what failed
        message: String,
    },

    /// Field-level validation errors aggregated into one
    #[error("{kind} is invalid: {errors}")]
    Invalid {
        /// Kind of the rejected object
        kind: String,
        /// The collected field errors (never empty)
        errors: ErrorList,
    },

    /// Type or equality registration failed
    #[error("registration error: {message}")]
    Registration {
        /// Description of what failed
        message: String,
    },

    /// Manifest could not be parsed as YAML
    #[error("yaml error: {message}")]
    Yaml {
        /// Parser message
        message: String,
    },

    /// JSON conversion failed outside of the encode/decode contract
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a type-mismatch error for a hook argument
    pub fn type_mismatch(
        argument: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            argument: argument.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an encode error for the given kind
    pub fn encode(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Encode {
            kind: kind.into(),
            message: msg.into(),
        }
    }

    /// Create a decode error for the given kind
    pub fn decode(kind: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Decode {
            kind: kind.into(),
            message: msg.into(),
        }
    }

    /// Create a registration error
    pub fn registration(msg: impl Into<String>) -> Self {
        Self::Registration {
            message: msg.into(),
        }
    }

    /// Create a YAML parse error
    pub fn yaml(msg: impl Into<String>) -> Self {
        Self::Yaml {
            message: msg.into(),
        }
    }

    /// Check if this error is retryable
    ///
    /// None of these errors go away by trying again: faults are armed by the
    /// caller, type mismatches and invalid objects need a different input, and
    /// registration failures abort startup.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::TypeMismatch { .. }
            | Error::Encode { .. }
            | Error::Decode { .. }
            | Error::Invalid { .. }
            | Error::Registration { .. }
            | Error::Yaml { .. }
            | Error::Json(_) => false,
        }
    }

    /// Get the kind if this error is associated with one
    pub fn kind(&self) -> Option<&str> {
        match self {
            Error::Encode { kind, .. } | Error::Decode { kind, .. } | Error::Invalid { kind, .. } => {
                Some(kind)
            }
            Error::TypeMismatch { expected, .. } => Some(expected),
            _ => None,
        }
    }

    /// Field errors carried by an [`Error::Invalid`]
    pub fn field_errors(&self) -> Option<&ErrorList> {
        match self {
            Error::Invalid { errors, .. } => Some(errors),
            _ => None,
        }
    }
}
