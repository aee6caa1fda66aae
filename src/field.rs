//! Field paths and field-level validation errors
//!
//! Validation hooks report problems against a path into the object
//! (`spec.fields.invalid`), following the Kubernetes API conventions so the
//! messages read the same as the ones the API server produces.

use std::fmt;

use serde_json::Value;

use crate::{Error, Result};

/// Dotted path to a field within an object
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Path(Vec<String>);

impl Path {
    /// Create a path from a root field and nested field names
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.join("."))
    }
}

/// Category of a field error
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorType {
    /// The value is not acceptable
    Invalid,
    /// A required value is missing
    Required,
}

impl fmt::Display for ErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Invalid => write!(f, "Invalid value"),
            Self::Required => write!(f, "Required value"),
        }
    }
}

/// A validation error scoped to one field
#[derive(Clone, Debug, PartialEq)]
pub struct FieldError {
    /// Category of the error
    pub type_: ErrorType,
    /// Path to the offending field
    pub field: Path,
    /// The offending value; never shown for `Required`
    pub bad_value: Option<Value>,
    /// Human-readable detail, may be empty
    pub detail: String,
}

impl FieldError {
    /// The value at `field` is not acceptable
    pub fn invalid(field: Path, value: impl Into<Value>, detail: impl Into<String>) -> Self {
        Self {
            type_: ErrorType::Invalid,
            field,
            bad_value: Some(value.into()),
            detail: detail.into(),
        }
    }

    /// A value is required at `field`
    pub fn required(field: Path, detail: impl Into<String>) -> Self {
        Self {
            type_: ErrorType::Required,
            field,
            bad_value: None,
            detail: detail.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.type_)?;
        if self.type_ == ErrorType::Invalid {
            match &self.bad_value {
                Some(value) => write!(f, ": {value}")?,
                None => write!(f, ": null")?,
            }
        }
        if !self.detail.is_empty() {
            write!(f, ": {}", self.detail)?;
        }
        Ok(())
    }
}

impl std::error::Error for FieldError {}

/// Ordered collection of field errors
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ErrorList(Vec<FieldError>);

impl ErrorList {
    /// Create an empty list
    pub fn new() -> Self {
        Self::default()
    }

    /// Collect an error
    pub fn push(&mut self, err: FieldError) {
        self.0.push(err);
    }

    /// Number of collected errors
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no errors were collected
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Fold the list into a single result
    ///
    /// An empty list is `Ok(())`. Otherwise the errors are returned as one
    /// [`Error::Invalid`] for `kind`, with duplicate messages dropped.
    pub fn to_aggregate(self, kind: impl Into<String>) -> Result<()> {
        if self.0.is_empty() {
            return Ok(());
        }
        let mut errors = ErrorList::new();
        for err in self.0 {
            if !errors.0.iter().any(|seen| seen.to_string() == err.to_string()) {
                errors.push(err);
            }
        }
        Err(Error::Invalid {
            kind: kind.into(),
            errors,
        })
    }
}

impl fmt::Display for ErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.len() == 1 {
            return write!(f, "{}", self.0[0]);
        }
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "[{}]", messages.join(", "))
    }
}
