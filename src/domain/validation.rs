//! Shared validation error type for request envelopes and payloads.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single field-level validation failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Raised by `validate()` on a request envelope or agent payload.
#[derive(Debug, Error, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[error("validation failed: {}", summarize(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            errors: vec![FieldError::new(field, message)],
        }
    }

    pub fn from_errors(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }
}

impl From<ValidationError> for crate::domain::error::ProcureError {
    fn from(err: ValidationError) -> Self {
        crate::domain::error::ProcureError::Validation(err.to_string())
    }
}

/// Accumulates field errors across a multi-field validation pass.
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn require(&mut self, condition: bool, field: &str, message: &str) {
        if !condition {
            self.errors.push(FieldError::new(field, message));
        }
    }

    pub fn finish(self) -> Result<(), ValidationError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::from_errors(self.errors))
        }
    }
}
