//! Error taxonomy for the orchestration service.
//!
//! Policy is never fatal: `ProcureError` only carries the failures that must
//! escape as an HTTP error (validation, internal faults). Detected policy
//! violations travel inside response structs, never as `Err`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ProcureError>;

#[derive(Error, Debug)]
pub enum ProcureError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("model provider unreachable: {0}")]
    ModelConnection(String),

    #[error("model provider returned an unusable response: {0}")]
    ModelResponse(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ProcureError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
