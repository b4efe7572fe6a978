//! Error types for the ingestion and dispatch stages.

use marionette_core::error::MarionetteError;
use thiserror::Error;

/// Errors from the message store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store read failed: {0}")]
    Read(String),
    #[error("Store row malformed: {0}")]
    Malformed(String),
}

/// Errors raised by a message handler.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("Handler failed: {0}")]
    Failed(String),
    #[error("Handler configuration invalid: {0}")]
    BadConfig(String),
}

impl From<StoreError> for MarionetteError {
    fn from(err: StoreError) -> Self {
        MarionetteError::Store(err.to_string())
    }
}

impl From<HandlerError> for MarionetteError {
    fn from(err: HandlerError) -> Self {
        MarionetteError::Dispatch(err.to_string())
    }
}
