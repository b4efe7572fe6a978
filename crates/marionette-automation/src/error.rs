//! Error types for the automation stage.

use marionette_core::error::MarionetteError;
use thiserror::Error;

/// Errors from resolving a display name to an on-screen region.
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("Target not found on screen: {0}")]
    NotFound(String),
    #[error("Match below confidence threshold: {name} ({confidence:.2} < {threshold:.2})")]
    LowConfidence {
        name: String,
        confidence: f64,
        threshold: f64,
    },
    #[error("Screen capture failed: {0}")]
    Capture(String),
}

/// Errors from performing an action against the target window.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error(transparent)]
    Locate(#[from] LocateError),
    #[error("Input injection failed: {0}")]
    Input(String),
    #[error("Target window unavailable: {0}")]
    WindowLost(String),
    #[error("Action does not support this target: {0}")]
    Unsupported(String),
}

/// Errors from delivering an operator escalation.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Escalation delivery failed: {0}")]
    Delivery(String),
    #[error("No escalation channel configured")]
    Unconfigured,
}

impl From<reqwest::Error> for NotifyError {
    fn from(err: reqwest::Error) -> Self {
        NotifyError::Delivery(err.to_string())
    }
}

impl From<LocateError> for MarionetteError {
    fn from(err: LocateError) -> Self {
        MarionetteError::Locate(err.to_string())
    }
}

impl From<ExecuteError> for MarionetteError {
    fn from(err: ExecuteError) -> Self {
        MarionetteError::Execute(err.to_string())
    }
}

impl From<NotifyError> for MarionetteError {
    fn from(err: NotifyError) -> Self {
        MarionetteError::Notify(err.to_string())
    }
}
