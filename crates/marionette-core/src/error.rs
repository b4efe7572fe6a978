use thiserror::Error;

/// Top-level error type for the marionette system.
///
/// Each variant wraps a subsystem-specific error. Subsystem crates define
/// their own error types and implement `From<SubsystemError> for
/// MarionetteError` so that the `?` operator works seamlessly across crate
/// boundaries.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MarionetteError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Message store error: {0}")]
    Store(String),

    #[error("Dispatch error: {0}")]
    Dispatch(String),

    #[error("Target resolution error: {0}")]
    Locate(String),

    #[error("Action execution error: {0}")]
    Execute(String),

    #[error("Escalation delivery error: {0}")]
    Notify(String),

    #[error("API error: {0}")]
    Api(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Shutdown in progress")]
    ShuttingDown,
}

impl From<toml::de::Error> for MarionetteError {
    fn from(err: toml::de::Error) -> Self {
        MarionetteError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for MarionetteError {
    fn from(err: toml::ser::Error) -> Self {
        MarionetteError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for MarionetteError {
    fn from(err: serde_json::Error) -> Self {
        MarionetteError::Serialization(err.to_string())
    }
}

/// Convenience alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, MarionetteError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = MarionetteError::Config("missing db_key".to_string());
        assert_eq!(err.to_string(), "Configuration error: missing db_key");

        let err = MarionetteError::Store("read failed".to_string());
        assert_eq!(err.to_string(), "Message store error: read failed");

        let err = MarionetteError::Execute("click rejected".to_string());
        assert_eq!(err.to_string(), "Action execution error: click rejected");
    }

    #[test]
    fn test_from_io_error() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: MarionetteError = io.into();
        assert!(matches!(err, MarionetteError::Io(_)));
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn test_from_toml_error() {
        let parse_err = toml::from_str::<toml::Value>("not {{ toml").unwrap_err();
        let err: MarionetteError = parse_err.into();
        assert!(matches!(err, MarionetteError::Config(_)));
    }

    #[test]
    fn test_from_json_error() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err: MarionetteError = parse_err.into();
        assert!(matches!(err, MarionetteError::Serialization(_)));
    }
}
