//! Error types for shotlens.

use thiserror::Error;

/// Result type alias using shotlens' Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for shotlens operations.
///
/// Pipeline stages absorb these locally and degrade; they only surface to
/// callers at collaborator boundaries (recognizer, model backend, CLI input).
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid input (bad geometry, empty image, unreadable payload)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Text recognizer failed or is unavailable
    #[error("Recognition error: {0}")]
    Recognition(String),

    /// Model-backed generation failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error (invariant violation, closed gate)
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_invalid_input() {
        let err = Error::InvalidInput("non-finite block geometry".to_string());
        assert_eq!(err.to_string(), "Invalid input: non-finite block geometry");
    }

    #[test]
    fn test_error_display_recognition() {
        let err = Error::Recognition("recognizer offline".to_string());
        assert_eq!(err.to_string(), "Recognition error: recognizer offline");
    }

    #[test]
    fn test_error_display_inference() {
        let err = Error::Inference("model timeout".to_string());
        assert_eq!(err.to_string(), "Inference error: model timeout");
    }

    #[test]
    fn test_error_display_internal() {
        let err = Error::Internal("gate closed".to_string());
        assert_eq!(err.to_string(), "Internal error: gate closed");
    }

    #[test]
    fn test_from_serde_json_error() {
        let json_err = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: Error = json_err.into();
        match err {
            Error::Serialization(msg) => assert!(!msg.is_empty()),
            _ => panic!("Expected Serialization error"),
        }
    }

    #[test]
    fn test_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing dump");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.to_string().contains("missing dump"));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<Error>();
        assert_sync::<Error>();
    }
}
