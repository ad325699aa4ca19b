//! Error types for tui-relay.

use thiserror::Error;

/// Main error type for tui-relay operations.
#[derive(Error, Debug)]
pub enum RelayError {
    /// Session with the given ID was not found.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// The agent process is gone: spawn failed or it exited unexpectedly.
    #[error("agent process unavailable: {0}")]
    ProcessUnavailable(String),

    /// Invalid state transition attempted.
    #[error("invalid state transition from {from:?} to {to:?}")]
    InvalidStateTransition {
        from: crate::session::SessionState,
        to: crate::session::SessionState,
    },

    /// PTY-related error.
    #[error("PTY error: {0}")]
    Pty(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Session config serialization error.
    #[error("config error: {0}")]
    Config(#[from] serde_json::Error),

    /// Presentation sink delivery failure (edit or send).
    #[error("sink delivery failed: {0}")]
    Sink(String),

    /// Secret store access failure.
    #[error("secret store error: {0}")]
    SecretStore(String),

    /// Internal lock was poisoned.
    #[error("internal lock poisoned")]
    LockPoisoned,
}

/// Convenience Result type for tui-relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_not_found_display() {
        let err = RelayError::SessionNotFound("chan-1138".into());
        assert!(err.to_string().contains("chan-1138"));
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn test_process_unavailable_display() {
        let err = RelayError::ProcessUnavailable("exited".into());
        assert!(err.to_string().contains("agent process unavailable"));
        assert!(err.to_string().contains("exited"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let relay_err: RelayError = io_err.into();
        assert!(matches!(relay_err, RelayError::Io(_)));
        assert!(relay_err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_config_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let relay_err: RelayError = json_err.into();
        assert!(matches!(relay_err, RelayError::Config(_)));
    }

    #[test]
    fn test_pty_error_display() {
        let err = RelayError::Pty("failed to spawn".into());
        assert!(err.to_string().contains("PTY error"));
        assert!(err.to_string().contains("failed to spawn"));
    }

    #[test]
    fn test_sink_error_display() {
        let err = RelayError::Sink("transport closed".into());
        assert!(err.to_string().contains("sink delivery failed"));
    }
}
