//! Error types for device control operations

use std::time::Duration;
use thiserror::Error;

/// Error type for device control operations
#[derive(Debug, Error)]
pub enum ControlError {
    /// Device kind has no controller
    #[error("unsupported device type: {0}")]
    UnsupportedKind(String),

    /// Required configuration is missing or malformed
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Connection could not be established
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Operation timed out
    #[error("operation timed out after {0:?}")]
    Timeout(Duration),

    /// Network-level failure while talking to the device
    #[error("network error: {0}")]
    NetworkError(String),

    /// Device answered with a non-success HTTP status
    #[error("{message}")]
    HttpStatus { status: u16, message: String },

    /// Response received but it does not answer the action
    #[error("unexpected response to {action}: {response:?}")]
    InvalidResponse { action: String, response: String },

    /// External command (wmic, ssh, sshpass) failed
    #[error("command failed: {0}")]
    CommandFailed(String),
}

impl ControlError {
    /// Whether another attempt could plausibly succeed.
    ///
    /// Configuration problems fail the same way every time; transport
    /// failures and validation misses are transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            ControlError::UnsupportedKind(_) | ControlError::InvalidConfig(_) => false,
            ControlError::ConnectionFailed(_)
            | ControlError::Timeout(_)
            | ControlError::NetworkError(_)
            | ControlError::HttpStatus { .. }
            | ControlError::InvalidResponse { .. }
            | ControlError::CommandFailed(_) => true,
        }
    }
}

/// Result type for device control operations
pub type Result<T> = std::result::Result<T, ControlError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ControlError::UnsupportedKind("serial".to_string());
        assert_eq!(err.to_string(), "unsupported device type: serial");

        let err = ControlError::ConnectionFailed("host unreachable".to_string());
        assert_eq!(err.to_string(), "connection failed: host unreachable");

        let err = ControlError::InvalidResponse {
            action: "powerOn".to_string(),
            response: "ERR".to_string(),
        };
        assert_eq!(err.to_string(), "unexpected response to powerOn: \"ERR\"");
    }

    #[test]
    fn test_config_errors_are_not_retryable() {
        assert!(!ControlError::UnsupportedKind("serial".to_string()).is_retryable());
        assert!(!ControlError::InvalidConfig("no MAC address".to_string()).is_retryable());
    }

    #[test]
    fn test_transport_errors_are_retryable() {
        assert!(ControlError::ConnectionFailed("refused".to_string()).is_retryable());
        assert!(ControlError::Timeout(Duration::from_secs(15)).is_retryable());
        assert!(ControlError::NetworkError("reset".to_string()).is_retryable());
        assert!(ControlError::CommandFailed("ssh exited with 255".to_string()).is_retryable());
    }

    #[test]
    fn test_validation_miss_is_retryable() {
        let err = ControlError::InvalidResponse {
            action: "powerOn".to_string(),
            response: "ERR".to_string(),
        };
        assert!(err.is_retryable());
    }
}
