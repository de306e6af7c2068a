//! Error types for batch orchestration

use thiserror::Error;
use uuid::Uuid;

/// Error type for batch orchestration
#[derive(Debug, Error)]
pub enum BatchError {
    /// A progress batch is already running and holds the cancellation slot
    #[error("batch operation {0} is already running")]
    AlreadyRunning(Uuid),
}

/// Error returned when a cancellation request cannot be honored
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CancelError {
    /// No batch currently holds the cancellation slot
    #[error("no batch operation is currently running")]
    NoActiveBatch,

    /// The request names an operation other than the active one
    #[error("operation {requested} is not the active batch (currently running: {active})")]
    OperationMismatch { requested: Uuid, active: Uuid },
}

/// Result type for batch orchestration
pub type Result<T> = std::result::Result<T, BatchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let id = Uuid::now_v7();
        let err = BatchError::AlreadyRunning(id);
        assert_eq!(err.to_string(), format!("batch operation {id} is already running"));

        let err = CancelError::NoActiveBatch;
        assert_eq!(err.to_string(), "no batch operation is currently running");
    }

    #[test]
    fn test_mismatch_names_both_operations() {
        let requested = Uuid::now_v7();
        let active = Uuid::now_v7();
        let message = CancelError::OperationMismatch { requested, active }.to_string();
        assert!(message.contains(&requested.to_string()));
        assert!(message.contains(&active.to_string()));
    }
}
