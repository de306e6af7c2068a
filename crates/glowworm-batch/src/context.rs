//! Cancellation handle for one batch operation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

/// Cancellation handle shared by every work item of one batch.
///
/// Each batch gets its own context; clones observe the same flag, so a
/// cancellation request reaches all of the batch's in-flight work items.
/// Cancellation is cooperative: work items check the flag before starting
/// their next step and never abort an attempt already on the wire.
#[derive(Debug, Clone)]
pub struct BatchContext {
    operation_id: Uuid,
    cancelled: Arc<AtomicBool>,
}

impl BatchContext {
    /// Create a context with a fresh operation id
    pub fn new() -> Self {
        Self {
            operation_id: Uuid::now_v7(),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Operation id identifying this batch
    pub fn operation_id(&self) -> Uuid {
        self.operation_id
    }

    /// Request cancellation of the batch
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Whether cancellation has been requested
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl Default for BatchContext {
    fn default() -> Self {
        Self::new()
    }
}
