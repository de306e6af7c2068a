//! Progress reporting for batch power operations
//!
//! This module provides types for reporting per-device progress while a
//! batch runs, allowing callers to track and display progress to users.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state carried by a progress update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressState {
    /// First attempt is underway
    Running,
    /// An attempt failed and another is scheduled
    Retrying,
    /// Operation finished successfully
    Success,
    /// All attempts exhausted or a terminal error occurred
    Failed,
}

impl ProgressState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProgressState::Running => "running",
            ProgressState::Retrying => "retrying",
            ProgressState::Success => "success",
            ProgressState::Failed => "failed",
        }
    }

    /// Whether no further updates will follow for this device
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressState::Success | ProgressState::Failed)
    }
}

impl fmt::Display for ProgressState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Progress update for one device within a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressUpdate {
    /// Device id the update is about
    pub device_id: String,

    /// Display name of the device
    pub device_name: String,

    /// Lifecycle state
    pub state: ProgressState,

    /// Human-readable status message
    pub message: String,

    /// Attempts consumed so far
    #[serde(default)]
    pub attempts: u32,
}

impl ProgressUpdate {
    /// Create a new progress update
    pub fn new(
        device_id: impl Into<String>,
        device_name: impl Into<String>,
        state: ProgressState,
        message: impl Into<String>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            device_name: device_name.into(),
            state,
            message: message.into(),
            attempts: 0,
        }
    }

    /// Create a "running" update for a device starting its first attempt
    pub fn running(
        device_id: impl Into<String>,
        device_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::new(device_id, device_name, ProgressState::Running, message)
    }

    /// Create a "retrying" update after attempt `attempt` failed
    pub fn retrying(
        device_id: impl Into<String>,
        device_name: impl Into<String>,
        attempt: u32,
        error: &str,
    ) -> Self {
        Self::new(
            device_id,
            device_name,
            ProgressState::Retrying,
            format!("Attempt {attempt} failed: {error}"),
        )
        .with_attempts(attempt)
    }

    /// Create a terminal "success" update
    pub fn success(
        device_id: impl Into<String>,
        device_name: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self::new(device_id, device_name, ProgressState::Success, "Completed")
            .with_attempts(attempts)
    }

    /// Create a terminal "failed" update carrying the final error
    pub fn failed(
        device_id: impl Into<String>,
        device_name: impl Into<String>,
        attempts: u32,
        error: impl Into<String>,
    ) -> Self {
        Self::new(device_id, device_name, ProgressState::Failed, error).with_attempts(attempts)
    }

    /// Set the attempts-consumed counter
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Check if this is the device's last update
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }
}

/// Trait for types that can receive progress updates
///
/// Updates are fire-and-forget; implementations must not block the
/// caller.
pub trait ProgressReporter: Send + Sync {
    /// Report progress
    fn report(&self, update: ProgressUpdate);
}

/// A no-op progress reporter for callers that do not track progress
#[derive(Debug, Default, Clone)]
pub struct NoopReporter;

impl ProgressReporter for NoopReporter {
    fn report(&self, _update: ProgressUpdate) {
        // Intentionally empty
    }
}

/// A progress reporter that collects all updates
#[derive(Debug, Default)]
pub struct CollectingReporter {
    updates: std::sync::Mutex<Vec<ProgressUpdate>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<ProgressUpdate> {
        self.updates.lock().unwrap().clone()
    }

    pub fn last(&self) -> Option<ProgressUpdate> {
        self.updates.lock().unwrap().last().cloned()
    }

    pub fn clear(&self) {
        self.updates.lock().unwrap().clear();
    }
}

impl ProgressReporter for CollectingReporter {
    fn report(&self, update: ProgressUpdate) {
        self.updates.lock().unwrap().push(update);
    }
}
