//! Batch orchestration engine
//!
//! This module provides the [`BatchRunner`] that fans power operations out
//! across many devices, drives each one through the retry executor, and
//! aggregates the outcomes.

use std::fmt;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use glowworm_common::Device;
use glowworm_control::{controller_for, ControlResult, PowerAction};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::context::BatchContext;
use crate::error::{BatchError, CancelError, Result};
use crate::progress::{NoopReporter, ProgressReporter, ProgressUpdate};
use crate::registry::DeviceRegistry;
use crate::retry::{execute_with_retry, RetryPolicy, CANCELLED_MESSAGE};

/// State of a batch operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BatchState {
    /// Created but not yet dispatched
    Pending,
    /// Devices are being processed
    Running,
    /// All devices ran to completion
    Completed,
    /// Cancellation stopped the batch before every device ran
    Cancelled,
    /// An internal failure interrupted processing
    Errored,
}

impl BatchState {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchState::Pending => "pending",
            BatchState::Running => "running",
            BatchState::Completed => "completed",
            BatchState::Cancelled => "cancelled",
            BatchState::Errored => "errored",
        }
    }

    /// Whether the batch has finished in this state
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchState::Completed | BatchState::Cancelled | BatchState::Errored
        )
    }
}

impl fmt::Display for BatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Outcome for one device within a batch
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeviceResult {
    /// Id the caller asked for
    pub device_id: String,

    /// Display name, falling back to the id for unknown devices
    pub device_name: String,

    /// Whether cancellation, not the device, produced this outcome
    #[serde(default)]
    pub cancelled: bool,

    /// The operation's result
    #[serde(flatten)]
    pub result: ControlResult,
}

impl DeviceResult {
    /// Failed outcome for a device that never reached its controller
    pub fn failed(
        device_id: impl Into<String>,
        device_name: impl Into<String>,
        error: impl Into<String>,
        attempts: u32,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            device_name: device_name.into(),
            cancelled: false,
            result: ControlResult::fail(error, attempts),
        }
    }

    /// Outcome for a device skipped because its batch was cancelled
    pub fn cancelled(device_id: impl Into<String>, device_name: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            device_name: device_name.into(),
            cancelled: true,
            result: ControlResult::fail(CANCELLED_MESSAGE, 0),
        }
    }
}

/// Aggregate counts over a batch's device results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Attempts consumed across all devices
    pub total_attempts: u32,
    /// Most attempts consumed by any single device
    pub max_attempts: u32,
}

impl BatchSummary {
    pub fn of(results: &[DeviceResult]) -> Self {
        let successful = results.iter().filter(|r| r.result.success).count();
        let total_attempts = results.iter().map(|r| r.result.attempts).sum();
        let max_attempts = results.iter().map(|r| r.result.attempts).max().unwrap_or(0);
        Self {
            total: results.len(),
            successful,
            failed: results.len() - successful,
            total_attempts,
            max_attempts,
        }
    }
}

/// Full record of one batch operation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchOutcome {
    pub operation_id: Uuid,
    pub action: PowerAction,
    pub state: BatchState,
    /// Per-device outcomes, in the order the ids were given
    pub results: Vec<DeviceResult>,
    pub summary: BatchSummary,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

/// Event emitted during batch execution
#[derive(Debug, Clone)]
pub enum BatchEvent {
    /// Batch started
    Started {
        operation_id: Uuid,
        action: PowerAction,
        total: usize,
    },
    /// Per-device progress update
    Progress(ProgressUpdate),
    /// A device's operation finished
    DeviceFinished {
        device_id: String,
        success: bool,
        attempts: u32,
    },
    /// Cancellation was requested
    Cancelled { operation_id: Uuid },
    /// Batch finished
    Completed {
        operation_id: Uuid,
        state: BatchState,
        summary: BatchSummary,
    },
}

/// Batch orchestration engine
///
/// Resolves device ids against the registry, builds the matching
/// controller per device and fans the work out with a fixed inter-device
/// stagger, one tokio task per device. Per-device failures never abort
/// the batch; every entry point resolves to a structured outcome.
///
/// One progress batch at a time holds the cancellation slot;
/// [`BatchRunner::cancel`] requests against anything else are rejected
/// with an explanatory error.
pub struct BatchRunner {
    /// Device lookup
    registry: Arc<dyn DeviceRegistry>,

    /// Retry budget for power toggles
    power_policy: RetryPolicy,

    /// Retry budget for status checks
    status_policy: RetryPolicy,

    /// Event sender for batch events
    event_sender: broadcast::Sender<BatchEvent>,

    /// The batch currently holding the cancellation slot
    active: Mutex<Option<BatchContext>>,
}

impl BatchRunner {
    /// Create a runner with the default retry policies
    pub fn new(registry: Arc<dyn DeviceRegistry>) -> Self {
        let (event_sender, _) = broadcast::channel(1024);
        Self {
            registry,
            power_policy: RetryPolicy::for_action(PowerAction::PowerOn),
            status_policy: RetryPolicy::for_action(PowerAction::Status),
            event_sender,
            active: Mutex::new(None),
        }
    }

    /// Override the retry budget for power toggles
    pub fn with_power_policy(mut self, policy: RetryPolicy) -> Self {
        self.power_policy = policy;
        self
    }

    /// Override the retry budget for status checks
    pub fn with_status_policy(mut self, policy: RetryPolicy) -> Self {
        self.status_policy = policy;
        self
    }

    /// Subscribe to batch events
    ///
    /// The channel is bounded; a lagging subscriber loses oldest events
    /// rather than blocking the orchestrator.
    pub fn subscribe(&self) -> broadcast::Receiver<BatchEvent> {
        self.event_sender.subscribe()
    }

    fn policy_for(&self, action: PowerAction) -> RetryPolicy {
        if action.is_power_toggle() {
            self.power_policy
        } else {
            self.status_policy
        }
    }

    /// Run one action against one device
    pub async fn control_single_device(&self, device_id: &str, action: PowerAction) -> DeviceResult {
        let device = self.registry.device_by_id(device_id);
        run_device(
            0,
            device_id.to_string(),
            device,
            action,
            self.policy_for(action),
            Arc::new(NoopReporter),
            BatchContext::new(),
        )
        .await
    }

    /// Run one action against many devices without progress reporting.
    ///
    /// The batch does not take the cancellation slot, so it cannot be
    /// cancelled and never conflicts with a progress batch.
    pub async fn control_batch(&self, device_ids: &[String], action: PowerAction) -> BatchOutcome {
        self.run_batch(device_ids, action, Arc::new(NoopReporter), BatchContext::new())
            .await
    }

    /// Run one action against many devices, streaming progress to
    /// `reporter` and taking the cancellation slot.
    ///
    /// Fails with [`BatchError::AlreadyRunning`] while another progress
    /// batch holds the slot.
    pub async fn control_batch_with_progress(
        &self,
        device_ids: &[String],
        action: PowerAction,
        reporter: Arc<dyn ProgressReporter>,
    ) -> Result<BatchOutcome> {
        let ctx = BatchContext::new();
        {
            let mut active = self.active.lock().unwrap();
            if let Some(existing) = active.as_ref() {
                return Err(BatchError::AlreadyRunning(existing.operation_id()));
            }
            *active = Some(ctx.clone());
        }
        let _guard = ActiveBatchGuard(&self.active);

        Ok(self.run_batch(device_ids, action, reporter, ctx).await)
    }

    /// Request cancellation of the active batch.
    ///
    /// The id must name the batch currently holding the cancellation
    /// slot. In-flight attempts are not aborted; devices and retries that
    /// have not started yet are skipped.
    pub fn cancel(&self, operation_id: Uuid) -> std::result::Result<(), CancelError> {
        let active = self.active.lock().unwrap();
        match active.as_ref() {
            None => Err(CancelError::NoActiveBatch),
            Some(ctx) if ctx.operation_id() != operation_id => Err(CancelError::OperationMismatch {
                requested: operation_id,
                active: ctx.operation_id(),
            }),
            Some(ctx) => {
                info!(operation_id = %operation_id, "Cancelling batch operation");
                ctx.cancel();
                let _ = self.event_sender.send(BatchEvent::Cancelled { operation_id });
                Ok(())
            }
        }
    }

    async fn run_batch(
        &self,
        device_ids: &[String],
        action: PowerAction,
        reporter: Arc<dyn ProgressReporter>,
        ctx: BatchContext,
    ) -> BatchOutcome {
        let operation_id = ctx.operation_id();
        let policy = self.policy_for(action);
        let started_at = Utc::now();
        info!(
            operation_id = %operation_id,
            action = %action,
            devices = device_ids.len(),
            "Starting batch operation"
        );

        let _ = self.event_sender.send(BatchEvent::Started {
            operation_id,
            action,
            total: device_ids.len(),
        });

        // Updates go to the caller's reporter and onto the event stream.
        let reporter: Arc<dyn ProgressReporter> = Arc::new(EventProgressReporter {
            inner: reporter,
            sender: self.event_sender.clone(),
        });

        let mut handles = Vec::new();
        for (index, device_id) in device_ids.iter().enumerate() {
            let device = self.registry.device_by_id(device_id);
            let device_id = device_id.clone();
            let reporter = reporter.clone();
            let ctx = ctx.clone();
            handles.push(tokio::spawn(async move {
                run_device(index, device_id, device, action, policy, reporter, ctx).await
            }));
        }

        let mut results = Vec::with_capacity(handles.len());
        let mut join_failed = false;
        for (handle, device_id) in handles.into_iter().zip(device_ids) {
            let result = match handle.await {
                Ok(result) => result,
                Err(err) => {
                    error!(device_id = %device_id, error = %err, "Device task failed");
                    join_failed = true;
                    DeviceResult::failed(
                        device_id.clone(),
                        device_id.clone(),
                        format!("Internal error: {err}"),
                        0,
                    )
                }
            };
            let _ = self.event_sender.send(BatchEvent::DeviceFinished {
                device_id: result.device_id.clone(),
                success: result.result.success,
                attempts: result.result.attempts,
            });
            results.push(result);
        }

        let summary = BatchSummary::of(&results);
        let state = if ctx.is_cancelled() {
            BatchState::Cancelled
        } else if join_failed {
            BatchState::Errored
        } else {
            BatchState::Completed
        };

        let _ = self.event_sender.send(BatchEvent::Completed {
            operation_id,
            state,
            summary,
        });
        info!(
            operation_id = %operation_id,
            state = %state,
            successful = summary.successful,
            failed = summary.failed,
            "Batch operation finished"
        );

        BatchOutcome {
            operation_id,
            action,
            state,
            results,
            summary,
            started_at,
            completed_at: Some(Utc::now()),
        }
    }
}

impl fmt::Debug for BatchRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchRunner")
            .field("power_policy", &self.power_policy)
            .field("status_policy", &self.status_policy)
            .finish_non_exhaustive()
    }
}

/// Clears the cancellation slot when its batch finishes or is dropped
struct ActiveBatchGuard<'a>(&'a Mutex<Option<BatchContext>>);

impl Drop for ActiveBatchGuard<'_> {
    fn drop(&mut self) {
        *self.0.lock().unwrap() = None;
    }
}

/// Progress reporter that also emits batch events
struct EventProgressReporter {
    inner: Arc<dyn ProgressReporter>,
    sender: broadcast::Sender<BatchEvent>,
}

impl ProgressReporter for EventProgressReporter {
    fn report(&self, update: ProgressUpdate) {
        let _ = self.sender.send(BatchEvent::Progress(update.clone()));
        self.inner.report(update);
    }
}

/// Process one device slot of a batch
async fn run_device(
    index: usize,
    device_id: String,
    device: Option<Device>,
    action: PowerAction,
    policy: RetryPolicy,
    reporter: Arc<dyn ProgressReporter>,
    ctx: BatchContext,
) -> DeviceResult {
    let device_name = device
        .as_ref()
        .map(|d| d.name.clone())
        .unwrap_or_else(|| device_id.clone());

    // Stagger dispatch so a large batch does not hit the network all at
    // once.
    if index > 0 && !ctx.is_cancelled() {
        tokio::time::sleep(policy.device_delay * index as u32).await;
    }
    if ctx.is_cancelled() {
        debug!(device_id = %device_id, "Skipping device, batch cancelled");
        return DeviceResult::cancelled(device_id, device_name);
    }

    let Some(device) = device else {
        warn!(device_id = %device_id, "Device not found");
        return DeviceResult::failed(device_id, device_name, "Device not found", 0);
    };

    let mut controller = match controller_for(&device) {
        Ok(controller) => controller,
        Err(error) => {
            warn!(device_id = %device_id, error = %error, "Device cannot be controlled");
            return DeviceResult::failed(device_id, device_name, error.to_string(), 0);
        }
    };

    reporter.report(ProgressUpdate::running(
        &device_id,
        &device_name,
        format!("Sending {action} command..."),
    ));

    let outcome = execute_with_retry(
        controller.as_mut(),
        action,
        &policy,
        reporter.as_ref(),
        &ctx,
        &device_id,
        &device_name,
    )
    .await;

    if outcome.result.success {
        reporter.report(ProgressUpdate::success(
            &device_id,
            &device_name,
            outcome.result.attempts,
        ));
    } else {
        let message = outcome
            .result
            .error
            .clone()
            .unwrap_or_else(|| "operation failed".to_string());
        reporter.report(ProgressUpdate::failed(
            &device_id,
            &device_name,
            outcome.result.attempts,
            message,
        ));
    }

    DeviceResult {
        device_id,
        device_name,
        cancelled: outcome.cancelled,
        result: outcome.result,
    }
}
