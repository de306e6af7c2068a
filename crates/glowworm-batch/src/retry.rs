//! Single-device retry executor
//!
//! Wraps one controller operation in bounded retry-with-delay semantics:
//! run the controller, validate the response, retry transient failures up
//! to the policy's budget. The loop checks its batch's cancellation flag
//! before every attempt and again before every retry sleep, so a cancelled
//! batch stops consuming attempts promptly without aborting an exchange
//! already on the wire.

use std::time::Duration;

use glowworm_control::{ControlError, ControlResult, DeviceController, PowerAction};
use tracing::{debug, warn};

use crate::context::BatchContext;
use crate::progress::{ProgressReporter, ProgressUpdate};

const POWER_MAX_ATTEMPTS: u32 = 10;
const POWER_RETRY_DELAY: Duration = Duration::from_secs(15);
const STATUS_MAX_ATTEMPTS: u32 = 3;
const STATUS_RETRY_DELAY: Duration = Duration::from_secs(2);
const DEVICE_STAGGER: Duration = Duration::from_millis(500);

pub(crate) const CANCELLED_MESSAGE: &str = "Operation cancelled";

/// Retry budget for one device operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Maximum attempts per device, including the first
    pub max_attempts: u32,
    /// Delay between attempts
    pub retry_delay: Duration,
    /// Stagger between device dispatches within a batch
    pub device_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy with the default inter-device stagger.
    ///
    /// `max_attempts` is floored at 1; an operation always gets its first
    /// attempt.
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
            device_delay: DEVICE_STAGGER,
        }
    }

    /// Default budget for an action: power toggles get the long budget,
    /// status checks the short one.
    pub fn for_action(action: PowerAction) -> Self {
        if action.is_power_toggle() {
            Self::new(POWER_MAX_ATTEMPTS, POWER_RETRY_DELAY)
        } else {
            Self::new(STATUS_MAX_ATTEMPTS, STATUS_RETRY_DELAY)
        }
    }

    /// Zero-delay policy for tests and dry runs
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay: Duration::ZERO,
            device_delay: Duration::ZERO,
        }
    }

    /// Override the inter-device stagger
    pub fn with_device_delay(mut self, delay: Duration) -> Self {
        self.device_delay = delay;
        self
    }
}

/// Terminal outcome of a retried operation
#[derive(Debug, Clone)]
pub struct RetryOutcome {
    /// The outcome to report for the device
    pub result: ControlResult,
    /// Whether cancellation, not the device, ended the operation
    pub cancelled: bool,
}

impl RetryOutcome {
    fn completed(result: ControlResult) -> Self {
        Self {
            result,
            cancelled: false,
        }
    }

    fn cancelled(last_error: String, attempts: u32) -> Self {
        let error = if last_error.is_empty() {
            CANCELLED_MESSAGE.to_string()
        } else {
            last_error
        };
        Self {
            result: ControlResult::fail(error, attempts),
            cancelled: true,
        }
    }
}

/// Run `action` on `controller` under `policy`.
///
/// An attempt counts as terminal-success only when the controller call
/// succeeds and the controller's validator accepts the response; a
/// rejected response is a retryable failure like any transport error.
/// Non-retryable errors return immediately with the attempts consumed so
/// far. A `retrying` update is reported before each retry, never before
/// the first attempt.
pub async fn execute_with_retry(
    controller: &mut dyn DeviceController,
    action: PowerAction,
    policy: &RetryPolicy,
    reporter: &dyn ProgressReporter,
    ctx: &BatchContext,
    device_id: &str,
    device_name: &str,
) -> RetryOutcome {
    let mut last_error = String::new();

    for attempt in 1..=policy.max_attempts {
        if ctx.is_cancelled() {
            return RetryOutcome::cancelled(last_error, attempt - 1);
        }

        let error = match controller.execute(action).await {
            Ok(response) => {
                if controller.validate(action, &response) {
                    debug!(device_id = %device_id, attempt, "Operation succeeded");
                    return RetryOutcome::completed(ControlResult::ok(response, attempt));
                }
                ControlError::InvalidResponse {
                    action: action.as_str().to_string(),
                    response: response.response.unwrap_or_default(),
                }
            }
            Err(error) => error,
        };

        warn!(device_id = %device_id, attempt, error = %error, "Attempt failed");

        if !error.is_retryable() {
            return RetryOutcome::completed(ControlResult::fail(error.to_string(), attempt));
        }
        last_error = error.to_string();

        if attempt < policy.max_attempts {
            if ctx.is_cancelled() {
                return RetryOutcome::cancelled(last_error, attempt);
            }
            reporter.report(ProgressUpdate::retrying(
                device_id,
                device_name,
                attempt,
                &last_error,
            ));
            tokio::time::sleep(policy.retry_delay).await;
        }
    }

    RetryOutcome::completed(ControlResult::fail(last_error, policy.max_attempts))
}
