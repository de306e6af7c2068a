//! Batch power-control commands
//!
//! `power-on`, `power-off` and `status` share one execution path: load
//! the inventory, start a progress batch and render its event stream as
//! lines while it runs. Ctrl-C cancels the active batch by operation id;
//! devices already in flight still report their final state.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use color_eyre::eyre::Result;
use glowworm_batch::{
    BatchEvent, BatchOutcome, BatchRunner, NoopReporter, ProgressReporter, ProgressState,
    ProgressUpdate, RetryPolicy,
};
use glowworm_control::PowerAction;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{info, warn};
use uuid::Uuid;

use crate::inventory;

#[derive(Args, Debug)]
pub struct ControlArgs {
    /// Device ids to control, dispatched in the order given
    #[arg(required = true)]
    pub ids: Vec<String>,

    /// Override the per-device attempt budget
    #[arg(long)]
    pub retries: Option<u32>,

    /// Override the delay between attempts, in milliseconds
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,
}

/// Run one power action against the devices named in `args`.
pub async fn run_control(
    inventory_path: &Path,
    action: PowerAction,
    args: ControlArgs,
    json: bool,
) -> Result<BatchOutcome> {
    let registry = inventory::load_registry(inventory_path)?;
    let mut runner = BatchRunner::new(Arc::new(registry));
    if let Some(policy) = override_policy(action, args.retries, args.retry_delay_ms) {
        runner = if action.is_power_toggle() {
            runner.with_power_policy(policy)
        } else {
            runner.with_status_policy(policy)
        };
    }
    let runner = Arc::new(runner);

    // The renderer runs beside the batch and owns the event stream.
    let events = runner.subscribe();
    let renderer = {
        let runner = Arc::clone(&runner);
        tokio::spawn(async move { drive_events(runner, events, json).await })
    };

    let reporter: Arc<dyn ProgressReporter> = Arc::new(NoopReporter);
    let outcome = runner
        .control_batch_with_progress(&args.ids, action, reporter)
        .await?;
    renderer.await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_results(&outcome);
    }
    Ok(outcome)
}

/// Render batch events until the batch completes.
///
/// Ctrl-C requests cancellation of the batch named by the `Started`
/// event; the loop keeps draining afterwards so devices already in
/// flight still report their final state.
async fn drive_events(
    runner: Arc<BatchRunner>,
    mut events: broadcast::Receiver<BatchEvent>,
    json: bool,
) {
    let mut operation_id: Option<Uuid> = None;

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Ok(BatchEvent::Started { operation_id: id, action, total }) => {
                    operation_id = Some(id);
                    if !json {
                        println!("Starting {action} for {total} device(s)...");
                    }
                }
                Ok(BatchEvent::Progress(update)) => {
                    if !json {
                        print_progress(&update);
                    }
                }
                Ok(BatchEvent::DeviceFinished { .. }) => {}
                Ok(BatchEvent::Cancelled { .. }) => {
                    if !json {
                        println!("Cancelling, waiting for devices already in flight...");
                    }
                }
                Ok(BatchEvent::Completed { .. }) => break,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event stream lagged, some progress lines were dropped");
                }
                Err(RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                match operation_id {
                    Some(id) => match runner.cancel(id) {
                        Ok(()) => info!(operation_id = %id, "Cancellation requested"),
                        Err(error) => warn!(error = %error, "Cancellation failed"),
                    },
                    None => warn!("Interrupt received before the batch started"),
                }
            }
        }
    }
}

fn print_progress(update: &ProgressUpdate) {
    match update.state {
        ProgressState::Running | ProgressState::Retrying => {
            println!("  {}: {}", update.device_name, update.message);
        }
        ProgressState::Success => {
            println!(
                "  {}: {} ({})",
                update.device_name,
                update.message,
                attempts_label(update.attempts)
            );
        }
        ProgressState::Failed => {
            println!(
                "  {}: failed after {}: {}",
                update.device_name,
                attempts_label(update.attempts),
                update.message
            );
        }
    }
}

/// Print the per-device verdicts and the batch summary.
fn print_results(outcome: &BatchOutcome) {
    println!();
    for device in &outcome.results {
        let verdict = if device.result.success {
            "ok"
        } else if device.cancelled {
            "cancelled"
        } else {
            "failed"
        };
        let mut line = format!(
            "  {:<16} {:<10} {}",
            device.device_id,
            verdict,
            attempts_label(device.result.attempts)
        );
        if let Some(status) = device.result.status {
            line.push_str("  ");
            line.push_str(status.as_str());
        } else if let Some(response) = &device.result.response {
            line.push_str("  ");
            line.push_str(response.trim());
        }
        if let Some(error) = &device.result.error {
            line.push_str("  ");
            line.push_str(error);
        }
        println!("{line}");
    }

    let summary = outcome.summary;
    println!(
        "Batch {}: {} of {} succeeded, {} failed.",
        outcome.state, summary.successful, summary.total, summary.failed
    );
}

/// Apply CLI retry overrides on top of the action's default budget.
fn override_policy(
    action: PowerAction,
    retries: Option<u32>,
    retry_delay_ms: Option<u64>,
) -> Option<RetryPolicy> {
    if retries.is_none() && retry_delay_ms.is_none() {
        return None;
    }
    let base = RetryPolicy::for_action(action);
    let delay = retry_delay_ms
        .map(Duration::from_millis)
        .unwrap_or(base.retry_delay);
    Some(RetryPolicy::new(retries.unwrap_or(base.max_attempts), delay))
}

fn attempts_label(attempts: u32) -> String {
    if attempts == 1 {
        "1 attempt".to_string()
    } else {
        format!("{attempts} attempts")
    }
}
