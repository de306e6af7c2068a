//! Glowworm Batch Orchestration
//!
//! This crate drives power operations across many devices at once. It
//! resolves device ids, builds the matching protocol controller per
//! device, retries transient failures, and reports progress while a
//! batch runs, with cooperative cancellation.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                 BatchRunner                          │
//! │  ┌─────────────────────────────────────────────┐    │
//! │  │          DeviceRegistry                     │    │
//! │  │   resolve ids to device records             │    │
//! │  └─────────────────────────────────────────────┘    │
//! │                      │                               │
//! │                      ▼                               │
//! │  ┌─────────────────────────────────────────────┐    │
//! │  │     Retry Executor (per device task)        │    │
//! │  │   controller call, validate, retry          │    │
//! │  └─────────────────────────────────────────────┘    │
//! │                      │                               │
//! │                      ▼                               │
//! │  ┌─────────────────────────────────────────────┐    │
//! │  │          BatchEvent Stream                  │    │
//! │  │   Started | Progress | Completed            │    │
//! │  └─────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```ignore
//! use glowworm_batch::{BatchRunner, MemoryRegistry};
//! use glowworm_control::PowerAction;
//! use std::sync::Arc;
//!
//! let registry = Arc::new(MemoryRegistry::from_devices(inventory));
//! let runner = BatchRunner::new(registry);
//!
//! let outcome = runner.control_batch(&device_ids, PowerAction::PowerOn).await;
//! println!("{} of {} devices on", outcome.summary.successful, outcome.summary.total);
//! ```

pub mod batch;
pub mod context;
pub mod error;
pub mod progress;
pub mod registry;
pub mod retry;

pub use batch::*;
pub use context::*;
pub use error::*;
pub use progress::*;
pub use registry::*;
pub use retry::*;
