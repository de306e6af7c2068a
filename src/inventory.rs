//! Device inventory loading
//!
//! The inventory is a JSON array of device records, maintained by hand or
//! exported from another tool. Records go through [`Device`]'s serde shape,
//! so an unknown protocol kind survives as `Other` instead of failing the
//! whole file.

use std::path::Path;

use color_eyre::eyre::{Result, WrapErr};
use glowworm_batch::MemoryRegistry;
use glowworm_common::Device;
use tracing::debug;

/// Read and parse the inventory file.
pub fn load_devices(path: &Path) -> Result<Vec<Device>> {
    let raw = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("failed to read inventory {}", path.display()))?;
    let devices: Vec<Device> = serde_json::from_str(&raw)
        .wrap_err_with(|| format!("invalid inventory {}", path.display()))?;
    debug!(path = %path.display(), devices = devices.len(), "Inventory loaded");
    Ok(devices)
}

/// Load the inventory into a registry for the batch runner.
pub fn load_registry(path: &Path) -> Result<MemoryRegistry> {
    Ok(MemoryRegistry::from_devices(load_devices(path)?))
}
