//! Inventory listing command

use std::path::Path;

use color_eyre::eyre::Result;
use glowworm_common::Device;

use crate::inventory;

/// Print the device inventory.
pub fn run_list(inventory_path: &Path, json: bool) -> Result<()> {
    let devices = inventory::load_devices(inventory_path)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }

    if devices.is_empty() {
        println!("No devices in inventory.");
        return Ok(());
    }

    println!("{} device(s):", devices.len());
    for device in &devices {
        println!("{}", device_line(device));
    }
    Ok(())
}

fn device_line(device: &Device) -> String {
    format!(
        "  {:<16} {:<24} {:<16} {}",
        device.id,
        device.name,
        device.ip,
        device.kind.as_str()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use glowworm_common::DeviceKind;

    #[test]
    fn test_device_line_columns() {
        let device = Device::new("pj-01", "Hall projector", "192.168.1.50", DeviceKind::Tcp);
        let line = device_line(&device);
        assert!(line.contains("pj-01"));
        assert!(line.contains("Hall projector"));
        assert!(line.contains("192.168.1.50"));
        assert!(line.ends_with("tcp"));
    }
}
