//! Device registry lookup
//!
//! The orchestrator resolves device ids through this trait. The real
//! inventory lives outside the control core; [`MemoryRegistry`] backs the
//! CLI and tests.

use glowworm_common::Device;
use std::collections::HashMap;
use std::sync::RwLock;

/// Synchronous device lookup used by the orchestrator
pub trait DeviceRegistry: Send + Sync {
    /// Look up a device by id
    fn device_by_id(&self, id: &str) -> Option<Device>;
}

/// In-memory registry backed by a map
#[derive(Debug, Default)]
pub struct MemoryRegistry {
    devices: RwLock<HashMap<String, Device>>,
}

impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from an inventory of devices
    pub fn from_devices(devices: impl IntoIterator<Item = Device>) -> Self {
        let registry = Self::new();
        for device in devices {
            registry.insert(device);
        }
        registry
    }

    /// Insert a device, dropping config blocks that do not match its kind
    pub fn insert(&self, device: Device) {
        let device = device.sanitized();
        self.devices.write().unwrap().insert(device.id.clone(), device);
    }

    /// Remove a device by id
    pub fn remove(&self, id: &str) -> Option<Device> {
        self.devices.write().unwrap().remove(id)
    }

    /// All registered devices, in no particular order
    pub fn devices(&self) -> Vec<Device> {
        self.devices.read().unwrap().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.devices.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.read().unwrap().is_empty()
    }
}

impl DeviceRegistry for MemoryRegistry {
    fn device_by_id(&self, id: &str) -> Option<Device> {
        self.devices.read().unwrap().get(id).cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glowworm_common::{DeviceKind, PcConfig, TcpCommands};

    #[test]
    fn test_lookup_by_id() {
        let registry = MemoryRegistry::new();
        registry.insert(Device::new("pj-01", "Hall projector", "192.168.1.50", DeviceKind::Tcp));

        let device = registry.device_by_id("pj-01").unwrap();
        assert_eq!(device.name, "Hall projector");
        assert!(registry.device_by_id("pj-99").is_none());
    }

    #[test]
    fn test_insert_sanitizes_config_blocks() {
        let registry = MemoryRegistry::new();
        registry.insert(
            Device::new("pj-02", "Lab projector", "192.168.1.51", DeviceKind::Tcp)
                .with_tcp_commands(TcpCommands::default())
                .with_pc_config(PcConfig {
                    mac_address: Some("aa:bb:cc:dd:ee:ff".to_string()),
                    ..Default::default()
                }),
        );

        let device = registry.device_by_id("pj-02").unwrap();
        assert!(device.tcp_commands.is_some());
        assert!(device.pc_config.is_none());
    }

    #[test]
    fn test_insert_replaces_existing_record() {
        let registry = MemoryRegistry::new();
        registry.insert(Device::new("pj-01", "Old name", "192.168.1.50", DeviceKind::Tcp));
        registry.insert(Device::new("pj-01", "New name", "192.168.1.50", DeviceKind::Tcp));

        assert_eq!(registry.len(), 1);
        assert_eq!(registry.device_by_id("pj-01").unwrap().name, "New name");
    }

    #[test]
    fn test_from_devices() {
        let registry = MemoryRegistry::from_devices([
            Device::new("pj-01", "Hall projector", "192.168.1.50", DeviceKind::Tcp),
            Device::new("pc-01", "Podium PC", "192.168.1.60", DeviceKind::Pc),
        ]);

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.devices().len(), 2);
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_remove() {
        let registry = MemoryRegistry::new();
        registry.insert(Device::new("pj-01", "Hall projector", "192.168.1.50", DeviceKind::Tcp));

        let removed = registry.remove("pj-01").unwrap();
        assert_eq!(removed.id, "pj-01");
        assert!(registry.is_empty());
        assert!(registry.remove("pj-01").is_none());
    }
}
