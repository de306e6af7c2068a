//! Device controller trait and factory

use async_trait::async_trait;

use glowworm_common::{Device, DeviceKind};

use crate::error::{ControlError, Result};
use crate::http::HttpController;
use crate::pc::PcController;
use crate::tcp::TcpController;
use crate::types::{ControlResponse, PowerAction};

/// Trait for per-protocol power control operations
///
/// Implementations handle the protocol-specific details (TCP sockets, HTTP
/// REST, Wake-on-LAN plus remote shutdown). Controllers are built per
/// operation and exclusively owned by it, so operations take `&mut self`.
#[async_trait]
pub trait DeviceController: Send {
    /// Power on the device
    async fn power_on(&mut self) -> Result<ControlResponse>;

    /// Power off the device
    async fn power_off(&mut self) -> Result<ControlResponse>;

    /// Query the device's power status
    async fn status(&mut self) -> Result<ControlResponse>;

    /// Run the controller method matching `action`
    async fn execute(&mut self, action: PowerAction) -> Result<ControlResponse> {
        match action {
            PowerAction::PowerOn => self.power_on().await,
            PowerAction::PowerOff => self.power_off().await,
            PowerAction::Status => self.status().await,
        }
    }

    /// Whether a successful exchange actually answered the action.
    ///
    /// Only the TCP controller inspects response content; the other
    /// protocols accept any successful exchange.
    fn validate(&self, _action: PowerAction, _response: &ControlResponse) -> bool {
        true
    }
}

/// Build the controller matching a device's kind.
///
/// Unsupported kinds are rejected here, before any network activity
/// happens on their behalf.
pub fn controller_for(device: &Device) -> Result<Box<dyn DeviceController>> {
    match &device.kind {
        DeviceKind::Tcp => Ok(Box::new(TcpController::new(device))),
        DeviceKind::Http => Ok(Box::new(HttpController::new(device)?)),
        DeviceKind::Pc => Ok(Box::new(PcController::new(device))),
        DeviceKind::Other(kind) => Err(ControlError::UnsupportedKind(kind.clone())),
    }
}
