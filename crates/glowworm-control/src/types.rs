//! Common types for device control operations

use serde::{Deserialize, Serialize};
use std::fmt;

/// Power action requested against a device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerAction {
    PowerOn,
    PowerOff,
    Status,
}

impl PowerAction {
    /// Machine-readable action string for results and events
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerAction::PowerOn => "powerOn",
            PowerAction::PowerOff => "powerOff",
            PowerAction::Status => "status",
        }
    }

    /// Whether this is a power toggle rather than a status query
    pub fn is_power_toggle(&self) -> bool {
        matches!(self, PowerAction::PowerOn | PowerAction::PowerOff)
    }
}

impl fmt::Display for PowerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PowerAction::PowerOn => write!(f, "power on"),
            PowerAction::PowerOff => write!(f, "power off"),
            PowerAction::Status => write!(f, "status"),
        }
    }
}

/// Probed power status of a machine
///
/// - `Online`: ping answered and the watch port (if any) accepts connections
/// - `Partial`: ping answered but the watch port is closed
/// - `Offline`: ping did not answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PowerStatus {
    Online,
    Partial,
    Offline,
}

impl PowerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerStatus::Online => "online",
            PowerStatus::Partial => "partial",
            PowerStatus::Offline => "offline",
        }
    }
}

impl fmt::Display for PowerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What one successful controller exchange produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlResponse {
    /// Raw response text (trimmed TCP reply, or HTTP body)
    pub response: Option<String>,
    /// Probed power status, for status checks that classify rather than ask
    pub status: Option<PowerStatus>,
    /// HTTP status code, when the exchange went over HTTP
    pub http_status: Option<u16>,
    /// Elapsed time for the exchange
    pub response_time_ms: Option<u64>,
}

impl ControlResponse {
    /// Exchange that produced response text
    pub fn text(response: impl Into<String>) -> Self {
        Self {
            response: Some(response.into()),
            ..Default::default()
        }
    }

    /// Exchange that classified the device's status
    pub fn probed(status: PowerStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn with_time(mut self, elapsed_ms: u64) -> Self {
        self.response_time_ms = Some(elapsed_ms);
        self
    }
}

/// The uniform outcome of one power operation on one device.
///
/// Every field is a primitive-safe JSON value because results cross a
/// serialization boundary on their way to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ControlResult {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PowerStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(default)]
    pub attempts: u32,
}

impl ControlResult {
    /// Successful outcome carrying what the exchange produced
    pub fn ok(response: ControlResponse, attempts: u32) -> Self {
        Self {
            success: true,
            error: None,
            response: response.response,
            status: response.status,
            http_status: response.http_status,
            response_time_ms: response.response_time_ms,
            attempts,
        }
    }

    /// Failed outcome carrying a human-readable error
    pub fn fail(error: impl Into<String>, attempts: u32) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            response: None,
            status: None,
            http_status: None,
            response_time_ms: None,
            attempts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_action_strings() {
        assert_eq!(PowerAction::PowerOn.as_str(), "powerOn");
        assert_eq!(PowerAction::PowerOff.as_str(), "powerOff");
        assert_eq!(PowerAction::Status.as_str(), "status");
        assert_eq!(PowerAction::PowerOn.to_string(), "power on");
    }

    #[test]
    fn test_power_action_serde() {
        assert_eq!(
            serde_json::to_string(&PowerAction::PowerOn).unwrap(),
            "\"powerOn\""
        );
        let action: PowerAction = serde_json::from_str("\"status\"").unwrap();
        assert_eq!(action, PowerAction::Status);
    }

    #[test]
    fn test_power_status_display() {
        assert_eq!(PowerStatus::Online.to_string(), "online");
        assert_eq!(PowerStatus::Partial.to_string(), "partial");
        assert_eq!(PowerStatus::Offline.to_string(), "offline");
    }

    #[test]
    fn test_result_ok_carries_exchange_fields() {
        let response = ControlResponse::text("PWR ON OK")
            .with_http_status(200)
            .with_time(42);
        let result = ControlResult::ok(response, 2);

        assert!(result.success);
        assert_eq!(result.response.as_deref(), Some("PWR ON OK"));
        assert_eq!(result.http_status, Some(200));
        assert_eq!(result.response_time_ms, Some(42));
        assert_eq!(result.attempts, 2);
        assert_eq!(result.error, None);
    }

    #[test]
    fn test_result_serializes_camel_case_and_skips_none() {
        let value = serde_json::to_value(ControlResult::fail("Device not found", 0)).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["error"], "Device not found");
        assert_eq!(value["attempts"], 0);
        assert!(value.get("response").is_none());
        assert!(value.get("httpStatus").is_none());

        let value = serde_json::to_value(ControlResult::ok(
            ControlResponse::probed(PowerStatus::Offline),
            1,
        ))
        .unwrap();
        assert_eq!(value["status"], "offline");
    }
}
