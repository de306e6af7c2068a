use serde::{Deserialize, Serialize};
use std::fmt;

/// A controllable device as stored in the inventory.
///
/// Records are created and edited by the external data layer; the control
/// core only reads them. Exactly one protocol-config block should be
/// populated, matching `kind`; [`Device::sanitized`] enforces this by
/// dropping the blocks that do not belong to the device's kind.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub name: String,
    pub ip: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,
    #[serde(rename = "type")]
    pub kind: DeviceKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tcp_commands: Option<TcpCommands>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_urls: Option<HttpUrls>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_auth: Option<HttpAuth>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pc_config: Option<PcConfig>,
}

impl Device {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        ip: impl Into<String>,
        kind: DeviceKind,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            ip: ip.into(),
            port: None,
            kind,
            tcp_commands: None,
            http_urls: None,
            http_auth: None,
            pc_config: None,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_tcp_commands(mut self, commands: TcpCommands) -> Self {
        self.tcp_commands = Some(commands);
        self
    }

    pub fn with_http_urls(mut self, urls: HttpUrls) -> Self {
        self.http_urls = Some(urls);
        self
    }

    pub fn with_http_auth(mut self, auth: HttpAuth) -> Self {
        self.http_auth = Some(auth);
        self
    }

    pub fn with_pc_config(mut self, config: PcConfig) -> Self {
        self.pc_config = Some(config);
        self
    }

    /// Drop protocol-config blocks that do not match `kind`.
    ///
    /// A record whose kind was switched may still carry config from the old
    /// kind; the stale blocks are discarded rather than trusted.
    pub fn sanitized(mut self) -> Self {
        if self.kind != DeviceKind::Tcp {
            self.tcp_commands = None;
        }
        if self.kind != DeviceKind::Http {
            self.http_urls = None;
            self.http_auth = None;
        }
        if self.kind != DeviceKind::Pc {
            self.pc_config = None;
        }
        self
    }
}

/// Device protocol kind
///
/// Unknown strings deserialize to `Other` instead of failing, so a single
/// bad record cannot poison a whole inventory file. The controller factory
/// rejects `Other` devices without touching the network, and the preserved
/// string lets error messages name the offending type.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum DeviceKind {
    Tcp,
    Http,
    Pc,
    Other(String),
}

impl DeviceKind {
    /// Machine-readable kind string for logs and results
    pub fn as_str(&self) -> &str {
        match self {
            DeviceKind::Tcp => "tcp",
            DeviceKind::Http => "http",
            DeviceKind::Pc => "pc",
            DeviceKind::Other(kind) => kind,
        }
    }

    /// Whether a controller exists for this kind
    pub fn is_supported(&self) -> bool {
        !matches!(self, DeviceKind::Other(_))
    }
}

impl From<String> for DeviceKind {
    fn from(kind: String) -> Self {
        match kind.as_str() {
            "tcp" => DeviceKind::Tcp,
            "http" => DeviceKind::Http,
            "pc" => DeviceKind::Pc,
            _ => DeviceKind::Other(kind),
        }
    }
}

impl From<DeviceKind> for String {
    fn from(kind: DeviceKind) -> Self {
        kind.as_str().to_string()
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Per-device command overrides for TCP devices.
///
/// Commands may contain literal `\r`/`\n` escape sequences; the TCP
/// controller converts them to real CR/LF bytes before sending.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TcpCommands {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_off: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Per-device request paths for HTTP devices.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HttpUrls {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_on: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_off: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// Basic-auth credentials for HTTP devices.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HttpAuth {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// Configuration for PC devices (Wake-on-LAN power-on, remote shutdown,
/// ping/port status probing).
///
/// - `mac_address`: required for power-on; accepts `:` or `-` separators
/// - `os`: `windows` or `linux`, selects the remote-shutdown path
/// - `password`: a password, or a key-file path (starting with `/` or `~`)
///   for SSH key auth on Linux
/// - `shutdown_timeout`: delay in seconds before the remote host powers off
/// - `check_port`: optional TCP port probed when classifying status
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PcConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mac_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broadcast_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wol_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shutdown_timeout: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub check_port: Option<u16>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_serializes_camel_case() {
        let device = Device::new("pj-01", "Hall projector", "192.168.1.50", DeviceKind::Tcp)
            .with_port(9763)
            .with_tcp_commands(TcpCommands {
                power_on: Some("PWR ON\\r\\n".to_string()),
                ..Default::default()
            });

        let value = serde_json::to_value(&device).unwrap();
        assert_eq!(value["type"], "tcp");
        assert_eq!(value["tcpCommands"]["powerOn"], "PWR ON\\r\\n");
        assert!(value.get("pcConfig").is_none());
    }

    #[test]
    fn test_unknown_type_deserializes_to_other() {
        let json = r#"{"id":"x1","name":"Mystery","ip":"10.0.0.9","type":"serial"}"#;
        let device: Device = serde_json::from_str(json).unwrap();
        assert_eq!(device.kind, DeviceKind::Other("serial".to_string()));
        assert!(!device.kind.is_supported());
    }

    #[test]
    fn test_missing_optional_fields_default_to_none() {
        let json = r#"{"id":"pc-1","name":"Desk PC","ip":"10.0.0.20","type":"pc"}"#;
        let device: Device = serde_json::from_str(json).unwrap();
        assert_eq!(device.port, None);
        assert!(device.pc_config.is_none());
    }

    #[test]
    fn test_sanitized_drops_mismatched_config() {
        let device = Device::new("pj-02", "Lab projector", "192.168.1.51", DeviceKind::Tcp)
            .with_tcp_commands(TcpCommands::default())
            .with_pc_config(PcConfig {
                mac_address: Some("aa:bb:cc:dd:ee:ff".to_string()),
                ..Default::default()
            })
            .sanitized();

        assert!(device.tcp_commands.is_some());
        assert!(device.pc_config.is_none());
    }

    #[test]
    fn test_sanitized_keeps_matching_config() {
        let device = Device::new("pc-2", "Podium PC", "10.0.0.21", DeviceKind::Pc)
            .with_pc_config(PcConfig {
                mac_address: Some("aa:bb:cc:dd:ee:ff".to_string()),
                ..Default::default()
            })
            .sanitized();

        assert!(device.pc_config.is_some());
    }

    #[test]
    fn test_device_kind_roundtrip() {
        let kinds = [
            DeviceKind::Tcp,
            DeviceKind::Http,
            DeviceKind::Pc,
            DeviceKind::Other("serial".to_string()),
        ];
        for kind in kinds {
            let json = serde_json::to_string(&kind).unwrap();
            let back: DeviceKind = serde_json::from_str(&json).unwrap();
            assert_eq!(kind, back);
        }
    }

    #[test]
    fn test_device_kind_display() {
        assert_eq!(DeviceKind::Tcp.to_string(), "tcp");
        assert_eq!(DeviceKind::Other("serial".to_string()).to_string(), "serial");
    }
}
