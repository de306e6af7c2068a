//! TCP socket controller
//!
//! Drives projectors that speak line-oriented command protocols over a raw
//! TCP socket ("PWR ON" style commands by default). One operation means one
//! connect, one command, one response, then the socket is dropped.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::time::{Duration, Instant};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use glowworm_common::Device;

use crate::controller::DeviceController;
use crate::error::{ControlError, Result};
use crate::types::{ControlResponse, PowerAction};
use crate::validate;

/// Default TCP control port
pub const DEFAULT_TCP_PORT: u16 = 9763;

/// Time allowed for the TCP connect
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(15);

/// Time allowed for one command/response exchange
pub const SEND_TIMEOUT: Duration = Duration::from_secs(13);

const DEFAULT_POWER_ON: &str = "PWR ON\r\n";
const DEFAULT_POWER_OFF: &str = "PWR OFF\r\n";
const DEFAULT_STATUS: &str = "PWR?\r\n";

/// TCP device controller
///
/// Owns at most one socket. Operations reconnect if the socket is not up
/// and force-close it once the exchange finishes, so a controller can be
/// driven through several retry attempts without leaking connections.
pub struct TcpController {
    ip: String,
    port: u16,
    power_on_cmd: String,
    power_off_cmd: String,
    status_cmd: String,
    stream: Option<TcpStream>,
}

impl TcpController {
    pub fn new(device: &Device) -> Self {
        let commands = device.tcp_commands.clone().unwrap_or_default();
        Self {
            ip: device.ip.clone(),
            port: device.port.unwrap_or(DEFAULT_TCP_PORT),
            power_on_cmd: commands
                .power_on
                .unwrap_or_else(|| DEFAULT_POWER_ON.to_string()),
            power_off_cmd: commands
                .power_off
                .unwrap_or_else(|| DEFAULT_POWER_OFF.to_string()),
            status_cmd: commands.status.unwrap_or_else(|| DEFAULT_STATUS.to_string()),
            stream: None,
        }
    }

    /// Open the control connection unless one is already up.
    async fn connect(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let addr = format!("{}:{}", self.ip, self.port);
        debug!(addr = %addr, "opening control connection");

        let stream = match timeout(CONNECT_TIMEOUT, TcpStream::connect(&addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => return Err(connect_error(&addr, &e)),
            Err(_) => {
                return Err(ControlError::ConnectionFailed(format!(
                    "connection to {addr} timed out"
                )))
            }
        };

        self.stream = Some(stream);
        Ok(())
    }

    /// Force-close the control connection, if any.
    async fn disconnect(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            let _ = stream.shutdown().await;
        }
    }

    /// Send one command and wait for exactly one response buffer.
    async fn send_command(&mut self, command: &str) -> Result<ControlResponse> {
        self.connect().await?;

        let payload = process_escapes(command);
        let started = Instant::now();

        let result = match self.stream.as_mut() {
            Some(stream) => exchange(stream, payload.as_bytes()).await,
            None => Err(ControlError::ConnectionFailed(
                "socket closed before send".to_string(),
            )),
        };
        self.disconnect().await;

        let text = result?;
        debug!(response = %text, "device answered");
        Ok(ControlResponse::text(text).with_time(started.elapsed().as_millis() as u64))
    }
}

#[async_trait]
impl DeviceController for TcpController {
    async fn power_on(&mut self) -> Result<ControlResponse> {
        let command = self.power_on_cmd.clone();
        self.send_command(&command).await
    }

    async fn power_off(&mut self) -> Result<ControlResponse> {
        let command = self.power_off_cmd.clone();
        self.send_command(&command).await
    }

    async fn status(&mut self) -> Result<ControlResponse> {
        let command = self.status_cmd.clone();
        self.send_command(&command).await
    }

    fn validate(&self, action: PowerAction, response: &ControlResponse) -> bool {
        match &response.response {
            Some(text) => validate::tcp_response_ok(action, text),
            None => false,
        }
    }
}

/// One write plus one read, bounded by the send timeout.
async fn exchange(stream: &mut TcpStream, payload: &[u8]) -> Result<String> {
    let roundtrip = async {
        stream.write_all(payload).await?;
        let mut buf = vec![0u8; 1024];
        let len = stream.read(&mut buf).await?;
        Ok::<_, std::io::Error>(String::from_utf8_lossy(&buf[..len]).trim().to_string())
    };

    match timeout(SEND_TIMEOUT, roundtrip).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(ControlError::NetworkError(format!("send failed: {e}"))),
        Err(_) => Err(ControlError::Timeout(SEND_TIMEOUT)),
    }
}

/// Convert literal `\r`/`\n` escape sequences from device config into real
/// CR/LF bytes.
fn process_escapes(command: &str) -> String {
    command.replace("\\r", "\r").replace("\\n", "\n")
}

/// Map connect failures to messages an operator can act on.
fn connect_error(addr: &str, err: &std::io::Error) -> ControlError {
    let message = match err.kind() {
        ErrorKind::ConnectionRefused => {
            format!("{addr} refused the connection, device may not be listening on this port")
        }
        ErrorKind::TimedOut => format!("connection to {addr} timed out"),
        ErrorKind::HostUnreachable | ErrorKind::NetworkUnreachable => {
            format!("{addr} is unreachable, check the network path to the device")
        }
        _ if err.to_string().contains("failed to lookup address") => {
            format!("host name in {addr} could not be resolved")
        }
        _ => format!("could not connect to {addr}: {err}"),
    };
    ControlError::ConnectionFailed(message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use glowworm_common::{DeviceKind, TcpCommands};
    use tokio::net::TcpListener;

    async fn fixture_server(reply: &'static str) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 256];
                let _ = socket.read(&mut buf).await;
                let _ = socket.write_all(reply.as_bytes()).await;
            }
        });
        port
    }

    fn tcp_device(port: u16) -> Device {
        Device::new("pj-01", "Test projector", "127.0.0.1", DeviceKind::Tcp).with_port(port)
    }

    #[tokio::test]
    async fn test_power_on_exchanges_command() {
        let port = fixture_server("PWR ON OK\r\n").await;
        let device = tcp_device(port);
        let mut controller = TcpController::new(&device);

        let response = controller.power_on().await.unwrap();
        assert_eq!(response.response.as_deref(), Some("PWR ON OK"));
        assert!(response.response_time_ms.is_some());
        assert!(controller.validate(PowerAction::PowerOn, &response));
    }

    #[tokio::test]
    async fn test_validation_rejects_error_reply() {
        let port = fixture_server("ERR\r\n").await;
        let device = tcp_device(port);
        let mut controller = TcpController::new(&device);

        let response = controller.power_on().await.unwrap();
        assert!(!controller.validate(PowerAction::PowerOn, &response));
        // A status query would accept the same reply.
        assert!(controller.validate(PowerAction::Status, &response));
    }

    #[tokio::test]
    async fn test_connection_refused_maps_to_friendly_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let device = tcp_device(port);
        let mut controller = TcpController::new(&device);

        let err = controller.power_on().await.unwrap_err();
        assert!(err.to_string().contains("refused"), "got: {err}");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_custom_commands_are_escape_processed() {
        // Echo server: the reply is whatever bytes arrived.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 256];
                let len = socket.read(&mut buf).await.unwrap_or(0);
                let _ = socket.write_all(&buf[..len]).await;
            }
        });

        let device = tcp_device(port).with_tcp_commands(TcpCommands {
            power_on: Some("ON\\r\\n".to_string()),
            ..Default::default()
        });
        let mut controller = TcpController::new(&device);

        // The echoed reply comes back trimmed, so the literal escapes must
        // have turned into real CR/LF on the wire.
        let response = controller.power_on().await.unwrap();
        assert_eq!(response.response.as_deref(), Some("ON"));
    }

    #[tokio::test]
    async fn test_empty_reply_fails_status_validation() {
        // Server closes without writing anything.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            if let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 256];
                let _ = socket.read(&mut buf).await;
            }
        });

        let device = tcp_device(port);
        let mut controller = TcpController::new(&device);

        let response = controller.status().await.unwrap();
        assert_eq!(response.response.as_deref(), Some(""));
        assert!(!controller.validate(PowerAction::Status, &response));
    }

    #[test]
    fn test_process_escapes() {
        assert_eq!(process_escapes("PWR ON\\r\\n"), "PWR ON\r\n");
        assert_eq!(process_escapes("no escapes"), "no escapes");
    }

    #[test]
    fn test_default_commands_and_port() {
        let device = Device::new("pj-02", "Bare projector", "10.0.0.5", DeviceKind::Tcp);
        let controller = TcpController::new(&device);
        assert_eq!(controller.port, DEFAULT_TCP_PORT);
        assert_eq!(controller.power_on_cmd, "PWR ON\r\n");
        assert_eq!(controller.power_off_cmd, "PWR OFF\r\n");
        assert_eq!(controller.status_cmd, "PWR?\r\n");
    }
}
