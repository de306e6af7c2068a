//! PC controller
//!
//! Power-on goes over Wake-on-LAN. Power-off shells out to the OS-specific
//! remote shutdown tool (wmic on Windows targets, ssh/sshpass on Linux
//! targets), always with parameterized argument lists so credentials never
//! pass through a shell. Status is classified from a ping probe plus an
//! optional TCP port probe.

use async_trait::async_trait;
use std::process::Stdio;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

use glowworm_common::{Device, PcConfig};

use crate::controller::DeviceController;
use crate::error::{ControlError, Result};
use crate::types::{ControlResponse, PowerStatus};
use crate::wol::{self, MacAddr, DEFAULT_WOL_PORT};

/// Timeout for remote shutdown commands
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for ping and port probes
pub const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// Default delay handed to the remote shutdown command, in seconds
pub const DEFAULT_SHUTDOWN_DELAY_SECS: u64 = 30;

/// PC device controller (WoL, remote shutdown, reachability probing)
pub struct PcController {
    ip: String,
    config: PcConfig,
}

impl PcController {
    pub fn new(device: &Device) -> Self {
        Self {
            ip: device.ip.clone(),
            config: device.pc_config.clone().unwrap_or_default(),
        }
    }

    fn credentials(&self) -> Result<(&str, &str)> {
        match (
            self.config.username.as_deref(),
            self.config.password.as_deref(),
        ) {
            (Some(username), Some(secret)) if !username.is_empty() && !secret.is_empty() => {
                Ok((username, secret))
            }
            _ => Err(ControlError::InvalidConfig(
                "remote shutdown requires a username and a password or key file".to_string(),
            )),
        }
    }

    fn shutdown_delay_secs(&self) -> u64 {
        self.config
            .shutdown_timeout
            .unwrap_or(DEFAULT_SHUTDOWN_DELAY_SECS)
    }

    async fn shutdown_windows(&self) -> Result<ControlResponse> {
        let (username, password) = self.credentials()?;
        let node = format!("/node:{}", self.ip);
        let user = format!("/user:{username}");
        let pass = format!("/password:{password}");
        let command = format!("shutdown /s /t {} /f", self.shutdown_delay_secs());

        let output = run_command(
            "wmic",
            &[&node, &user, &pass, "process", "call", "create", &command],
        )
        .await?;
        Ok(ControlResponse::text(output))
    }

    async fn shutdown_linux(&self) -> Result<ControlResponse> {
        let (username, secret) = self.credentials()?;
        let minutes = shutdown_minutes(self.shutdown_delay_secs());
        let target = format!("{username}@{}", self.ip);
        let remote = format!("sudo shutdown -h +{minutes}");

        let output = if is_key_path(secret) {
            run_command(
                "ssh",
                &[
                    "-i",
                    secret,
                    "-o",
                    "StrictHostKeyChecking=no",
                    &target,
                    &remote,
                ],
            )
            .await?
        } else {
            run_command(
                "sshpass",
                &[
                    "-p",
                    secret,
                    "ssh",
                    "-o",
                    "StrictHostKeyChecking=no",
                    &target,
                    &remote,
                ],
            )
            .await?
        };
        Ok(ControlResponse::text(output))
    }
}

#[async_trait]
impl DeviceController for PcController {
    async fn power_on(&mut self) -> Result<ControlResponse> {
        let mac = self.config.mac_address.as_deref().ok_or_else(|| {
            ControlError::InvalidConfig("no MAC address configured for Wake-on-LAN".to_string())
        })?;
        let mac = MacAddr::parse(mac)?;
        let broadcast = wol::parse_broadcast(self.config.broadcast_address.as_deref())?;
        let port = self.config.wol_port.unwrap_or(DEFAULT_WOL_PORT);

        wol::send_magic_packet(mac, broadcast, port).await?;
        Ok(ControlResponse::text(format!("magic packet sent to {mac}")))
    }

    async fn power_off(&mut self) -> Result<ControlResponse> {
        let os = self.config.os.clone().unwrap_or_default();
        match os.to_ascii_lowercase().as_str() {
            "windows" => self.shutdown_windows().await,
            "linux" | "unix" => self.shutdown_linux().await,
            "" => Err(ControlError::InvalidConfig(
                "no operating system configured for remote shutdown".to_string(),
            )),
            other => Err(ControlError::InvalidConfig(format!(
                "unsupported operating system: {other}"
            ))),
        }
    }

    async fn status(&mut self) -> Result<ControlResponse> {
        if !ping_host(&self.ip).await {
            return Ok(ControlResponse::probed(PowerStatus::Offline));
        }

        let status = match self.config.check_port {
            Some(port) => {
                if probe_port(&self.ip, port).await {
                    PowerStatus::Online
                } else {
                    PowerStatus::Partial
                }
            }
            None => PowerStatus::Online,
        };
        Ok(ControlResponse::probed(status))
    }
}

/// A credential that looks like a filesystem path selects key auth.
fn is_key_path(secret: &str) -> bool {
    secret.starts_with('/') || secret.starts_with('~')
}

/// Seconds to whole minutes for `shutdown -h +N`, at least one.
fn shutdown_minutes(delay_secs: u64) -> u64 {
    delay_secs.div_ceil(60).max(1)
}

/// Run an external command with a bounded execution time.
///
/// Arguments are not logged; they may carry credentials.
async fn run_command(program: &str, args: &[&str]) -> Result<String> {
    debug!(program, "running remote shutdown command");

    let output = match timeout(
        COMMAND_TIMEOUT,
        tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .output(),
    )
    .await
    {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => return Err(ControlError::CommandFailed(format!("{program}: {e}"))),
        Err(_) => return Err(ControlError::Timeout(COMMAND_TIMEOUT)),
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ControlError::CommandFailed(format!(
            "{program} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

/// Ping once with a short timeout.
async fn ping_host(ip: &str) -> bool {
    let windows = cfg!(target_os = "windows");
    let args: &[&str] = if windows {
        &["-n", "1", "-w", "3000"]
    } else {
        &["-c", "1", "-W", "3"]
    };

    let output = match tokio::process::Command::new("ping")
        .args(args)
        .arg(ip)
        .stdin(Stdio::null())
        .output()
        .await
    {
        Ok(output) => output,
        Err(_) => return false,
    };

    // Windows ping exits 0 even for "destination host unreachable"
    // answers, so the reply line decides there.
    if windows {
        String::from_utf8_lossy(&output.stdout).contains("TTL=")
    } else {
        output.status.success()
    }
}

/// Check whether a TCP port accepts connections.
async fn probe_port(ip: &str, port: u16) -> bool {
    let addr = format!("{ip}:{port}");
    matches!(timeout(PROBE_TIMEOUT, TcpStream::connect(&addr)).await, Ok(Ok(_)))
}
