//! HTTP REST controller
//!
//! Drives devices that expose simple GET endpoints for power control, with
//! optional basic auth. Success is any 2xx answer; the body, status code
//! and elapsed time all land in the result.

use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::{Duration, Instant};
use tracing::debug;

use glowworm_common::Device;

use crate::controller::DeviceController;
use crate::error::{ControlError, Result};
use crate::types::{ControlResponse, PowerAction};

/// Default HTTP control port
pub const DEFAULT_HTTP_PORT: u16 = 80;

/// Per-request timeout
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

const DEFAULT_POWER_ON_PATH: &str = "/api/power/on";
const DEFAULT_POWER_OFF_PATH: &str = "/api/power/off";
const DEFAULT_STATUS_PATH: &str = "/api/status";

/// HTTP device controller
pub struct HttpController {
    client: reqwest::Client,
    base_url: String,
    power_on_path: String,
    power_off_path: String,
    status_path: String,
    username: Option<String>,
    password: Option<String>,
}

impl HttpController {
    pub fn new(device: &Device) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| ControlError::InvalidConfig(format!("failed to build HTTP client: {e}")))?;

        let urls = device.http_urls.clone().unwrap_or_default();
        let auth = device.http_auth.clone().unwrap_or_default();
        let port = device.port.unwrap_or(DEFAULT_HTTP_PORT);

        Ok(Self {
            client,
            base_url: format!("http://{}:{}", device.ip, port),
            power_on_path: urls
                .power_on
                .unwrap_or_else(|| DEFAULT_POWER_ON_PATH.to_string()),
            power_off_path: urls
                .power_off
                .unwrap_or_else(|| DEFAULT_POWER_OFF_PATH.to_string()),
            status_path: urls.status.unwrap_or_else(|| DEFAULT_STATUS_PATH.to_string()),
            username: auth.username,
            password: auth.password,
        })
    }

    fn url_for(&self, action: PowerAction) -> String {
        let path = match action {
            PowerAction::PowerOn => &self.power_on_path,
            PowerAction::PowerOff => &self.power_off_path,
            PowerAction::Status => &self.status_path,
        };
        format!("{}{}", self.base_url, path)
    }

    async fn request(&self, action: PowerAction) -> Result<ControlResponse> {
        let url = self.url_for(action);
        debug!(url = %url, "sending control request");

        let mut request = self.client.get(&url);
        if let Some(username) = &self.username {
            request = request.basic_auth(username, self.password.as_deref());
        }

        let started = Instant::now();
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(&url, &e))?;

        let status = response.status();
        let elapsed_ms = started.elapsed().as_millis() as u64;
        let body = response.text().await.map_err(|e| {
            ControlError::NetworkError(format!("failed to read response body: {e}"))
        })?;

        if !status.is_success() {
            return Err(status_error(status));
        }

        Ok(ControlResponse::text(body)
            .with_http_status(status.as_u16())
            .with_time(elapsed_ms))
    }
}

#[async_trait]
impl DeviceController for HttpController {
    async fn power_on(&mut self) -> Result<ControlResponse> {
        self.request(PowerAction::PowerOn).await
    }

    async fn power_off(&mut self) -> Result<ControlResponse> {
        self.request(PowerAction::PowerOff).await
    }

    async fn status(&mut self) -> Result<ControlResponse> {
        self.request(PowerAction::Status).await
    }
}

fn transport_error(url: &str, err: &reqwest::Error) -> ControlError {
    if err.is_timeout() {
        ControlError::Timeout(REQUEST_TIMEOUT)
    } else if err.is_connect() {
        ControlError::ConnectionFailed(format!(
            "could not reach {url}, connection refused or host unreachable"
        ))
    } else {
        ControlError::NetworkError(err.to_string())
    }
}

fn status_error(status: StatusCode) -> ControlError {
    let message = match status.as_u16() {
        401 => "authentication failed, check the device username and password".to_string(),
        404 => "control endpoint not found on the device, check the configured paths".to_string(),
        code => format!("device answered with HTTP {code}"),
    };
    ControlError::HttpStatus {
        status: status.as_u16(),
        message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glowworm_common::{DeviceKind, HttpAuth, HttpUrls};

    fn http_device(host_with_port: &str) -> Device {
        let (ip, port) = host_with_port
            .split_once(':')
            .expect("mockito address always has a port");
        Device::new("web-01", "Web projector", ip, DeviceKind::Http)
            .with_port(port.parse().expect("valid port"))
    }

    #[tokio::test]
    async fn test_power_on_hits_default_path() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/power/on")
            .with_status(200)
            .with_body("OK")
            .create_async()
            .await;

        let device = http_device(&server.host_with_port());
        let mut controller = HttpController::new(&device).unwrap();

        let response = controller.power_on().await.unwrap();
        mock.assert_async().await;
        assert_eq!(response.response.as_deref(), Some("OK"));
        assert_eq!(response.http_status, Some(200));
        assert!(response.response_time_ms.is_some());
    }

    #[tokio::test]
    async fn test_custom_paths_override_defaults() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/custom/off")
            .with_status(200)
            .with_body("standby")
            .create_async()
            .await;

        let device = http_device(&server.host_with_port()).with_http_urls(HttpUrls {
            power_off: Some("/custom/off".to_string()),
            ..Default::default()
        });
        let mut controller = HttpController::new(&device).unwrap();

        let response = controller.power_off().await.unwrap();
        mock.assert_async().await;
        assert_eq!(response.response.as_deref(), Some("standby"));
    }

    #[tokio::test]
    async fn test_basic_auth_header_is_sent() {
        let mut server = mockito::Server::new_async().await;
        // base64("admin:secret")
        let mock = server
            .mock("GET", "/api/status")
            .match_header("authorization", "Basic YWRtaW46c2VjcmV0")
            .with_status(200)
            .with_body("on")
            .create_async()
            .await;

        let device = http_device(&server.host_with_port()).with_http_auth(HttpAuth {
            username: Some("admin".to_string()),
            password: Some("secret".to_string()),
        });
        let mut controller = HttpController::new(&device).unwrap();

        controller.status().await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_401_maps_to_auth_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/power/on")
            .with_status(401)
            .create_async()
            .await;

        let device = http_device(&server.host_with_port());
        let mut controller = HttpController::new(&device).unwrap();

        let err = controller.power_on().await.unwrap_err();
        assert!(err.to_string().contains("authentication failed"));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_404_maps_to_endpoint_message() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/api/power/off")
            .with_status(404)
            .create_async()
            .await;

        let device = http_device(&server.host_with_port());
        let mut controller = HttpController::new(&device).unwrap();

        let err = controller.power_off().await.unwrap_err();
        assert!(err.to_string().contains("endpoint not found"));
    }

    #[tokio::test]
    async fn test_connection_refused_maps_to_friendly_error() {
        // Grab a free port, then close the listener behind it.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let device = Device::new("web-02", "Gone", "127.0.0.1", DeviceKind::Http).with_port(port);
        let mut controller = HttpController::new(&device).unwrap();

        let err = controller.status().await.unwrap_err();
        assert!(err.to_string().contains("could not reach"), "got: {err}");
    }
}
