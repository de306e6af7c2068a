//! Glowworm device control
//!
//! This crate provides the per-protocol controllers used to power devices
//! on and off and to probe their status.
//!
//! # Supported Protocols
//!
//! - **TCP**: line-oriented socket commands ("PWR ON" style), with response
//!   validation
//! - **HTTP**: GET endpoints with optional basic auth
//! - **PC**: Wake-on-LAN power-on, wmic/ssh remote shutdown, ping and port
//!   probing for status
//!
//! # Example
//!
//! ```
//! use glowworm_common::{Device, DeviceKind};
//! use glowworm_control::controller_for;
//!
//! let device = Device::new("pj-01", "Hall projector", "192.168.1.50", DeviceKind::Tcp);
//! let controller = controller_for(&device).expect("tcp is a supported kind");
//! ```
//!
//! # Wake-on-LAN Example
//!
//! ```
//! use glowworm_control::wol::{build_magic_packet, MacAddr};
//!
//! # fn example() -> glowworm_control::Result<()> {
//! let mac = MacAddr::parse("aa:bb:cc:dd:ee:ff")?;
//! let packet = build_magic_packet(mac);
//! assert_eq!(packet.len(), 102);
//! # Ok(())
//! # }
//! ```

pub mod controller;
pub mod error;
pub mod http;
pub mod pc;
pub mod tcp;
pub mod types;
pub mod validate;
pub mod wol;

pub use controller::{controller_for, DeviceController};
pub use error::{ControlError, Result};
pub use http::HttpController;
pub use pc::PcController;
pub use tcp::TcpController;
pub use types::{ControlResponse, ControlResult, PowerAction, PowerStatus};
pub use wol::MacAddr;
