pub mod models;

pub use models::{Device, DeviceKind, HttpAuth, HttpUrls, PcConfig, TcpCommands};
