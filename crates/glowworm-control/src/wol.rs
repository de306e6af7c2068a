//! Wake-on-LAN implementation
//!
//! Wake-on-LAN powers on a machine by broadcasting a "magic packet" UDP
//! datagram that the target NIC recognizes even while the host is off.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;
use tracing::debug;

use crate::error::{ControlError, Result};

/// Default WoL destination port
pub const DEFAULT_WOL_PORT: u16 = 9;

/// A parsed hardware (MAC) address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacAddr([u8; 6]);

impl MacAddr {
    /// Parse from a string with `:` or `-` separators, or none at all.
    ///
    /// `AA:BB:CC:DD:EE:FF`, `aa-bb-cc-dd-ee-ff` and `aabbccddeeff` are all
    /// accepted; anything that does not reduce to 12 hex digits is not.
    pub fn parse(mac: &str) -> Result<Self> {
        let cleaned: String = mac.chars().filter(|c| *c != ':' && *c != '-').collect();
        if cleaned.len() != 12 || !cleaned.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(ControlError::InvalidConfig(format!(
                "invalid MAC address: {mac}"
            )));
        }

        let mut bytes = [0u8; 6];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&cleaned[i * 2..i * 2 + 2], 16)
                .map_err(|_| ControlError::InvalidConfig(format!("invalid MAC address: {mac}")))?;
        }
        Ok(Self(bytes))
    }

    /// The six raw address bytes
    pub fn bytes(&self) -> &[u8; 6] {
        &self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

/// Build the magic packet for a target MAC.
///
/// Magic packet format:
/// - 6 bytes of 0xFF
/// - Target MAC repeated 16 times (96 bytes)
/// - Total: 102 bytes
pub fn build_magic_packet(mac: MacAddr) -> [u8; 102] {
    let mut packet = [0u8; 102];

    for byte in packet.iter_mut().take(6) {
        *byte = 0xFF;
    }

    for i in 0..16 {
        let offset = 6 + (i * 6);
        packet[offset..offset + 6].copy_from_slice(mac.bytes());
    }

    packet
}

/// Broadcast a magic packet for `mac` to `broadcast:port`.
pub async fn send_magic_packet(mac: MacAddr, broadcast: IpAddr, port: u16) -> Result<()> {
    let packet = build_magic_packet(mac);

    let socket = UdpSocket::bind("0.0.0.0:0")
        .await
        .map_err(|e| ControlError::NetworkError(e.to_string()))?;

    socket
        .set_broadcast(true)
        .map_err(|e| ControlError::NetworkError(e.to_string()))?;

    let target = SocketAddr::new(broadcast, port);
    debug!(mac = %mac, target = %target, "sending magic packet");

    socket
        .send_to(&packet, target)
        .await
        .map_err(|e| ControlError::NetworkError(e.to_string()))?;

    Ok(())
}

/// Parse a configured broadcast address, defaulting to the limited
/// broadcast address `255.255.255.255`.
pub fn parse_broadcast(addr: Option<&str>) -> Result<IpAddr> {
    match addr {
        Some(addr) => addr.parse().map_err(|_| {
            ControlError::InvalidConfig(format!("invalid broadcast address: {addr}"))
        }),
        None => Ok(IpAddr::V4(Ipv4Addr::BROADCAST)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_colon_separated() {
        let mac = MacAddr::parse("aa:bb:cc:dd:ee:ff").unwrap();
        assert_eq!(mac.bytes(), &[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
    }

    #[test]
    fn test_parse_dash_separated_and_bare() {
        let dashed = MacAddr::parse("AA-BB-CC-DD-EE-FF").unwrap();
        let bare = MacAddr::parse("aabbccddeeff").unwrap();
        assert_eq!(dashed, bare);
    }

    #[test]
    fn test_parse_invalid_mac() {
        assert!(MacAddr::parse("invalid").is_err());
        assert!(MacAddr::parse("aa:bb:cc").is_err());
        assert!(MacAddr::parse("aa:bb:cc:dd:ee:gg").is_err());
        assert!(MacAddr::parse("").is_err());
    }

    #[test]
    fn test_display_is_lowercase_colon_form() {
        let mac = MacAddr::parse("AA-BB-CC-DD-EE-FF").unwrap();
        assert_eq!(mac.to_string(), "aa:bb:cc:dd:ee:ff");
    }

    #[test]
    fn test_magic_packet_format() {
        let mac = MacAddr::parse("11:22:33:44:55:66").unwrap();
        let packet = build_magic_packet(mac);

        // Check length
        assert_eq!(packet.len(), 102);

        // Check first 6 bytes are 0xFF
        assert_eq!(&packet[0..6], &[0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);

        // Check MAC is repeated 16 times
        let bytes = [0x11, 0x22, 0x33, 0x44, 0x55, 0x66];
        for i in 0..16 {
            let offset = 6 + (i * 6);
            assert_eq!(&packet[offset..offset + 6], &bytes);
        }
    }

    #[test]
    fn test_broadcast_defaults_to_limited_broadcast() {
        let addr = parse_broadcast(None).unwrap();
        assert_eq!(addr, IpAddr::V4(Ipv4Addr::new(255, 255, 255, 255)));
    }

    #[test]
    fn test_broadcast_parses_configured_address() {
        let addr = parse_broadcast(Some("192.168.1.255")).unwrap();
        assert_eq!(addr, IpAddr::V4(Ipv4Addr::new(192, 168, 1, 255)));
        assert!(parse_broadcast(Some("not-an-address")).is_err());
    }

    #[tokio::test]
    async fn test_send_magic_packet_to_local_receiver() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let port = receiver.local_addr().unwrap().port();

        let mac = MacAddr::parse("aa:bb:cc:dd:ee:ff").unwrap();
        send_magic_packet(mac, "127.0.0.1".parse().unwrap(), port)
            .await
            .unwrap();

        let mut buf = [0u8; 256];
        let (len, _) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(len, 102);
        assert_eq!(&buf[0..6], &[0xFF; 6]);
        assert_eq!(&buf[6..12], mac.bytes());
    }
}
