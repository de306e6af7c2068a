//! Wake-on-LAN command
//!
//! Sends a magic packet directly to a MAC address, without going through
//! the inventory. Useful for machines that are not registered yet.

use clap::Args;
use color_eyre::eyre::Result;
use glowworm_control::wol::{self, MacAddr};
use tracing::info;

#[derive(Args, Debug)]
pub struct WakeArgs {
    /// Hardware (MAC) address to wake, e.g. aa:bb:cc:dd:ee:ff
    pub mac: String,

    /// Broadcast address to send the magic packet to
    #[arg(long)]
    pub broadcast: Option<String>,

    /// UDP destination port
    #[arg(long, default_value_t = wol::DEFAULT_WOL_PORT)]
    pub port: u16,
}

/// Send one magic packet for the given MAC.
pub async fn run_wake(args: WakeArgs, json: bool) -> Result<()> {
    let mac = MacAddr::parse(&args.mac)?;
    let broadcast = wol::parse_broadcast(args.broadcast.as_deref())?;

    wol::send_magic_packet(mac, broadcast, args.port).await?;
    info!(mac = %mac, broadcast = %broadcast, port = args.port, "Magic packet sent");

    if json {
        println!(
            "{}",
            serde_json::json!({
                "mac": mac.to_string(),
                "broadcast": broadcast.to_string(),
                "port": args.port,
                "sent": true,
            })
        );
    } else {
        println!("Magic packet sent to {} via {}:{}", mac, broadcast, args.port);
    }
    Ok(())
}
