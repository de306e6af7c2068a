// Command-line entry point
use std::io::stderr;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use color_eyre::eyre::Result;
use glowworm_control::PowerAction;
use tracing_subscriber::{fmt, prelude::*, registry, EnvFilter};

mod cmd;
mod inventory;

use cmd::control::ControlArgs;
use cmd::wake::WakeArgs;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Network power control for projectors and PCs",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output - shows more detailed logs
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    /// Path to the device inventory file
    #[arg(long, global = true, default_value = "devices.json")]
    inventory: PathBuf,

    /// Emit machine-readable JSON on stdout
    #[arg(long, global = true, default_value_t = false)]
    json: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Lists the devices in the inventory.
    List,
    /// Powers on the named devices.
    PowerOn(ControlArgs),
    /// Powers off the named devices.
    PowerOff(ControlArgs),
    /// Queries the power status of the named devices.
    Status(ControlArgs),
    /// Sends a Wake-on-LAN magic packet to a MAC address.
    Wake(WakeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();

    // Respect RUST_LOG, fall back to per-crate defaults. Logs go to
    // stderr so stdout stays clean for JSON output.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let default_directives = format!(
        "glowworm={level},glowworm_common={level},glowworm_control={level},glowworm_batch={level},hyper=warn,reqwest=warn,mio=warn",
        level = default_level
    );
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives));
    registry()
        .with(filter)
        .with(fmt::layer().with_writer(stderr))
        .init();

    match cli.command {
        Commands::List => cmd::list::run_list(&cli.inventory, cli.json)?,
        Commands::PowerOn(args) => {
            run_control_command(&cli.inventory, PowerAction::PowerOn, args, cli.json).await?
        }
        Commands::PowerOff(args) => {
            run_control_command(&cli.inventory, PowerAction::PowerOff, args, cli.json).await?
        }
        Commands::Status(args) => {
            run_control_command(&cli.inventory, PowerAction::Status, args, cli.json).await?
        }
        Commands::Wake(args) => cmd::wake::run_wake(args, cli.json).await?,
    }

    Ok(())
}

/// Run one batch action, exiting non-zero when any device failed.
async fn run_control_command(
    inventory: &Path,
    action: PowerAction,
    args: ControlArgs,
    json: bool,
) -> Result<()> {
    let outcome = cmd::control::run_control(inventory, action, args, json).await?;
    if outcome.summary.failed > 0 {
        std::process::exit(1);
    }
    Ok(())
}
