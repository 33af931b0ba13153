//! `amora-bridge` binary entry point.
//!
//! Loads config, builds the player backend, and runs the bridge until a
//! shutdown signal arrives. The real player capability (C4) is a
//! consumed interface outside this crate's scope (§4.4); `--mock` is the
//! only backend this binary ships, matching the teacher's `--mock`-style
//! demo mode for running the server without real hardware.

use std::path::PathBuf;
use std::sync::Arc;

use amora_bridge::{bootstrap_bridge, BridgeConfig};
use amora_core::player::Player;
use amora_core::runtime::{TaskSpawner, TokioSpawner};
use amora_mock_player::MockPlayer;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(
    name = "amora-bridge",
    version,
    about = "Bridges a local music daemon onto a pub/sub messaging fabric"
)]
struct Args {
    /// Path to a YAML bridge configuration file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run against the in-memory mock player instead of a real daemon.
    #[arg(long)]
    mock: bool,

    /// Override the broker URL from the config file.
    #[arg(long)]
    broker_url: Option<String>,

    /// Override the device ID from the config file.
    #[arg(long)]
    device_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env().init();

    let args = Args::parse();
    let mut config = BridgeConfig::load(args.config.as_deref())?;
    if let Some(broker_url) = args.broker_url {
        config.broker_url = broker_url;
    }
    if let Some(device_id) = args.device_id {
        config.device_id = device_id;
    }

    if !args.mock {
        log::error!(
            "no non-mock player backend is built into this binary; pass --mock, or wire a real \
             Player implementation through amora_bridge::bootstrap_bridge directly"
        );
        return Err("missing player backend".into());
    }

    let player: Arc<dyn Player> = Arc::new(MockPlayer::new());
    let spawner: Arc<dyn TaskSpawner> = Arc::new(TokioSpawner);

    log::info!(
        "starting amora-bridge for device '{}' on {}",
        config.device_id,
        config.broker_url
    );
    let handle = bootstrap_bridge(config, player, spawner).await?;

    tokio::signal::ctrl_c().await?;
    log::info!("shutdown signal received, stopping");
    handle.shutdown().await;

    Ok(())
}
