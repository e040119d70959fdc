//! `seatswap` service entry point.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use seatswap_engine::Runtime;
use seatswap_settings::{SeatswapSettings, load_settings, load_settings_from_path};
use seatswap_telemetry::{TelemetryConfig, init_telemetry};

/// Mid-session player substitution service.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Settings file (defaults to `~/.seatswap/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Override the configured log filter.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let settings: SeatswapSettings = match &cli.settings {
        Some(path) => load_settings_from_path(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => load_settings().context("failed to load settings")?,
    };

    let mut telemetry = TelemetryConfig::from(&settings.logging);
    if let Some(level) = cli.log_level {
        telemetry.level = level;
    }
    init_telemetry(&telemetry);

    let runtime = Runtime::start(&settings).context("failed to start replacement service")?;
    tracing::info!("seatswap ready");

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl+c")?;

    tracing::info!("shutting down");
    runtime.shutdown().await;
    Ok(())
}
