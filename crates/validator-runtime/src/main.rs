//! # NockBridge Validator
//!
//! ## Startup Sequence
//!
//! 1. Initialize telemetry (`NB_LOG_LEVEL`, `NB_LOG_FORMAT`, ...)
//! 2. Load configuration from the TOML file (`--config` or `NB_CONFIG`) and
//!    `NB_*` overrides
//! 3. With `--production`, reject development keys
//! 4. Build and start the runtime
//! 5. Run until Ctrl+C, then shut down gracefully

use std::path::PathBuf;

use anyhow::{Context, Result};
use bridge_telemetry::{init_telemetry, TelemetryConfig};
use clap::Parser;
use tracing::info;
use validator_runtime::{ValidatorConfig, ValidatorRuntime};

/// NockBridge validator node.
#[derive(Parser, Debug)]
#[command(name = "nockbridge-validator")]
#[command(about = "Validator node for the NockBridge cross-chain bridge")]
#[command(version)]
struct Args {
    /// Path to the TOML configuration file (default: `NB_CONFIG`)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Refuse development keys and empty emergency contacts
    #[arg(long)]
    production: bool,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_telemetry(&TelemetryConfig::from_env()).context("Failed to initialize telemetry")?;

    let path = args
        .config
        .or_else(|| std::env::var_os("NB_CONFIG").map(PathBuf::from));
    let config = ValidatorConfig::load(path.as_deref())
        .context("Failed to load validator configuration")?;
    if args.production {
        config
            .validate_for_production()
            .context("Configuration is not fit for production")?;
    }
    if args.check {
        info!("Configuration OK");
        return Ok(());
    }

    let runtime = ValidatorRuntime::new(config).context("Failed to build validator runtime")?;
    runtime.start().await.context("Failed to start validator")?;

    info!("Validator is running. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    runtime.shutdown().await;
    Ok(())
}
