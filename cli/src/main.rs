//! OCPP charge point simulator, CLI runner
//!
//! Starts the charge points listed in the config file, connects them to
//! the Central System and runs until Ctrl+C.
//!
//! ```sh
//! # Run with default config (~/.config/ocpp-simulator/config.toml)
//! ocpp-simulator
//!
//! # Custom config path and Central System URL
//! ocpp-simulator --config ./sim.toml --url ws://localhost:9000/ocpp
//!
//! # Validate config without starting
//! ocpp-simulator --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use ocpp_simulator::config::AppConfig;
use ocpp_simulator::{init_tracing, SimulatorHandle};

/// OCPP 1.6J charge point simulator.
#[derive(Parser, Debug)]
#[command(
    name = "ocpp-simulator",
    version,
    about = "Simulated OCPP 1.6J charge points for testing a Central System",
    long_about = "Simulates charge points that connect to a Central System over \
                  OCPP 1.6J, boot, send heartbeats and run charging sessions \
                  with synthetic meter values.\n\n\
                  Default config: ~/.config/ocpp-simulator/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "OCPP_SIM_CONFIG")]
    config: Option<PathBuf>,

    /// Override the Central System WebSocket URL.
    #[arg(short, long)]
    url: Option<String>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli
        .config
        .unwrap_or_else(ocpp_simulator::default_config_path);

    let (mut config, load_error) = match AppConfig::load(&config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    init_tracing(&config);

    match load_error {
        None => info!("Configuration loaded from {}", config_path.display()),
        Some(e) => {
            error!("Failed to load config from {}: {}", config_path.display(), e);
            if cli.check {
                return Err(e.into());
            }
            error!("Using default configuration.");
        }
    }

    if let Some(url) = cli.url {
        info!("CLI override: url = {}", url);
        config.server.url = url;
    }

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        println!("Configuration is valid");
        println!("   Config file   : {}", config_path.display());
        println!("   Central System: {}", config.server.url);
        println!("   Charge points : {}", config.charge_points.len());
        println!("   Log level     : {}", config.logging.level);
        return Ok(());
    }

    // ── Start simulator ────────────────────────────────────────
    let handle = SimulatorHandle::start(&config).await?;

    info!("Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    handle.shutdown().await;

    Ok(())
}
