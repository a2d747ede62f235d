//! CSMS server binary
//!
//! ```sh
//! # Run with default config (~/.config/csms/config.toml)
//! csms
//!
//! # Custom config path and port
//! csms --config /etc/csms/config.toml --port 9100
//!
//! # Validate config without starting
//! csms --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use csms::config::AppConfig;
use csms::server::{init_tracing, ServerHandle, ServerOptions};

/// OCPP 1.6 Central System for EV charging stations.
#[derive(Parser, Debug)]
#[command(name = "csms", version, about = "OCPP 1.6 Central System")]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "OCPP_CONFIG")]
    config: Option<PathBuf>,

    /// Override the WebSocket listen port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // ── Load configuration ─────────────────────────────────────
    let config_path = cli.config.unwrap_or_else(csms::default_config_path);

    let (mut config, load_error) = match AppConfig::load(&config_path) {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    if let Some(ref level) = cli.log_level {
        config.logging.level = level.clone();
    }
    init_tracing(&config);

    match &load_error {
        None => info!("Configuration loaded from {}", config_path.display()),
        Some(e) => {
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
        }
    }

    // ── Apply CLI overrides ────────────────────────────────────
    if let Some(port) = cli.port {
        info!("CLI override: port = {}", port);
        config.server.port = port;
    }
    if let Some(ref level) = cli.log_level {
        info!("CLI override: log_level = {}", level);
    }

    // ── Config validation mode ─────────────────────────────────
    if cli.check {
        if let Some(e) = load_error {
            return Err(e.into());
        }
        println!("Configuration is valid");
        println!("   Config file        : {}", config_path.display());
        println!("   WS address         : {}", config.server.address());
        println!("   Heartbeat interval : {}s", config.ocpp.heartbeat_interval);
        println!("   Price per kWh      : {}", config.tariff.price_per_kwh);
        println!("   Storage            : {}", config.database.describe());
        println!("   Log level          : {}", config.logging.level);
        return Ok(());
    }

    // ── Start server ───────────────────────────────────────────
    let handle = ServerHandle::start(ServerOptions { config }).await?;
    handle.install_signal_handler();

    info!("Press Ctrl+C to shutdown gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(())
}
