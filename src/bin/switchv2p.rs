//! SwitchV2P daemon binary
//!
//! Loads configuration, starts one software switch and runs it until
//! interrupted.

use clap::Parser;
use std::path::PathBuf;
use switchv2p::{Config, Switch};
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, EnvFilter};

/// SwitchV2P software switch daemon
#[derive(Parser, Debug)]
#[command(name = "switchv2p", version, about)]
struct Args {
    /// Path to configuration file (overrides default search paths)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // Initialize logging
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .init();

    let args = Args::parse();

    info!("SwitchV2P starting");

    let (config, loaded_paths) = if let Some(config_path) = &args.config {
        // Explicit config file specified - load only that file
        match Config::load_file(config_path) {
            Ok(config) => (config, vec![config_path.clone()]),
            Err(e) => {
                error!("Failed to load configuration from {}: {}", config_path.display(), e);
                std::process::exit(1);
            }
        }
    } else {
        match Config::load() {
            Ok(result) => result,
            Err(e) => {
                error!("Failed to load configuration: {}", e);
                std::process::exit(1);
            }
        }
    };

    if loaded_paths.is_empty() {
        info!("No config files found, using defaults");
    } else {
        for path in &loaded_paths {
            info!(path = %path.display(), "Loaded config file");
        }
    }

    if config.ports.is_empty() {
        warn!("No ports configured, the switch will not forward anything");
    }

    let mut switch = match Switch::new(config) {
        Ok(switch) => switch,
        Err(e) => {
            error!("Failed to create switch: {}", e);
            std::process::exit(1);
        }
    };

    let policy = switch.engine().policy();
    info!(
        switch = %switch.identity(),
        capacity = switch.engine().cache().capacity(),
        gateways = switch.engine().gateways().len(),
        retransmit_timeout_ms = switch.engine().retransmit_timeout().as_millis() as u64,
        "Switch created"
    );
    info!(
        source_learning = policy.source_learning,
        destination_learning = policy.destination_learning,
        access_bit_protection = policy.access_bit_protection,
        spillover = policy.spillover,
        misdelivery_detection = policy.misdelivery_detection,
        "Role policy"
    );

    if let Err(e) = switch.start().await {
        error!("Failed to start switch: {}", e);
        std::process::exit(1);
    }

    info!("SwitchV2P running, press Ctrl+C to exit");

    tokio::select! {
        result = switch.run_rx_loop() => {
            if let Err(e) = result {
                error!("RX loop failed: {}", e);
            }
        }
        signal = tokio::signal::ctrl_c() => match signal {
            Ok(()) => info!("Shutdown signal received"),
            Err(e) => error!("Failed to listen for shutdown signal: {}", e),
        },
    }

    info!("SwitchV2P shutting down");

    if let Err(e) = switch.stop().await {
        warn!("Error during shutdown: {}", e);
    }

    info!("SwitchV2P shutdown complete");
}
