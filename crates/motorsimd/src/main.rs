//! motorsim driver daemon (motorsimd)

use std::process;

use tracing::{error, info, warn};

mod commands;
mod config;
mod daemon;

use config::DaemonConfig;

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("motorsimd=debug,info")
        .init();

    info!("Starting motorsim driver v{}", env!("CARGO_PKG_VERSION"));

    let config = DaemonConfig::load().unwrap_or_else(|e| {
        warn!("Failed to load config, using defaults: {e:#}");
        DaemonConfig::default()
    });

    if let Err(e) = daemon::run(&config) {
        error!("Driver error: {e:#}");
        process::exit(1);
    }

    info!("Driver stopped");
}
