//! # Ordercache Server
//!
//! Consumes order events from NATS, persists them to PostgreSQL, and serves
//! them over HTTP from an in-memory cache.

use ordercache_config::ConfigLoader;
use ordercache_core::telemetry::{init_telemetry, shutdown_telemetry};
use ordercache_server::{app::AppBuilder, startup::print_banner};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config = match ConfigLoader::from_default_location().load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    };

    let telemetry = config.observability.telemetry_config(&config.app.name);
    if let Err(e) = init_telemetry(&telemetry) {
        eprintln!("{}", e);
        std::process::exit(1);
    }

    print_banner();
    info!("Starting ordercache...");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Environment: {}", config.app.environment);

    let result = AppBuilder::new().with_config(config).run().await;
    shutdown_telemetry();

    if let Err(e) = result {
        error!("Application error: {}", e);
        std::process::exit(1);
    }
}
