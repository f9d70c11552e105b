//! Publishes an order file to the configured subject.
//!
//! ```text
//! ordercache-publish [path/to/order.json]
//! ```
//!
//! Defaults to `demos/model.json`. Bus settings come from the same
//! configuration files and `ORDERCACHE__NATS__*` variables as the server.

use ordercache_config::ConfigLoader;
use ordercache_core::telemetry::{init_logging, TelemetryConfig};
use ordercache_core::{Order, OrderError, OrderResult};
use ordercache_ingest::NatsOrderPublisher;
use std::path::PathBuf;
use tracing::{error, info};

const DEFAULT_ORDER_FILE: &str = "demos/model.json";

#[tokio::main]
async fn main() {
    if let Err(e) = init_logging(&TelemetryConfig::default()) {
        eprintln!("{}", e);
    }

    if let Err(e) = run().await {
        error!("Publish failed: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> OrderResult<()> {
    let path = std::env::args()
        .nth(1)
        .map_or_else(|| PathBuf::from(DEFAULT_ORDER_FILE), PathBuf::from);

    let payload = tokio::fs::read(&path)
        .await
        .map_err(|e| OrderError::validation(format!("Cannot read {}: {}", path.display(), e)))?;
    let order = Order::decode(&payload)?;

    let config = ConfigLoader::from_default_location().load()?;
    let publisher = NatsOrderPublisher::connect(&config.nats).await?;
    publisher.publish(&order).await?;

    info!(
        order_uid = %order.order_uid,
        subject = %publisher.subject(),
        "Order published"
    );
    Ok(())
}
