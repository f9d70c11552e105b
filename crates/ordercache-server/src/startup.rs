//! Server startup utilities.

use ordercache_config::AppConfig;
use tracing::info;

/// Prints the startup banner.
pub fn print_banner() {
    info!(r#"
                 __                              __
  ____  _________/ /__  ______________ ______/ /_  ___
 / __ \/ ___/ __  / _ \/ ___/ ___/ __ `/ ___/ __ \/ _ \
/ /_/ / /  / /_/ /  __/ /  / /__/ /_/ / /__/ / / /  __/
\____/_/   \__,_/\___/_/   \___/\__,_/\___/_/ /_/\___/
    "#);
}

/// Prints server startup information.
pub fn print_startup_info(config: &AppConfig) {
    let separator = "=".repeat(60);
    let addr = config.server.addr();
    info!("{}", separator);
    info!("Orders:    http://{}/orders/{{id}}", addr);
    info!("Health:    http://{}/health", addr);
    if config.server.swagger_enabled {
        info!("API Docs:  http://{}/swagger-ui", addr);
    }
    if config.observability.metrics_enabled {
        info!("Metrics:   http://{}{}", addr, config.observability.metrics_path);
    }
    info!("Bus:       {} (subject '{}')", config.nats.url, config.nats.subject);
    info!("Cache TTL: {:?} (resync every {:?})", config.cache.ttl(), config.cache.resync_period());
    info!("{}", separator);
}
