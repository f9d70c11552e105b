//! Application builder.
//!
//! Start order: metrics recorder, database pool and migrations, cache (and
//! its resync task), bus subscription and ingestion pipeline, HTTP server.
//! Shutdown runs the other way: the pipeline stops consuming first so no
//! write lands in a closed cache, then the cache loop, then the pool.

use crate::startup::print_startup_info;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use ordercache_config::AppConfig;
use ordercache_core::{OrderError, OrderResult};
use ordercache_ingest::{
    is_terminal, IngestOutcome, IngestionPipeline, NatsOrderSubscriber, PipelineHandle,
};
use ordercache_repository::{create_pool, DatabasePoolInterface, OrderRepository, PgOrderRepository};
use ordercache_rest::{create_router, AppState};
use ordercache_service::{OrderCache, OrderCacheInterface, OrderServiceImpl};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Application builder for constructing the server.
pub struct AppBuilder {
    config: Option<AppConfig>,
}

impl AppBuilder {
    /// Creates a new application builder.
    pub fn new() -> Self {
        Self { config: None }
    }

    /// Sets the configuration.
    #[must_use]
    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Builds and runs the application until a shutdown signal arrives.
    ///
    /// # Errors
    ///
    /// Fails if any component cannot be started. Components already started
    /// are dropped, which stops their background tasks.
    pub async fn run(self) -> OrderResult<()> {
        let config = self.config.unwrap_or_default();

        let metrics_handle = if config.observability.metrics_enabled {
            Some(install_metrics_recorder()?)
        } else {
            None
        };

        let pool = create_pool(&config.database).await?;
        if config.database.run_migrations {
            pool.run_migrations().await?;
        }

        let repository: Arc<dyn OrderRepository> = Arc::new(PgOrderRepository::new(
            Arc::clone(&pool) as Arc<dyn DatabasePoolInterface>,
        ));

        let cache = Arc::new(OrderCache::start(Arc::clone(&repository), config.cache.ttl())?);
        info!(ttl = ?cache.ttl(), resync_every = ?(cache.ttl() / 2), "Order cache ready");
        if config.cache.warm_on_start {
            match cache.resync_now().await {
                Ok(report) => info!(entries = report.entries, skipped = report.skipped, "Cache warmed"),
                Err(e) => warn!(error = %e, "Cache warm-up failed, starting cold"),
            }
        }

        let subscriber = NatsOrderSubscriber::connect(&config.nats).await?;
        let (pipeline, outcomes) = IngestionPipeline::new(
            repository,
            Arc::clone(&cache) as Arc<dyn OrderCacheInterface>,
            config.ingest.outcome_buffer,
        );
        let pipeline = pipeline.spawn(Box::new(subscriber));
        let outcome_task = tokio::spawn(drain_outcomes(outcomes));

        let order_service = Arc::new(OrderServiceImpl::new(
            Arc::clone(&cache) as Arc<dyn OrderCacheInterface>,
        ));
        let mut state = AppState::new(order_service).with_health_check(pool.clone());
        if let Some(handle) = metrics_handle {
            state = state.with_metrics(handle);
        }
        let router = create_router(state, &config.server, &config.observability);

        let addr = config.server.addr();
        let listener = tokio::net::TcpListener::bind(&addr)
            .await
            .map_err(|e| OrderError::Internal(format!("Failed to bind {}: {}", addr, e)))?;

        print_startup_info(&config);
        info!("Starting HTTP server on http://{}", addr);

        let served = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| OrderError::Internal(format!("HTTP server error: {}", e)));

        stop_ingestion(&pipeline, outcome_task, config.server.shutdown_timeout()).await;
        cache.close();
        pool.close().await;

        info!("Server shutdown complete");
        served
    }
}

impl Default for AppBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Installs the global Prometheus recorder and describes every metric.
fn install_metrics_recorder() -> OrderResult<PrometheusHandle> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| OrderError::Internal(format!("Failed to install metrics recorder: {}", e)))?;

    ordercache_service::metrics::register_metrics();
    ordercache_ingest::metrics::register_metrics();

    Ok(handle)
}

/// Stops the pipeline, then waits for the outcome logger to see the end of
/// the stream. Each wait is bounded by `timeout`; a pipeline that overruns is
/// aborted so it cannot hold the outcome sender or a pool connection.
pub async fn stop_ingestion(
    pipeline: &PipelineHandle,
    mut outcome_task: JoinHandle<OutcomeTally>,
    timeout: Duration,
) -> Option<OutcomeTally> {
    info!("Stopping ingestion");
    if !pipeline.close_within(timeout).await {
        warn!(?timeout, "In-flight message abandoned");
    }

    match tokio::time::timeout(timeout, &mut outcome_task).await {
        Ok(Ok(tally)) => Some(tally),
        Ok(Err(e)) => {
            error!(error = %e, "Outcome logger failed");
            None
        }
        Err(_) => {
            warn!(?timeout, "Outcome logger did not finish, aborting");
            outcome_task.abort();
            None
        }
    }
}

/// Tally of ingestion outcomes seen by [`drain_outcomes`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OutcomeTally {
    pub ingested: u64,
    pub rejected: u64,
}

/// Consumes pipeline outcomes until the pipeline drops its sender.
///
/// Per-message logging happens in the pipeline; this keeps totals and
/// flags the end of the subscription.
pub async fn drain_outcomes(mut outcomes: mpsc::Receiver<IngestOutcome>) -> OutcomeTally {
    let mut tally = OutcomeTally::default();

    while let Some(outcome) = outcomes.recv().await {
        match &outcome {
            Ok(_) => tally.ingested += 1,
            Err(e) if is_terminal(&outcome) => {
                error!(error = %e, "Ingestion stopped; HTTP lookups keep serving from cache and store");
            }
            Err(_) => tally.rejected += 1,
        }
    }

    info!(ingested = tally.ingested, rejected = tally.rejected, "Outcome stream closed");
    tally
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            info!("Received terminate signal, initiating graceful shutdown...");
        }
    }
}
