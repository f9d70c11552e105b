//! Read-through, write-through order cache with a periodic full resync.

use super::{CacheStats, OrderCacheInterface, ResyncReport};
use crate::metrics::CacheMetrics;
use async_trait::async_trait;
use ordercache_core::{Order, OrderError, OrderId, OrderResult};
use ordercache_repository::OrderRepository;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

type OrderMap = HashMap<OrderId, Arc<Order>>;

#[derive(Default)]
struct CacheState {
    entries: OrderMap,
    /// Writes made while a resync scan is in flight. `None` when no scan runs.
    pending: Option<OrderMap>,
}

/// Clears the pending-write log if a scan ends without swapping.
struct ScanGuard<'a>(&'a Mutex<CacheState>);

impl Drop for ScanGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().pending = None;
    }
}

/// State shared between the cache handle and its resync task.
struct CacheCore {
    state: Mutex<CacheState>,
    repository: Arc<dyn OrderRepository>,
    /// One resync at a time, whether from the timer or `resync_now`.
    resync_lock: tokio::sync::Mutex<()>,
    hits: AtomicU64,
    misses: AtomicU64,
    resyncs: AtomicU64,
    failed_resyncs: AtomicU64,
}

impl CacheCore {
    fn new(repository: Arc<dyn OrderRepository>) -> Self {
        Self {
            state: Mutex::new(CacheState::default()),
            repository,
            resync_lock: tokio::sync::Mutex::new(()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            resyncs: AtomicU64::new(0),
            failed_resyncs: AtomicU64::new(0),
        }
    }

    async fn get(&self, id: OrderId) -> OrderResult<Arc<Order>> {
        let cached = self.state.lock().entries.get(&id).cloned();
        if let Some(order) = cached {
            self.hits.fetch_add(1, Ordering::Relaxed);
            CacheMetrics::hit();
            return Ok(order);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        debug!(order_id = %id, "Cache miss, reading through");

        match self.repository.find_by_id(id).await {
            Ok(Some(order)) => {
                CacheMetrics::miss("loaded");
                Ok(self.insert_read_through(id, order))
            }
            Ok(None) => {
                CacheMetrics::miss("absent");
                Err(OrderError::order_not_found(id))
            }
            Err(e) => {
                CacheMetrics::miss("error");
                warn!(order_id = %id, error = %e, "Read-through failed");
                Err(OrderError::order_not_found(id))
            }
        }
    }

    /// Inserts a value read from the store unless another write got there
    /// first, and returns whatever is cached afterwards.
    fn insert_read_through(&self, id: OrderId, order: Order) -> Arc<Order> {
        let mut state = self.state.lock();
        let CacheState { entries, pending } = &mut *state;

        let cached = Arc::clone(entries.entry(id).or_insert_with(|| Arc::new(order)));
        if let Some(pending) = pending {
            pending.entry(id).or_insert_with(|| Arc::clone(&cached));
        }
        CacheMetrics::entries(entries.len());
        cached
    }

    fn set(&self, id: OrderId, order: Order) {
        let order = Arc::new(order);
        let len = {
            let mut state = self.state.lock();
            if let Some(pending) = state.pending.as_mut() {
                pending.insert(id, Arc::clone(&order));
            }
            state.entries.insert(id, order);
            state.entries.len()
        };
        CacheMetrics::entries(len);
        debug!(order_id = %id, "Cache entry written");
    }

    /// Builds a fresh map from the store and swaps it in.
    ///
    /// Readers keep seeing the previous map until the swap.
    async fn resync(&self) -> OrderResult<ResyncReport> {
        let _serial = self.resync_lock.lock().await;
        let started = std::time::Instant::now();

        self.state.lock().pending = Some(OrderMap::new());
        let scan = ScanGuard(&self.state);

        let ids = match self.repository.list_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                self.failed_resyncs.fetch_add(1, Ordering::Relaxed);
                CacheMetrics::resync_failed(started.elapsed());
                return Err(OrderError::ResyncEnumeration(e.to_string()));
            }
        };

        let mut fresh = OrderMap::with_capacity(ids.len());
        let mut skipped = 0;
        for id in ids {
            match self.repository.find_by_id(id).await {
                Ok(Some(order)) => {
                    fresh.insert(id, Arc::new(order));
                }
                Ok(None) => {
                    debug!(order_id = %id, "Order vanished during resync");
                    skipped += 1;
                }
                Err(e) => {
                    let err = OrderError::ResyncRow { id, message: e.to_string() };
                    warn!(error = %err, "Skipping order during resync");
                    skipped += 1;
                }
            }
        }
        let loaded = fresh.len();

        let (reapplied, entries) = {
            let mut state = self.state.lock();
            let pending = state.pending.take().unwrap_or_default();
            let reapplied = pending.len();
            fresh.extend(pending);
            state.entries = fresh;
            (reapplied, state.entries.len())
        };
        drop(scan);

        self.resyncs.fetch_add(1, Ordering::Relaxed);
        CacheMetrics::entries(entries);
        CacheMetrics::resync_completed(skipped, started.elapsed());

        let report = ResyncReport {
            loaded,
            skipped,
            reapplied,
            entries,
        };
        debug!(?report, "Cache resync completed");
        Ok(report)
    }

    fn len(&self) -> usize {
        self.state.lock().entries.len()
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            resyncs: self.resyncs.load(Ordering::Relaxed),
            failed_resyncs: self.failed_resyncs.load(Ordering::Relaxed),
        }
    }
}

async fn resync_loop(core: Arc<CacheCore>, period: Duration, mut shutdown_rx: broadcast::Receiver<()>) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("Resync loop stopped");
                break;
            }

            _ = ticker.tick() => {
                if let Err(e) = core.resync().await {
                    error!(error = %e, "Resync cycle dropped, keeping previous contents");
                }
            }
        }
    }
}

/// In-memory `OrderId → Order` map backed by an [`OrderRepository`].
///
/// The map is never locked across a store call. The resync task stops on
/// [`close`](Self::close) or when the cache is dropped.
pub struct OrderCache {
    core: Arc<CacheCore>,
    ttl: Duration,
    shutdown_tx: broadcast::Sender<()>,
    closed: AtomicBool,
}

impl OrderCache {
    /// Creates an empty cache and spawns its resync task on the current
    /// Tokio runtime. The first resync runs one period (`ttl / 2`) from now.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Configuration`] if `ttl / 2` is zero and
    /// [`OrderError::Internal`] outside a Tokio runtime.
    pub fn start(repository: Arc<dyn OrderRepository>, ttl: Duration) -> OrderResult<Self> {
        let period = ttl / 2;
        if period.is_zero() {
            return Err(OrderError::Configuration(format!(
                "Cache ttl {:?} leaves no resync period",
                ttl
            )));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| OrderError::internal(format!("Order cache needs a Tokio runtime: {}", e)))?;

        let core = Arc::new(CacheCore::new(repository));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        runtime.spawn(resync_loop(Arc::clone(&core), period, shutdown_rx));

        info!(?ttl, ?period, "Order cache started");
        Ok(Self {
            core,
            ttl,
            shutdown_tx,
            closed: AtomicBool::new(false),
        })
    }

    /// Configured TTL.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Stops the resync task. A cycle already running finishes first.
    ///
    /// Calling this more than once has no further effect.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        // No receiver means the task already exited.
        let _ = self.shutdown_tx.send(());
        info!("Order cache closed");
    }

    /// Returns true once [`close`](Self::close) has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

impl std::fmt::Debug for OrderCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderCache")
            .field("ttl", &self.ttl)
            .field("entries", &self.core.len())
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[async_trait]
impl OrderCacheInterface for OrderCache {
    async fn get(&self, id: OrderId) -> OrderResult<Arc<Order>> {
        self.core.get(id).await
    }

    fn set(&self, id: OrderId, order: Order) {
        self.core.set(id, order);
    }

    async fn resync_now(&self) -> OrderResult<ResyncReport> {
        self.core.resync().await
    }

    fn len(&self) -> usize {
        self.core.len()
    }

    fn stats(&self) -> CacheStats {
        self.core.stats()
    }
}
