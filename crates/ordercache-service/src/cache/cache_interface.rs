//! Cache interface trait shared by the query service and the ingestion pipeline.

use async_trait::async_trait;
use ordercache_core::{Order, OrderId, OrderResult};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

/// Order cache operations.
#[async_trait]
pub trait OrderCacheInterface: Send + Sync {
    /// Returns the cached order, reading it through from the store on a miss.
    ///
    /// Any miss that the store cannot satisfy is reported as
    /// [`ordercache_core::OrderError::NotFound`]; the map is left untouched.
    async fn get(&self, id: OrderId) -> OrderResult<Arc<Order>>;

    /// Inserts or replaces the entry for `id`.
    fn set(&self, id: OrderId, order: Order);

    /// Rebuilds the map from the store once, outside the timer.
    async fn resync_now(&self) -> OrderResult<ResyncReport>;

    /// Number of cached orders.
    fn len(&self) -> usize;

    /// Returns true if nothing is cached.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Counters since construction.
    fn stats(&self) -> CacheStats;
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, ToSchema)]
pub struct CacheStats {
    /// Cached orders.
    pub entries: usize,
    /// Lookups served from memory.
    pub hits: u64,
    /// Lookups that went to the store.
    pub misses: u64,
    /// Completed resync cycles.
    pub resyncs: u64,
    /// Resync cycles dropped because ids could not be listed.
    pub failed_resyncs: u64,
}

/// Result of one completed resync cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResyncReport {
    /// Orders loaded from the store.
    pub loaded: usize,
    /// Ids skipped because their fetch failed or came back empty.
    pub skipped: usize,
    /// Writes made during the scan and re-applied after the swap.
    pub reapplied: usize,
    /// Map size after the swap.
    pub entries: usize,
}
