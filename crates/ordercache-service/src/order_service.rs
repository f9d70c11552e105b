//! Order query service trait definition.

use crate::cache::CacheStats;
use async_trait::async_trait;
use ordercache_core::{Order, OrderId, OrderResult};
use std::sync::Arc;

/// Read side of the system, used by the HTTP facade.
#[async_trait]
pub trait OrderService: Send + Sync {
    /// Gets an order by its storage id.
    ///
    /// Every failure is a [`ordercache_core::OrderError::NotFound`].
    async fn get_order(&self, id: OrderId) -> OrderResult<Arc<Order>>;

    /// Cache counters for diagnostics.
    fn cache_stats(&self) -> CacheStats;
}
