//! Order service implementation.

use crate::cache::{CacheStats, OrderCacheInterface};
use crate::order_service::OrderService;
use async_trait::async_trait;
use ordercache_core::{Order, OrderId, OrderResult};
use std::sync::Arc;
use tracing::debug;

/// Order service backed by the order cache.
pub struct OrderServiceImpl {
    cache: Arc<dyn OrderCacheInterface>,
}

impl OrderServiceImpl {
    /// Creates a new order service.
    #[must_use]
    pub fn new(cache: Arc<dyn OrderCacheInterface>) -> Self {
        Self { cache }
    }
}

#[async_trait]
impl OrderService for OrderServiceImpl {
    async fn get_order(&self, id: OrderId) -> OrderResult<Arc<Order>> {
        debug!("Getting order: {}", id);
        self.cache.get(id).await
    }

    fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
