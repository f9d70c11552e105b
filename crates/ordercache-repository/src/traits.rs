//! Repository trait definitions.

use async_trait::async_trait;
use ordercache_core::{Order, OrderId, OrderResult};

/// Order store used by the cache and the ingestion pipeline.
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Persists the whole aggregate atomically and returns the id the store
    /// assigned to it.
    ///
    /// On error nothing from the aggregate is left behind.
    async fn save(&self, order: &Order) -> OrderResult<OrderId>;

    /// Loads a full aggregate. `None` when the id is unknown.
    async fn find_by_id(&self, id: OrderId) -> OrderResult<Option<Order>>;

    /// Lists every stored order id in ascending order.
    async fn list_ids(&self) -> OrderResult<Vec<OrderId>>;
}
