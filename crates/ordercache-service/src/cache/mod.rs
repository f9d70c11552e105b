//! In-memory order cache.
//!
//! Every stored order is kept in memory, keyed by its storage id. Reads fall
//! through to the store on a miss, ingestion writes through, and a background
//! task rebuilds the whole map every `ttl / 2`.

mod cache_interface;
mod order_cache;

pub use cache_interface::{CacheStats, OrderCacheInterface, ResyncReport};
pub use order_cache::OrderCache;
