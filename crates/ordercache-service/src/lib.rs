//! # Ordercache Service
//!
//! The in-memory order cache and the query service in front of it.
//!
//! ```text
//! OrderService (HTTP facade)      IngestionPipeline
//!        ↓ get                          ↓ set
//!           Arc<dyn OrderCacheInterface>
//!                 OrderCache ── resync task (every ttl / 2)
//!                     ↓ read-through / resync
//!           Arc<dyn OrderRepository>
//! ```

pub mod cache;
pub mod metrics;
pub mod order_service;
pub mod r#impl;

pub use cache::*;
pub use order_service::*;
pub use r#impl::OrderServiceImpl;
