//! # Ordercache Repository
//!
//! Durable storage for order aggregates.
//!
//! ```text
//! OrderCache / IngestionPipeline
//!   ↓  Arc<dyn OrderRepository>
//! PgOrderRepository
//!   ↓  Arc<dyn DatabasePoolInterface>
//! PostgreSQL
//! ```

pub mod pool;
pub mod postgres;
pub mod traits;

pub use pool::*;
pub use postgres::*;
pub use traits::*;
