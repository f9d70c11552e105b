//! # Ordercache Ingest
//!
//! Consumes order events from a message bus, persists them, and writes them
//! through to the order cache.
//!
//! ```text
//! OrderSubscriber ─ payload ─▶ IngestionPipeline
//!                                 1. decode
//!                                 2. OrderRepository::save  → OrderId
//!                                 3. OrderCacheInterface::set
//!                                 4. outcome channel
//! ```

pub mod bus;
pub mod metrics;
pub mod outcome;
pub mod pipeline;

pub use bus::*;
pub use outcome::*;
pub use pipeline::*;
