//! # Ordercache Server Library
//!
//! Process wiring for the order cache: store, cache, ingestion, and the
//! HTTP facade, started and stopped in dependency order.

pub mod app;
pub mod startup;
