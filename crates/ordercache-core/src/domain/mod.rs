//! Order aggregate and its owned sub-records.

pub mod order;

pub use order::*;
