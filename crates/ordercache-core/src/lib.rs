//! # Ordercache Core
//!
//! Core types, traits, and error definitions for ordercache.
//! Every other crate in the workspace builds on the order aggregate,
//! the storage id, and the error taxonomy defined here.

pub mod domain;
pub mod error;
pub mod id;
pub mod result;
pub mod telemetry;
pub mod traits;

pub use domain::*;
pub use error::*;
pub use id::*;
pub use result::*;
pub use traits::*;
