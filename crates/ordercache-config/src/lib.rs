//! # Ordercache Config
//!
//! Layered configuration for ordercache: TOML files, a `.env` file, and
//! `ORDERCACHE__*` environment variables, validated before startup.

mod app_config;
mod loader;
mod validation;

pub use app_config::*;
pub use loader::*;
pub use validation::*;
