//! # Ordercache REST
//!
//! HTTP facade over the order cache using Axum.
//! Serves `GET /orders/{id}`, health probes, metrics, and the OpenAPI document.

pub mod controllers;
pub mod middleware;
pub mod openapi;
pub mod responses;
pub mod router;
pub mod state;

pub use router::*;
pub use state::*;
