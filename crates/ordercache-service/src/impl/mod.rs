//! Service implementations.

mod order_service_impl;

pub use order_service_impl::OrderServiceImpl;
