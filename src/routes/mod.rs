//! HTTP route handlers, one module per path prefix.

pub mod analytics;
pub mod orders;
pub mod products;
