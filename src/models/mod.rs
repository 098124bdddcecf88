//! Persistence records and their database operations.

pub mod order;
pub mod order_product;
pub mod product;

pub use order::{CostLine, CostSummary, NewOrder, Order};
pub use order_product::{LineItemChange, OrderProduct};
pub use product::{NewProduct, NextVersion, Product};
