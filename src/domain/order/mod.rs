//! Order aggregate
//!
//! Contains the Order entity, its status machine types, and repository interface.

pub mod model;
pub mod repository;

pub use model::{BillingDetails, BulkBillingDetails, Order, OrderStatus, OrderType, DEFAULT_CURRENCY};
pub use repository::{OrderRepository, PurchaseCommit};
