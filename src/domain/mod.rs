//! Domain layer
//!
//! Entities, repository traits and ports. Nothing in here knows about
//! storage engines or the delivery side.

pub mod coupon;
pub mod order;
pub mod order_item;
pub mod ports;
pub mod registration_code;
pub mod reporting;
pub mod repositories;

pub use coupon::{Coupon, CouponRedemption};
pub use order::{BillingDetails, BulkBillingDetails, Order, OrderStatus, OrderType};
pub use order_item::{ItemKind, ItemKindTag, ItemRef, OrderItem};
pub use registration_code::{CourseRegistrationCode, Invoice, RegistrationCodeRedemption};
pub use repositories::{DomainResult, RepositoryProvider};

pub use crate::shared::errors::{DomainError, ErrorKind};
