//! Coupon aggregate
//!
//! Percentage discount codes and the record of their redemption.

pub mod model;
pub mod repository;

pub use model::{Coupon, CouponRedemption};
pub use repository::{CouponRedemptionRepository, CouponRepository};
