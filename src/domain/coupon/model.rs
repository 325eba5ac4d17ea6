//! Coupon domain entities

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::shared::money::percentage_discounted;

/// Percentage discount on one course
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coupon {
    pub id: i32,
    pub code: String,
    pub description: Option<String>,
    pub course_id: String,
    pub percentage_discount: i32,
    pub created_by: i32,
    pub created_at: DateTime<Utc>,
    /// Soft-delete flag
    pub is_active: bool,
}

impl Coupon {
    pub fn new(code: impl Into<String>, course_id: impl Into<String>, percentage_discount: i32, created_by: i32) -> Self {
        Self {
            id: 0,
            code: code.into(),
            description: None,
            course_id: course_id.into(),
            percentage_discount,
            created_by,
            created_at: Utc::now(),
            is_active: true,
        }
    }

    /// Price of `value` once this coupon applies
    pub fn discounted_price(&self, value: Decimal) -> Decimal {
        percentage_discounted(value, self.percentage_discount)
    }

    /// Whether a coupon already redeemed on the order blocks this one.
    ///
    /// Blocks when the codes differ or when it is the very same coupon.
    pub fn is_blocked_by(&self, redeemed: &Coupon) -> bool {
        redeemed.code != self.code || redeemed.id == self.id
    }
}

/// Record that a coupon was applied to an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CouponRedemption {
    pub id: i32,
    pub order_id: i32,
    pub user_id: i32,
    pub coupon_id: i32,
}
