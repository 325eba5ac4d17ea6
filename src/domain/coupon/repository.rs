//! Coupon repository interfaces

use async_trait::async_trait;

use super::model::{Coupon, CouponRedemption};
use crate::domain::order_item::Discount;
use crate::domain::DomainResult;

#[async_trait]
pub trait CouponRepository: Send + Sync {
    /// Active coupon with this code (soft-deleted coupons are skipped)
    async fn find_active_by_code(&self, code: &str) -> DomainResult<Option<Coupon>>;
    /// Any coupon by id, active or not
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Coupon>>;
    async fn find_active(&self) -> DomainResult<Vec<Coupon>>;
    async fn find_all(&self) -> DomainResult<Vec<Coupon>>;
    async fn save(&self, coupon: Coupon) -> DomainResult<Coupon>;
    /// Soft delete. Returns `false` when no coupon has this id.
    async fn deactivate(&self, id: i32) -> DomainResult<bool>;
}

#[async_trait]
pub trait CouponRedemptionRepository: Send + Sync {
    async fn find_for_order(&self, order_id: i32, user_id: i32) -> DomainResult<Vec<CouponRedemption>>;

    /// Record the redemption and write `discount` in one atomic step.
    ///
    /// Nothing is recorded when the discount no longer applies to the line.
    async fn redeem(&self, redemption: CouponRedemption, discount: &Discount) -> DomainResult<CouponRedemption>;

    async fn delete_for_order(&self, user_id: i32, order_id: i32) -> DomainResult<u64>;
}
