//! Order repository interface

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{Order, OrderStatus};
use crate::domain::order_item::OrderItem;
use crate::domain::DomainResult;

/// Everything the purchase commit writes in one atomic step.
#[derive(Debug, Clone)]
pub struct PurchaseCommit {
    /// Order carrying the new status, purchase time, billing snapshot and order type
    pub order: Order,
    /// The commit only applies while the stored order is in one of these statuses
    pub expected: Vec<OrderStatus>,
    /// Items dropped by reclassification
    pub removed_items: Vec<i32>,
    /// Replacement items built by reclassification
    pub added_items: Vec<OrderItem>,
}

#[async_trait]
pub trait OrderRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<Order>>;

    /// Newest (highest id) order in `cart` status for the user
    async fn find_newest_cart(&self, user_id: i32) -> DomainResult<Option<Order>>;

    /// Insert a new order; the returned copy carries the assigned id
    async fn save(&self, order: Order) -> DomainResult<Order>;

    /// Persist currency, billing snapshot, order type and bulk billing fields.
    ///
    /// Status and timestamps are never written here; they only move through
    /// [`transition`](Self::transition), [`commit_purchase`](Self::commit_purchase)
    /// and [`refund_item`](Self::refund_item).
    async fn update(&self, order: &Order) -> DomainResult<()>;

    /// Move the order and all of its items to `to`, provided the stored order
    /// status is one of `from`. `purchased_at` is stamped on the order when set.
    ///
    /// Returns `false` (and writes nothing) when the guard does not hold.
    async fn transition(
        &self,
        order_id: i32,
        from: &[OrderStatus],
        to: OrderStatus,
        purchased_at: Option<DateTime<Utc>>,
    ) -> DomainResult<bool>;

    /// Apply a [`PurchaseCommit`] atomically. Returns `false` when the stored
    /// order is no longer in one of the expected statuses.
    async fn commit_purchase(&self, commit: PurchaseCommit) -> DomainResult<bool>;

    /// Mark one item and its order `refunded` in a single write
    async fn refund_item(&self, order_id: i32, item_id: i32, at: DateTime<Utc>) -> DomainResult<()>;
}
