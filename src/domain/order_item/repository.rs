//! OrderItem repository interfaces

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use super::model::{ItemKindTag, OrderItem};
use crate::domain::DomainResult;

#[async_trait]
pub trait OrderItemRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<OrderItem>>;

    /// Items of an order in insertion order
    async fn find_by_order(&self, order_id: i32) -> DomainResult<Vec<OrderItem>>;

    /// The item of variant `kind` for `course_id` in the order, if any
    async fn find_in_order(
        &self,
        order_id: i32,
        course_id: &str,
        kind: ItemKindTag,
    ) -> DomainResult<Option<OrderItem>>;

    // Cart writes below only touch lines whose order is still a cart;
    // anything else fails with a validation error and changes nothing.

    /// Insert a line into a cart order
    async fn save(&self, item: OrderItem) -> DomainResult<OrderItem>;

    /// Overwrite an undiscounted cart line.
    ///
    /// Fails with `ItemAlreadyDiscounted` when the stored line carries a discount.
    async fn update(&self, item: &OrderItem) -> DomainResult<()>;

    async fn set_quantity(&self, id: i32, qty: i32) -> DomainResult<()>;

    /// Restore the pre-discount price. Returns `false` when nothing was discounted.
    async fn reset_price(&self, id: i32) -> DomainResult<bool>;

    async fn delete(&self, id: i32) -> DomainResult<bool>;
    async fn delete_by_order(&self, order_id: i32) -> DomainResult<u64>;

    /// Stamp the item's fulfillment time.
    ///
    /// Returns `false` when the item was already fulfilled.
    async fn mark_fulfilled(&self, id: i32, at: DateTime<Utc>) -> DomainResult<bool>;

    /// Purchased certificates of `mode` held by a user for a course, oldest first
    async fn find_purchased_certificates(
        &self,
        user_id: i32,
        course_id: &str,
        mode: &str,
    ) -> DomainResult<Vec<OrderItem>>;
}

/// Course → free-text annotation used by finance reports.
///
/// Seat and bundle items each have their own table.
#[async_trait]
pub trait CourseAnnotationRepository: Send + Sync {
    async fn find_annotation(&self, kind: ItemKindTag, course_id: &str) -> DomainResult<Option<String>>;
    async fn set_annotation(&self, kind: ItemKindTag, course_id: &str, annotation: &str) -> DomainResult<()>;
}
