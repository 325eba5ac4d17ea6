//! Paid registration for one seat in a course

use std::collections::BTreeSet;

use async_trait::async_trait;
use tracing::info;

use super::{
    ensure_cart, ensure_currency, ensure_not_enrolled, ensure_not_in_cart, fulfillment_error,
    report_annotation, require_course, store_line, Fulfillment, PriceRequest, Pricing,
};
use crate::application::context::ShopContext;
use crate::domain::order::Order;
use crate::domain::order_item::{CourseSeat, ItemKind, ItemKindTag, OrderItem};
use crate::domain::ports::Course;
use crate::domain::{DomainError, DomainResult};

/// Add a seat for `course_id` to the cart.
///
/// Rejects unknown courses, a second seat for the same course, users who are
/// already enrolled and lines in a different currency than a non-empty cart.
pub async fn add_to_order(
    ctx: &ShopContext,
    order: &mut Order,
    course_id: &str,
    price: &PriceRequest,
) -> DomainResult<OrderItem> {
    ensure_cart(order)?;
    let course = require_course(ctx, order, course_id).await?;
    ensure_not_in_cart(ctx, order, course_id, ItemKindTag::CourseSeat).await?;
    ensure_not_enrolled(ctx, order, course_id).await?;

    let pricing = price.resolve(&course);
    ensure_currency(ctx, order, &pricing.currency).await?;

    let item = build(ctx, order, &course, pricing).await?;
    let item = store_line(ctx, order, item).await?;

    info!(
        user_id = order.user_id,
        order_id = order.id,
        item_id = item.id,
        course_id,
        "Added course registration to cart"
    );
    Ok(item)
}

/// Unsaved seat line; no cart checks
pub(crate) async fn build(
    ctx: &ShopContext,
    order: &Order,
    course: &Course,
    pricing: Pricing,
) -> DomainResult<OrderItem> {
    let mut item = OrderItem::new(
        order.id,
        order.user_id,
        order.status,
        ItemKind::CourseSeat(CourseSeat {
            course_id: course.id.clone(),
            mode: pricing.mode.slug,
        }),
    );
    item.qty = 1;
    item.unit_cost = pricing.cost;
    item.currency = pricing.currency;
    item.line_desc = format!("Registration for Course: {}", course.display_name);
    item.report_comments = report_annotation(ctx, ItemKindTag::CourseSeat, &course.id).await?;
    Ok(item)
}

#[async_trait]
impl Fulfillment for CourseSeat {
    async fn purchased_callback(&self, item: &OrderItem, ctx: &ShopContext) -> DomainResult<()> {
        let exists = ctx
            .catalog
            .course_exists(&self.course_id)
            .await
            .map_err(|e| fulfillment_error(item, e))?;
        if !exists {
            return Err(DomainError::Fulfillment {
                item_id: item.id,
                reason: format!(
                    "The customer purchased Course {}, but that course doesn't exist!",
                    self.course_id
                ),
            });
        }

        ctx.enrollments
            .enroll(item.user_id, &self.course_id, &self.mode)
            .await
            .map_err(|e| fulfillment_error(item, e))?;

        info!(
            user_id = item.user_id,
            course_id = %self.course_id,
            mode = %self.mode,
            paid = %item.line_cost(),
            "Enrolled user in paid course"
        );
        Ok(())
    }

    fn receipt_instructions(&self, _ctx: &ShopContext) -> BTreeSet<String> {
        BTreeSet::from(["Please visit your dashboard to see your new course.".to_string()])
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::domain::order_item::ItemKindTag;
    use crate::domain::ErrorKind;
    use crate::test_support::{TestShop, COURSE_A, COURSE_B};

    #[tokio::test]
    async fn adds_seat_with_catalog_defaults() {
        let shop = TestShop::new();
        let mut cart = shop.cart(7).await;

        let item = add_to_order(&shop.ctx, &mut cart, COURSE_A, &PriceRequest::mode("verified"))
            .await
            .unwrap();

        assert!(item.id > 0);
        assert_eq!(item.qty, 1);
        assert_eq!(item.unit_cost, Decimal::new(10000, 2));
        assert_eq!(item.currency, "usd");
        assert_eq!(item.status, crate::domain::OrderStatus::Cart);
        assert_eq!(item.line_desc, "Registration for Course: Circuits and Electronics");
        assert_eq!(item.report_comments, "");
        assert_eq!(item.kind.mode(), Some("verified"));
    }

    #[tokio::test]
    async fn stamps_report_annotation() {
        let shop = TestShop::new();
        shop.ctx
            .repos
            .annotations()
            .set_annotation(ItemKindTag::CourseSeat, COURSE_A, "FUND-77")
            .await
            .unwrap();
        let mut cart = shop.cart(7).await;

        let item = add_to_order(&shop.ctx, &mut cart, COURSE_A, &PriceRequest::default())
            .await
            .unwrap();
        assert_eq!(item.report_comments, "FUND-77");
        assert_eq!(item.kind.mode(), Some("honor"));
        assert_eq!(item.unit_cost, Decimal::ZERO);
    }

    #[tokio::test]
    async fn rejects_unknown_course() {
        let shop = TestShop::new();
        let mut cart = shop.cart(7).await;
        let err = add_to_order(&shop.ctx, &mut cart, "course-v1:Nope+0+0", &PriceRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::CourseNotFound(_)));
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn rejects_duplicate_and_enrolled() {
        let shop = TestShop::new();
        let mut cart = shop.cart(7).await;
        add_to_order(&shop.ctx, &mut cart, COURSE_A, &PriceRequest::default())
            .await
            .unwrap();

        let err = add_to_order(&shop.ctx, &mut cart, COURSE_A, &PriceRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::ItemAlreadyInCart(_)));

        shop.enrollments.enroll_now(7, COURSE_B, "honor");
        let err = add_to_order(&shop.ctx, &mut cart, COURSE_B, &PriceRequest::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::AlreadyEnrolled { user_id: 7, .. }));
        assert_eq!(shop.items(cart.id).await.len(), 1);
    }

    #[tokio::test]
    async fn currency_guard() {
        let shop = TestShop::new();

        // empty cart takes any currency
        let mut cart = shop.cart(7).await;
        add_to_order(
            &shop.ctx,
            &mut cart,
            COURSE_A,
            &PriceRequest::mode("verified").with_currency("eur"),
        )
        .await
        .unwrap();
        assert_eq!(shop.cart(7).await.currency, "eur");

        // non-empty usd cart rejects eur
        let mut other = shop.cart(8).await;
        add_to_order(&shop.ctx, &mut other, COURSE_A, &PriceRequest::mode("verified"))
            .await
            .unwrap();
        let err = add_to_order(
            &shop.ctx,
            &mut other,
            COURSE_B,
            &PriceRequest::default().with_currency("eur"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, DomainError::CurrencyMismatch { .. }));
        assert_eq!(shop.items(other.id).await.len(), 1);
        assert_eq!(shop.cart(8).await.currency, "usd");
    }

    #[tokio::test]
    async fn callback_enrolls_at_stored_mode() {
        let shop = TestShop::new();
        let mut cart = shop.cart(7).await;
        let item = add_to_order(&shop.ctx, &mut cart, COURSE_A, &PriceRequest::mode("verified"))
            .await
            .unwrap();

        fulfillment_for_seat(&item).purchased_callback(&item, &shop.ctx).await.unwrap();
        assert_eq!(shop.enrollments.mode_of(7, COURSE_A).as_deref(), Some("verified"));
    }

    #[tokio::test]
    async fn callback_fails_when_course_vanished() {
        let shop = TestShop::new();
        let mut cart = shop.cart(7).await;
        let item = add_to_order(&shop.ctx, &mut cart, COURSE_A, &PriceRequest::default())
            .await
            .unwrap();
        shop.catalog.remove_course(COURSE_A);

        let err = fulfillment_for_seat(&item)
            .purchased_callback(&item, &shop.ctx)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Fulfillment { item_id, .. } if item_id == item.id));
        assert!(shop.enrollments.mode_of(7, COURSE_A).is_none());
    }

    fn fulfillment_for_seat(item: &OrderItem) -> &dyn Fulfillment {
        super::super::fulfillment_for(&item.kind)
    }
}
