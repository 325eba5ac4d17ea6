//! Bundle of registration codes for a course
//!
//! Bought by business orders; `qty` is the number of codes minted on purchase.

use async_trait::async_trait;
use tracing::info;

use super::{
    ensure_cart, ensure_currency, ensure_not_enrolled, ensure_not_in_cart, fulfillment_error,
    report_annotation, require_course, store_line, Fulfillment, PriceRequest, Pricing,
};
use crate::application::context::ShopContext;
use crate::domain::order::Order;
use crate::domain::order_item::{CodeBundle, ItemKind, ItemKindTag, OrderItem};
use crate::domain::ports::Course;
use crate::domain::{DomainError, DomainResult};

pub async fn add_to_order(
    ctx: &ShopContext,
    order: &mut Order,
    course_id: &str,
    qty: i32,
    price: &PriceRequest,
) -> DomainResult<OrderItem> {
    ensure_cart(order)?;
    if qty < 1 {
        return Err(DomainError::Validation(format!("Quantity must be at least 1, got {}", qty)));
    }
    let course = require_course(ctx, order, course_id).await?;
    ensure_not_in_cart(ctx, order, course_id, ItemKindTag::CodeBundle).await?;
    ensure_not_enrolled(ctx, order, course_id).await?;

    let pricing = price.resolve(&course);
    ensure_currency(ctx, order, &pricing.currency).await?;

    let item = build(ctx, order, &course, qty, pricing).await?;
    let item = store_line(ctx, order, item).await?;

    info!(
        user_id = order.user_id,
        order_id = order.id,
        item_id = item.id,
        course_id,
        qty,
        "Added registration code bundle to cart"
    );
    Ok(item)
}

/// Unsaved bundle line; no cart checks
pub(crate) async fn build(
    ctx: &ShopContext,
    order: &Order,
    course: &Course,
    qty: i32,
    pricing: Pricing,
) -> DomainResult<OrderItem> {
    let mut item = OrderItem::new(
        order.id,
        order.user_id,
        order.status,
        ItemKind::CodeBundle(CodeBundle {
            course_id: course.id.clone(),
            mode: pricing.mode.slug,
        }),
    );
    item.qty = qty;
    item.unit_cost = pricing.cost;
    item.currency = pricing.currency;
    item.line_desc = format!("Enrollment codes for Course: {}", course.display_name);
    item.report_comments = report_annotation(ctx, ItemKindTag::CodeBundle, &course.id).await?;
    Ok(item)
}

#[async_trait]
impl Fulfillment for CodeBundle {
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

        for _ in 0..item.qty {
            ctx.codes
                .mint_registration_code(item.user_id, &self.course_id, None, Some(item.order_id))
                .await
                .map_err(|e| fulfillment_error(item, e))?;
        }

        info!(
            user_id = item.user_id,
            order_id = item.order_id,
            course_id = %self.course_id,
            codes = item.qty,
            paid = %item.line_cost(),
            "Minted registration codes for purchased bundle"
        );
        Ok(())
    }
}

// ── Tests ──────────────────────────────────────────────────────
