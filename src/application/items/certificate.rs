//! Paid certificate upgrade for an enrollment

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use super::{ensure_cart, ensure_currency, fulfillment_error, require_course, store_line, Fulfillment};
use crate::application::context::ShopContext;
use crate::domain::order::{Order, DEFAULT_CURRENCY};
use crate::domain::order_item::{Certificate, ItemKind, ItemKindTag, OrderItem};
use crate::domain::{DomainError, DomainResult};

/// Add a certificate in `mode` for `course_id` at `cost`.
///
/// Creates the user's enrollment when none exists. Adding the same course
/// again updates the existing line instead of adding a second one; a
/// discounted line is left alone with `ItemAlreadyDiscounted`.
pub async fn add_to_order(
    ctx: &ShopContext,
    order: &mut Order,
    course_id: &str,
    cost: Decimal,
    mode: &str,
    currency: Option<&str>,
) -> DomainResult<OrderItem> {
    ensure_cart(order)?;
    let currency = currency.unwrap_or(DEFAULT_CURRENCY);
    let course = require_course(ctx, order, course_id).await?;
    ensure_currency(ctx, order, currency).await?;

    let Some(mode_info) = course.mode(mode).cloned() else {
        warn!(order_id = order.id, course_id, mode, "Certificate mode not offered");
        return Err(DomainError::InvalidMode {
            mode: mode.to_string(),
            course_id: course_id.to_string(),
        });
    };

    let enrollment = ctx
        .enrollments
        .get_or_create_enrollment(order.user_id, course_id)
        .await?;

    let existing = ctx
        .repos
        .order_items()
        .find_in_order(order.id, course_id, ItemKindTag::Certificate)
        .await?;
    let kind = ItemKind::Certificate(Certificate {
        course_id: course_id.to_string(),
        enrollment_id: enrollment.id,
        mode: mode.to_string(),
    });
    let mut item = match existing {
        Some(mut item) => {
            item.kind = kind;
            item
        }
        None => OrderItem::new(order.id, order.user_id, order.status, kind),
    };
    item.status = order.status;
    item.qty = 1;
    item.unit_cost = cost;
    item.currency = currency.to_string();
    item.line_desc = format!("{} for course {}", mode_info.name, course.display_name);

    let item = store_line(ctx, order, item).await?;
    info!(
        user_id = order.user_id,
        order_id = order.id,
        item_id = item.id,
        course_id,
        mode,
        "Added certificate to cart"
    );
    Ok(item)
}

#[async_trait]
impl Fulfillment for Certificate {
    async fn purchased_callback(&self, item: &OrderItem, ctx: &ShopContext) -> DomainResult<()> {
        match ctx.verifications.active_verification_for(item.user_id).await {
            Ok(Some(attempt)) => {
                if let Err(e) = ctx.verifications.submit(&attempt).await {
                    error!(
                        user_id = item.user_id,
                        enrollment_id = self.enrollment_id,
                        attempt_id = attempt.id,
                        error = %e,
                        "Could not submit verification attempt"
                    );
                }
            }
            Ok(None) => {}
            Err(e) => {
                error!(
                    user_id = item.user_id,
                    enrollment_id = self.enrollment_id,
                    error = %e,
                    "Could not look up verification attempt"
                );
            }
        }

        ctx.enrollments
            .change_mode(self.enrollment_id, &self.mode)
            .await
            .map_err(|e| fulfillment_error(item, e))?;
        ctx.enrollments
            .activate(self.enrollment_id)
            .await
            .map_err(|e| fulfillment_error(item, e))?;

        info!(
            user_id = item.user_id,
            enrollment_id = self.enrollment_id,
            mode = %self.mode,
            "Upgraded enrollment for purchased certificate"
        );
        Ok(())
    }

    fn additional_instruction_text(&self, ctx: &ShopContext) -> Option<String> {
        Some(format!(
            "Note - you have up to 2 weeks into the course to unenroll from the Verified Certificate option \
             and receive a full refund. To receive your refund, contact {}. \
             Please include your order number in your e-mail. \
             Please do NOT include your credit card information.",
            ctx.shop.payment_support_email
        ))
    }
}

// ── Tests ──────────────────────────────────────────────────────
