//! Donations, to a course or to the platform as a whole

use std::collections::BTreeSet;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::{info, warn};

use super::{ensure_cart, ensure_currency, require_course, store_line, Fulfillment};
use crate::application::context::ShopContext;
use crate::domain::order::{Order, DEFAULT_CURRENCY};
use crate::domain::order_item::{Donation, DonationType, ItemKind, OrderItem};
use crate::domain::{DomainError, DomainResult};

/// Add a donation of `amount`. A `course_id` makes it a course donation and
/// must name an existing course.
pub async fn add_to_order(
    ctx: &ShopContext,
    order: &mut Order,
    amount: Decimal,
    course_id: Option<&str>,
    currency: Option<&str>,
) -> DomainResult<OrderItem> {
    ensure_cart(order)?;
    if !ctx.shop.donations_enabled {
        warn!(order_id = order.id, "Donation attempted while donations are disabled");
        return Err(DomainError::Validation("Donations are not enabled".to_string()));
    }
    if amount.is_sign_negative() {
        return Err(DomainError::Validation(format!("Donation amount must not be negative: {}", amount)));
    }

    let currency = currency.unwrap_or(DEFAULT_CURRENCY);
    ensure_currency(ctx, order, currency).await?;

    let (donation, line_desc) = match course_id {
        Some(course_id) => {
            let course = require_course(ctx, order, course_id).await?;
            (
                Donation {
                    donation_type: DonationType::Course,
                    course_id: Some(course.id.clone()),
                },
                format!("Donation for {}", course.display_name),
            )
        }
        None => (
            Donation {
                donation_type: DonationType::General,
                course_id: None,
            },
            format!("Donation for {}", ctx.shop.platform_name),
        ),
    };

    let mut item = OrderItem::new(order.id, order.user_id, order.status, ItemKind::Donation(donation));
    item.unit_cost = amount;
    item.currency = currency.to_string();
    item.line_desc = line_desc;

    let item = store_line(ctx, order, item).await?;
    info!(
        user_id = order.user_id,
        order_id = order.id,
        item_id = item.id,
        amount = %item.unit_cost,
        "Added donation to cart"
    );
    Ok(item)
}

fn tax_deduction_msg(ctx: &ShopContext) -> String {
    format!(
        "We greatly appreciate this generous contribution and your support of the {} mission.  \
         This receipt was prepared to support charitable contributions for tax purposes.  \
         We confirm that neither goods nor services were provided in exchange for this gift.",
        ctx.shop.platform_name
    )
}

#[async_trait]
impl Fulfillment for Donation {
    async fn purchased_callback(&self, _item: &OrderItem, _ctx: &ShopContext) -> DomainResult<()> {
        Ok(())
    }

    fn receipt_instructions(&self, ctx: &ShopContext) -> BTreeSet<String> {
        BTreeSet::from([tax_deduction_msg(ctx)])
    }

    fn additional_instruction_text(&self, ctx: &ShopContext) -> Option<String> {
        Some(tax_deduction_msg(ctx))
    }
}

// ── Tests ──────────────────────────────────────────────────────
