//! Order item variants
//!
//! Each variant module exposes an `add_to_order` factory that validates and
//! prices the line, and implements [`Fulfillment`] for the work done once
//! the order is purchased. Dispatch goes through [`fulfillment_for`].

pub mod certificate;
pub mod code_bundle;
pub mod course_seat;
pub mod donation;

use std::collections::BTreeSet;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::warn;

use super::context::ShopContext;
use crate::domain::order::Order;
use crate::domain::order_item::{ItemKind, ItemKindTag, ItemRef, OrderItem};
use crate::domain::ports::{Course, CourseMode, DEFAULT_MODE_SLUG};
use crate::domain::{DomainError, DomainResult};
use crate::shared::money::{round_cents, to_cents};

// ── Fulfillment contract ───────────────────────────────────────

#[async_trait]
pub trait Fulfillment: Send + Sync {
    /// Deliver what was bought. Runs exactly once per item, during purchase.
    async fn purchased_callback(&self, item: &OrderItem, ctx: &ShopContext) -> DomainResult<()>;

    /// Receipt-page instructions
    fn receipt_instructions(&self, _ctx: &ShopContext) -> BTreeSet<String> {
        BTreeSet::new()
    }

    /// Extra paragraph for the confirmation notification
    fn additional_instruction_text(&self, _ctx: &ShopContext) -> Option<String> {
        None
    }
}

pub fn fulfillment_for(kind: &ItemKind) -> &dyn Fulfillment {
    match kind {
        ItemKind::CourseSeat(seat) => seat,
        ItemKind::CodeBundle(bundle) => bundle,
        ItemKind::Certificate(cert) => cert,
        ItemKind::Donation(donation) => donation,
    }
}

pub fn generate_receipt_instructions(item: &OrderItem, ctx: &ShopContext) -> (ItemRef, BTreeSet<String>) {
    (item.item_ref(), fulfillment_for(&item.kind).receipt_instructions(ctx))
}

// ── Pricing ────────────────────────────────────────────────────

/// Optional overrides accepted by the seat and bundle factories
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceRequest {
    /// Modes the course does not offer fall back to `honor`
    pub mode: Option<String>,
    /// Explicit price; `Some(0)` is honoured as free
    pub cost: Option<Decimal>,
    pub currency: Option<String>,
}

impl PriceRequest {
    pub fn mode(mode: impl Into<String>) -> Self {
        Self {
            mode: Some(mode.into()),
            ..Default::default()
        }
    }

    pub fn with_cost(mut self, cost: Decimal) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub(crate) fn resolve(&self, course: &Course) -> Pricing {
        let mode = course.mode_or_default(self.mode.as_deref().unwrap_or(DEFAULT_MODE_SLUG));
        let cost = self.cost.unwrap_or(mode.min_price);
        let currency = self.currency.clone().unwrap_or_else(|| mode.currency.clone());
        Pricing { mode, cost, currency }
    }
}

pub(crate) struct Pricing {
    pub mode: CourseMode,
    pub cost: Decimal,
    pub currency: String,
}

// ── Factory guards ─────────────────────────────────────────────

pub(crate) fn ensure_cart(order: &Order) -> DomainResult<()> {
    if order.is_cart() {
        Ok(())
    } else {
        Err(DomainError::Validation(format!(
            "Order {} is {}, items can only change while in cart",
            order.id, order.status
        )))
    }
}

pub(crate) async fn require_course(ctx: &ShopContext, order: &Order, course_id: &str) -> DomainResult<Course> {
    match ctx.catalog.get_course(course_id).await? {
        Some(course) => Ok(course),
        None => {
            warn!(user_id = order.user_id, order_id = order.id, course_id, "Tried to add non-existent course to cart");
            Err(DomainError::CourseNotFound(course_id.to_string()))
        }
    }
}

pub(crate) async fn ensure_not_in_cart(
    ctx: &ShopContext,
    order: &Order,
    course_id: &str,
    kind: ItemKindTag,
) -> DomainResult<()> {
    if ctx.repos.order_items().find_in_order(order.id, course_id, kind).await?.is_some() {
        warn!(user_id = order.user_id, order_id = order.id, course_id, kind = %kind, "Course already in cart");
        return Err(DomainError::ItemAlreadyInCart(course_id.to_string()));
    }
    Ok(())
}

pub(crate) async fn ensure_not_enrolled(ctx: &ShopContext, order: &Order, course_id: &str) -> DomainResult<()> {
    if ctx.enrollments.is_enrolled(order.user_id, course_id).await? {
        warn!(user_id = order.user_id, order_id = order.id, course_id, "User already enrolled");
        return Err(DomainError::AlreadyEnrolled {
            user_id: order.user_id,
            course_id: course_id.to_string(),
        });
    }
    Ok(())
}

/// A non-empty cart only accepts lines in its own currency
pub(crate) async fn ensure_currency(ctx: &ShopContext, order: &Order, currency: &str) -> DomainResult<()> {
    if order.currency == currency {
        return Ok(());
    }
    if ctx.repos.order_items().find_by_order(order.id).await?.is_empty() {
        return Ok(());
    }
    warn!(order_id = order.id, cart = %order.currency, item = currency, "Currency mismatch");
    Err(DomainError::CurrencyMismatch {
        cart: order.currency.clone(),
        item: currency.to_string(),
    })
}

pub(crate) async fn report_annotation(ctx: &ShopContext, kind: ItemKindTag, course_id: &str) -> DomainResult<String> {
    Ok(ctx
        .repos
        .annotations()
        .find_annotation(kind, course_id)
        .await?
        .unwrap_or_default())
}

/// Insert (id 0) or update the line, then move the order onto its currency.
///
/// Amounts are stored in whole cents and must fit the storage range.
pub(crate) async fn store_line(ctx: &ShopContext, order: &mut Order, mut item: OrderItem) -> DomainResult<OrderItem> {
    item.unit_cost = round_cents(item.unit_cost);
    item.service_fee = round_cents(item.service_fee);
    to_cents(item.unit_cost)?;
    to_cents(item.service_fee)?;

    let item = if item.id == 0 {
        ctx.repos.order_items().save(item).await?
    } else {
        ctx.repos.order_items().update(&item).await?;
        item
    };

    if order.currency != item.currency {
        order.currency = item.currency.clone();
        ctx.repos.orders().update(order).await?;
    }
    Ok(item)
}

/// Map a gateway failure inside a callback onto the item it broke
pub(crate) fn fulfillment_error(item: &OrderItem, err: DomainError) -> DomainError {
    match err {
        DomainError::Fulfillment { .. } => err,
        other => DomainError::Fulfillment {
            item_id: item.id,
            reason: other.to_string(),
        },
    }
}
