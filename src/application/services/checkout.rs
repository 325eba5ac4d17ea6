//! Checkout service: the cart, paying, purchased state machine
//!
//! Every status change goes through a conditional write in the repository,
//! so concurrent callers cannot both win: only the caller that moves the
//! order out of `cart`/`paying` runs fulfillment and notifications.

use chrono::Utc;
use serde_json::json;
use tracing::{error, info, warn};

use crate::application::context::ShopContext;
use crate::application::items::{code_bundle, course_seat, fulfillment_error, fulfillment_for, Pricing};
use crate::domain::order::{BillingDetails, Order, OrderStatus, OrderType, PurchaseCommit};
use crate::domain::order_item::{ItemKind, OrderItem};
use crate::domain::ports::{
    Course, Notification, NotificationKind, Recipient, RecipientKind, DEFAULT_MODE_SLUG,
};
use crate::domain::{DomainError, DomainResult};
use crate::shared::money::round_cents;

/// Line replacements decided before the purchase commit
#[derive(Debug, Default)]
struct Reclassification {
    order_type: OrderType,
    removed: Vec<i32>,
    added: Vec<OrderItem>,
}

pub struct CheckoutService {
    ctx: ShopContext,
}

impl CheckoutService {
    pub fn new(ctx: ShopContext) -> Self {
        Self { ctx }
    }

    async fn load(&self, order_id: i32) -> DomainResult<Order> {
        self.ctx
            .repos
            .orders()
            .find_by_id(order_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Order", "id", order_id))
    }

    // ── Start purchase ─────────────────────────────────────────

    /// Freeze the cart while the user is at the payment processor.
    ///
    /// A no-op unless the order is still a cart.
    pub async fn start_purchase(&self, order_id: i32) -> DomainResult<Order> {
        let order = self.load(order_id).await?;
        if !order.is_cart() {
            return Ok(order);
        }
        let moved = self
            .ctx
            .repos
            .orders()
            .transition(order_id, &[OrderStatus::Cart], OrderStatus::Paying, None)
            .await?;
        if moved {
            info!(order_id, user_id = order.user_id, "Order moved to paying");
        }
        self.load(order_id).await
    }

    // ── Purchase ───────────────────────────────────────────────

    /// Mark the order purchased and fulfill every item.
    ///
    /// Calling this on an order that is already purchased or refunded returns
    /// it unchanged. The commit (status, timestamp, billing snapshot and line
    /// reclassification) is atomic. Items are then fulfilled in order; the
    /// first failing callback stops the run with `DomainError::Fulfillment`,
    /// leaving the purchase committed and earlier items fulfilled.
    pub async fn purchase(&self, order_id: i32, billing: BillingDetails) -> DomainResult<Order> {
        let order = self.load(order_id).await?;
        if !order.status.is_purchasable() {
            info!(order_id, status = %order.status, "Order already settled; purchase ignored");
            return Ok(order);
        }

        let items = self.ctx.repos.order_items().find_by_order(order_id).await?;
        let plan = self.reclassify(&order, &items).await?;

        let mut purchased = order.clone();
        purchased.status = OrderStatus::Purchased;
        purchased.purchase_time = Some(Utc::now());
        purchased.order_type = plan.order_type;
        purchased.record_billing(billing, self.ctx.shop.store_billing_info);

        let claimed = self
            .ctx
            .repos
            .orders()
            .commit_purchase(PurchaseCommit {
                order: purchased,
                expected: vec![OrderStatus::Cart, OrderStatus::Paying],
                removed_items: plan.removed,
                added_items: plan.added,
            })
            .await?;
        if !claimed {
            info!(order_id, "Order purchased concurrently; skipping fulfillment");
            return self.load(order_id).await;
        }

        let purchased = self.load(order_id).await?;
        metrics::counter!("shoppingcart_purchases_total", "order_type" => purchased.order_type.as_str())
            .increment(1);
        info!(
            order_id,
            user_id = purchased.user_id,
            order_type = purchased.order_type.as_str(),
            "Order purchased"
        );

        let items = self.ctx.repos.order_items().find_by_order(order_id).await?;
        for item in &items {
            if let Err(e) = fulfillment_for(&item.kind).purchased_callback(item, &self.ctx).await {
                let err = fulfillment_error(item, e);
                metrics::counter!("shoppingcart_fulfillment_failures_total", "kind" => item.tag().as_str())
                    .increment(1);
                error!(order_id, item_id = item.id, kind = %item.tag(), error = %err, "Fulfillment failed");
                return Err(err);
            }
            self.ctx
                .repos
                .order_items()
                .mark_fulfilled(item.id, Utc::now())
                .await?;
        }

        self.send_confirmation(&purchased, &items).await;
        Ok(purchased)
    }

    /// Business orders (any quantity above one) buy codes: seats become
    /// bundles. Personal orders buy seats: bundles become seats.
    ///
    /// Replacement lines keep the price, currency and list price of the line
    /// they replace.
    async fn reclassify(&self, order: &Order, items: &[OrderItem]) -> DomainResult<Reclassification> {
        let business = items.iter().any(|item| item.qty > 1);
        let mut plan = Reclassification {
            order_type: if business { OrderType::Business } else { OrderType::Personal },
            ..Default::default()
        };

        for item in items {
            let replacement = match (&item.kind, business) {
                (ItemKind::CourseSeat(seat), true) => {
                    let course = self.course_for_reclassification(order, &seat.course_id).await?;
                    let pricing = carried_pricing(&course, &seat.mode, item);
                    Some(code_bundle::build(&self.ctx, order, &course, item.qty, pricing).await?)
                }
                (ItemKind::CodeBundle(bundle), false) => {
                    let course = self.course_for_reclassification(order, &bundle.course_id).await?;
                    let pricing = carried_pricing(&course, &bundle.mode, item);
                    Some(course_seat::build(&self.ctx, order, &course, pricing).await?)
                }
                _ => None,
            };

            if let Some(mut replacement) = replacement {
                replacement.list_price = item.list_price;
                plan.removed.push(item.id);
                plan.added.push(replacement);
            }
        }

        if !plan.removed.is_empty() {
            info!(
                order_id = order.id,
                order_type = plan.order_type.as_str(),
                replaced = plan.removed.len(),
                "Reclassified order lines"
            );
        }
        Ok(plan)
    }

    async fn course_for_reclassification(&self, order: &Order, course_id: &str) -> DomainResult<Course> {
        self.ctx.catalog.get_course(course_id).await?.ok_or_else(|| {
            warn!(order_id = order.id, course_id, "Course vanished before purchase");
            DomainError::CourseNotFound(course_id.to_string())
        })
    }

    // ── Free enrollment ────────────────────────────────────────

    /// Enroll the user in every course of a fully discounted cart and mark
    /// it purchased. Enrollments use the default mode whatever the line was
    /// priced at. No billing snapshot, callbacks or notification.
    ///
    /// An empty cart is returned unchanged.
    pub async fn free_enrollment(&self, order_id: i32) -> DomainResult<Order> {
        let order = self.load(order_id).await?;
        if !order.is_cart() {
            return Err(DomainError::Validation(format!(
                "Order {} is {}, not a cart",
                order_id, order.status
            )));
        }
        let items = self.ctx.repos.order_items().find_by_order(order_id).await?;
        if items.is_empty() {
            return Ok(order);
        }
        let total: rust_decimal::Decimal = items.iter().map(OrderItem::line_cost).sum();
        if !total.is_zero() {
            warn!(order_id, total = %total, "Free enrollment requested for a paid cart");
            return Err(DomainError::Validation(format!(
                "Cart {} is not free (total {})",
                order_id, total
            )));
        }

        let claimed = self
            .ctx
            .repos
            .orders()
            .transition(order_id, &[OrderStatus::Cart], OrderStatus::Purchased, Some(Utc::now()))
            .await?;
        if !claimed {
            return self.load(order_id).await;
        }

        for item in &items {
            let Some(course_id) = item.course_id() else {
                continue;
            };
            self.ctx
                .enrollments
                .enroll(order.user_id, course_id, DEFAULT_MODE_SLUG)
                .await
                .map_err(|e| fulfillment_error(item, e))?;
            info!(user_id = order.user_id, course_id, "Enrolled user in free course");
        }

        self.load(order_id).await
    }

    // ── Notifications ──────────────────────────────────────────

    /// One confirmation per recipient. Failures are logged and counted only.
    async fn send_confirmation(&self, order: &Order, items: &[OrderItem]) {
        let recipients = recipients_for(order);
        let (kind, subject, codes) = if order.is_business() {
            let courses = self.purchased_code_courses(order, items).await;
            let names: Vec<&str> = courses.iter().map(|c| c.1.as_str()).collect();
            let subject = format!(
                "Confirmation and Registration Codes for the following courses: {}",
                names.join(", ")
            );
            let codes: Vec<_> = courses
                .iter()
                .map(|(course_id, name, codes)| json!({ "course_id": course_id, "course_name": name, "codes": codes }))
                .collect();
            (NotificationKind::BusinessOrderConfirmation, subject, codes)
        } else {
            (NotificationKind::OrderConfirmation, "Order Payment Confirmation".to_string(), Vec::new())
        };

        let order_items: Vec<_> = items
            .iter()
            .map(|item| {
                json!({
                    "description": item.line_desc,
                    "qty": item.qty,
                    "unit_cost": round_cents(item.unit_cost).to_string(),
                    "line_cost": round_cents(item.line_cost()).to_string(),
                    "currency": item.currency,
                })
            })
            .collect();
        let mut instructions: Vec<String> = Vec::new();
        for text in items
            .iter()
            .filter_map(|item| fulfillment_for(&item.kind).additional_instruction_text(&self.ctx))
        {
            if !instructions.contains(&text) {
                instructions.push(text);
            }
        }
        let total: rust_decimal::Decimal = items.iter().map(OrderItem::line_cost).sum();

        for recipient in recipients {
            let notification = Notification {
                kind,
                subject: subject.clone(),
                context: json!({
                    "order_id": order.id,
                    "recipient_name": recipient.name,
                    "recipient_type": recipient.kind,
                    "order_items": order_items,
                    "total_cost": round_cents(total).to_string(),
                    "currency": order.currency,
                    "order_placed_by": order.user_id,
                    "registration_codes": codes,
                    "additional_instructions": instructions,
                    "has_billing_info": self.ctx.shop.store_billing_info,
                    "platform_name": self.ctx.shop.platform_name,
                    "payment_support_email": self.ctx.shop.payment_support_email,
                }),
                recipients: vec![recipient],
                attachment: None,
            };
            if let Err(e) = self.ctx.notifier.send(notification).await {
                metrics::counter!("shoppingcart_notification_failures_total", "kind" => kind.as_str())
                    .increment(1);
                error!(order_id = order.id, error = %e, "Failed sending confirmation for order");
            }
        }
    }

    /// (course id, display name, minted codes) for each bundle in the order
    async fn purchased_code_courses(&self, order: &Order, items: &[OrderItem]) -> Vec<(String, String, Vec<String>)> {
        let mut courses = Vec::new();
        for item in items {
            let ItemKind::CodeBundle(bundle) = &item.kind else {
                continue;
            };
            let name = match self.ctx.catalog.get_course(&bundle.course_id).await {
                Ok(Some(course)) => course.display_name,
                _ => bundle.course_id.clone(),
            };
            let codes = match self
                .ctx
                .repos
                .registration_codes()
                .find_by_order_and_course(order.id, &bundle.course_id)
                .await
            {
                Ok(codes) => codes.into_iter().map(|c| c.code).collect(),
                Err(e) => {
                    warn!(order_id = order.id, course_id = %bundle.course_id, error = %e, "Could not load codes for confirmation");
                    Vec::new()
                }
            };
            courses.push((bundle.course_id.clone(), name, codes));
        }
        courses
    }
}

fn carried_pricing(course: &Course, mode: &str, item: &OrderItem) -> Pricing {
    Pricing {
        mode: course.mode_or_default(mode),
        cost: item.unit_cost,
        currency: item.currency.clone(),
    }
}

/// Purchaser, then the company contact and invoice recipient when given
fn recipients_for(order: &Order) -> Vec<Recipient> {
    let purchaser_name = format!("{} {}", order.billing.first_name, order.billing.last_name)
        .trim()
        .to_string();
    let mut recipients = vec![Recipient {
        kind: RecipientKind::Purchaser,
        name: purchaser_name,
        user_id: Some(order.user_id),
        email: None,
    }];
    if let Some(email) = &order.bulk.company_contact_email {
        recipients.push(Recipient {
            kind: RecipientKind::CompanyContact,
            name: order.bulk.company_contact_name.clone().unwrap_or_default(),
            user_id: None,
            email: Some(email.clone()),
        });
    }
    if let Some(email) = &order.bulk.recipient_email {
        recipients.push(Recipient {
            kind: RecipientKind::InvoiceRecipient,
            name: order.bulk.recipient_name.clone().unwrap_or_default(),
            user_id: None,
            email: Some(email.clone()),
        });
    }
    recipients
}

// ── Tests ──────────────────────────────────────────────────────
