//! Certificate refunds, triggered when a verified enrollment is abandoned

use chrono::Utc;
use serde_json::json;
use tracing::{error, info, warn};

use crate::application::context::ShopContext;
use crate::domain::order_item::OrderItem;
use crate::domain::ports::{
    Enrollment, Notification, NotificationKind, Recipient, RecipientKind, VERIFIED_MODE_SLUG,
};
use crate::domain::{DomainError, DomainResult};

pub struct RefundService {
    ctx: ShopContext,
}

impl RefundService {
    pub fn new(ctx: ShopContext) -> Self {
        Self { ctx }
    }

    /// Refund the verified certificate bought for `enrollment`.
    ///
    /// Returns the refunded item, or `None` when the enrollment is not
    /// refundable or no purchased certificate backs it.
    pub async fn refund_if_eligible(&self, enrollment: &Enrollment) -> DomainResult<Option<OrderItem>> {
        if !enrollment.refundable() {
            return Ok(None);
        }

        let certificates = self
            .ctx
            .repos
            .order_items()
            .find_purchased_certificates(enrollment.user_id, &enrollment.course_id, VERIFIED_MODE_SLUG)
            .await?;
        let Some(certificate) = certificates.into_iter().next() else {
            error!(
                user_id = enrollment.user_id,
                course_id = %enrollment.course_id,
                "Refundable enrollment has no purchased verified certificate"
            );
            return Ok(None);
        };

        let now = Utc::now();
        self.ctx
            .repos
            .orders()
            .refund_item(certificate.order_id, certificate.id, now)
            .await?;
        metrics::counter!("shoppingcart_refunds_total", "kind" => certificate.tag().as_str()).increment(1);
        info!(
            order_id = certificate.order_id,
            item_id = certificate.id,
            user_id = enrollment.user_id,
            course_id = %enrollment.course_id,
            "Certificate refunded"
        );

        self.notify_billing_support(enrollment, &certificate).await;

        let refunded = self
            .ctx
            .repos
            .order_items()
            .find_by_id(certificate.id)
            .await?
            .ok_or_else(|| DomainError::not_found("OrderItem", "id", certificate.id))?;
        Ok(Some(refunded))
    }

    async fn notify_billing_support(&self, enrollment: &Enrollment, certificate: &OrderItem) {
        let support = &self.ctx.shop.payment_support_email;
        let message = format!(
            "User {} has requested a refund on Order #{}.",
            enrollment.user_id, certificate.order_id
        );
        let notification = Notification {
            kind: NotificationKind::RefundRequested,
            recipients: vec![Recipient {
                kind: RecipientKind::BillingSupport,
                name: "Billing Support".to_string(),
                user_id: None,
                email: Some(support.clone()),
            }],
            subject: "[Refund] User-Requested Refund".to_string(),
            context: json!({
                "message": message,
                "order_id": certificate.order_id,
                "course_id": enrollment.course_id,
                "user_id": enrollment.user_id,
            }),
            attachment: None,
        };
        if let Err(e) = self.ctx.notifier.send(notification).await {
            metrics::counter!(
                "shoppingcart_notification_failures_total",
                "kind" => NotificationKind::RefundRequested.as_str()
            )
            .increment(1);
            warn!(order_id = certificate.order_id, error = %e, "Failed sending refund request to billing support");
        }
    }
}

// ── Tests ──────────────────────────────────────────────────────
