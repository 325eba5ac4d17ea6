//! Per-course finance queries
//!
//! Served by the reporting repository, which may read from a replica.

use rust_decimal::Decimal;
use tracing::info;

use crate::application::context::ShopContext;
use crate::domain::order::OrderStatus;
use crate::domain::order_item::ItemKindTag;
use crate::domain::ports::VERIFIED_MODE_SLUG;
use crate::domain::reporting::MonetaryField;
use crate::domain::{DomainError, DomainResult};

pub struct ReportingService {
    ctx: ShopContext,
}

impl ReportingService {
    pub fn new(ctx: ShopContext) -> Self {
        Self { ctx }
    }

    /// Money a course made through purchased seats or bundles
    pub async fn total_amount_of_purchased_items(&self, kind: ItemKindTag, course_id: &str) -> DomainResult<Decimal> {
        ensure_seat_or_bundle(kind)?;
        self.ctx
            .repos
            .reporting()
            .purchased_line_cost_total(kind, course_id)
            .await
    }

    pub async fn verified_certificates_count(&self, course_id: &str, status: OrderStatus) -> DomainResult<u64> {
        self.ctx
            .repos
            .reporting()
            .certificate_count(course_id, VERIFIED_MODE_SLUG, status)
            .await
    }

    /// e.g. `Refunded` + `UnitCost` is the money refunded for the course
    pub async fn verified_certificates_monetary_field_sum(
        &self,
        course_id: &str,
        status: OrderStatus,
        field: MonetaryField,
    ) -> DomainResult<Decimal> {
        self.ctx
            .repos
            .reporting()
            .certificate_field_sum(course_id, VERIFIED_MODE_SLUG, status, field)
            .await
    }

    /// Purchased verified certificates paid above the course's minimum usd price
    pub async fn verified_certificates_contributing_more_than_minimum(&self, course_id: &str) -> DomainResult<u64> {
        let minimum = self
            .ctx
            .catalog
            .get_course(course_id)
            .await?
            .map(|course| course.min_price_for(VERIFIED_MODE_SLUG, "usd"))
            .unwrap_or(Decimal::ZERO);
        self.ctx
            .repos
            .reporting()
            .certificates_above(course_id, VERIFIED_MODE_SLUG, OrderStatus::Purchased, minimum)
            .await
    }

    /// Free-text note stamped on new seat or bundle lines for the course
    pub async fn set_course_annotation(&self, kind: ItemKindTag, course_id: &str, annotation: &str) -> DomainResult<()> {
        ensure_seat_or_bundle(kind)?;
        self.ctx
            .repos
            .annotations()
            .set_annotation(kind, course_id, annotation)
            .await?;
        info!(course_id, kind = %kind, "Course annotation set");
        Ok(())
    }
}

fn ensure_seat_or_bundle(kind: ItemKindTag) -> DomainResult<()> {
    match kind {
        ItemKindTag::CourseSeat | ItemKindTag::CodeBundle => Ok(()),
        other => Err(DomainError::Validation(format!("No per-course report for {} items", other))),
    }
}

// ── Tests ──────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::items::PriceRequest;
    use crate::test_support::{sample_billing, TestShop, COURSE_A};

    #[tokio::test]
    async fn seat_and_bundle_totals_only_count_purchases() {
        let shop = TestShop::new();
        let reports = shop.reporting();

        let mut paid = shop.cart(1).await;
        shop.cart_service()
            .add_course_seat(&mut paid, COURSE_A, &PriceRequest::mode("verified"))
            .await
            .unwrap();
        shop.checkout().purchase(paid.id, sample_billing()).await.unwrap();

        let mut open = shop.cart(2).await;
        shop.cart_service()
            .add_course_seat(&mut open, COURSE_A, &PriceRequest::mode("verified"))
            .await
            .unwrap();

        let mut bulk = shop.cart(3).await;
        shop.cart_service()
            .add_code_bundle(&mut bulk, COURSE_A, 3, &PriceRequest::default().with_cost(Decimal::new(2000, 2)))
            .await
            .unwrap();
        shop.checkout().purchase(bulk.id, sample_billing()).await.unwrap();

        assert_eq!(
            reports
                .total_amount_of_purchased_items(ItemKindTag::CourseSeat, COURSE_A)
                .await
                .unwrap(),
            Decimal::new(10000, 2)
        );
        assert_eq!(
            reports
                .total_amount_of_purchased_items(ItemKindTag::CodeBundle, COURSE_A)
                .await
                .unwrap(),
            Decimal::new(6000, 2)
        );
        assert!(reports
            .total_amount_of_purchased_items(ItemKindTag::Donation, COURSE_A)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn verified_certificate_figures() {
        let shop = TestShop::new();
        let reports = shop.reporting();
        for (user, cost) in [(1, Decimal::new(4900, 2)), (2, Decimal::new(12500, 2))] {
            let mut cart = shop.cart(user).await;
            shop.cart_service()
                .add_certificate(&mut cart, COURSE_A, cost, "verified", None)
                .await
                .unwrap();
            shop.checkout().purchase(cart.id, sample_billing()).await.unwrap();
        }

        assert_eq!(
            reports.verified_certificates_count(COURSE_A, OrderStatus::Purchased).await.unwrap(),
            2
        );
        assert_eq!(
            reports.verified_certificates_count(COURSE_A, OrderStatus::Refunded).await.unwrap(),
            0
        );
        assert_eq!(
            reports
                .verified_certificates_monetary_field_sum(COURSE_A, OrderStatus::Purchased, MonetaryField::UnitCost)
                .await
                .unwrap(),
            Decimal::new(17400, 2)
        );
        assert_eq!(
            reports
                .verified_certificates_monetary_field_sum(COURSE_A, OrderStatus::Purchased, MonetaryField::ListPrice)
                .await
                .unwrap(),
            Decimal::ZERO
        );
        // verified minimum for COURSE_A is 100.00 usd
        assert_eq!(
            reports
                .verified_certificates_contributing_more_than_minimum(COURSE_A)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn annotation_reaches_new_lines() {
        let shop = TestShop::new();
        shop.reporting()
            .set_course_annotation(ItemKindTag::CodeBundle, COURSE_A, "ACCT-9")
            .await
            .unwrap();
        let mut cart = shop.cart(1).await;
        let item = shop
            .cart_service()
            .add_code_bundle(&mut cart, COURSE_A, 2, &PriceRequest::default())
            .await
            .unwrap();
        assert_eq!(item.report_comments, "ACCT-9");

        assert!(shop
            .reporting()
            .set_course_annotation(ItemKindTag::Certificate, COURSE_A, "x")
            .await
            .is_err());
    }
}
