//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::coupon::{CouponRedemptionRepository, CouponRepository};
use crate::domain::order::OrderRepository;
use crate::domain::order_item::{CourseAnnotationRepository, OrderItemRepository};
use crate::domain::registration_code::{CodeRedemptionRepository, InvoiceRepository, RegistrationCodeRepository};
use crate::domain::reporting::ReportingRepository;
use crate::domain::repositories::RepositoryProvider;

use super::coupon_repository::{SeaOrmCouponRedemptionRepository, SeaOrmCouponRepository};
use super::order_item_repository::{SeaOrmCourseAnnotationRepository, SeaOrmOrderItemRepository};
use super::order_repository::SeaOrmOrderRepository;
use super::registration_code_repository::{
    SeaOrmCodeRedemptionRepository, SeaOrmInvoiceRepository, SeaOrmRegistrationCodeRepository,
};
use super::reporting_repository::SeaOrmReportingRepository;

/// Unified repository provider backed by SeaORM.
///
/// Everything runs on the primary pool except reporting, which uses the
/// replica when one is given.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(primary, Some(replica));
/// let cart = repos.orders().find_newest_cart(user_id).await?;
/// let total = repos.reporting().purchased_line_cost_total(kind, course_id).await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    orders: SeaOrmOrderRepository,
    order_items: SeaOrmOrderItemRepository,
    annotations: SeaOrmCourseAnnotationRepository,
    coupons: SeaOrmCouponRepository,
    coupon_redemptions: SeaOrmCouponRedemptionRepository,
    registration_codes: SeaOrmRegistrationCodeRepository,
    code_redemptions: SeaOrmCodeRedemptionRepository,
    invoices: SeaOrmInvoiceRepository,
    reporting: SeaOrmReportingRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(primary: DatabaseConnection, replica: Option<DatabaseConnection>) -> Self {
        let reporting_db = replica.unwrap_or_else(|| primary.clone());
        Self {
            orders: SeaOrmOrderRepository::new(primary.clone()),
            order_items: SeaOrmOrderItemRepository::new(primary.clone()),
            annotations: SeaOrmCourseAnnotationRepository::new(primary.clone()),
            coupons: SeaOrmCouponRepository::new(primary.clone()),
            coupon_redemptions: SeaOrmCouponRedemptionRepository::new(primary.clone()),
            registration_codes: SeaOrmRegistrationCodeRepository::new(primary.clone()),
            code_redemptions: SeaOrmCodeRedemptionRepository::new(primary.clone()),
            invoices: SeaOrmInvoiceRepository::new(primary),
            reporting: SeaOrmReportingRepository::new(reporting_db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn orders(&self) -> &dyn OrderRepository {
        &self.orders
    }

    fn order_items(&self) -> &dyn OrderItemRepository {
        &self.order_items
    }

    fn annotations(&self) -> &dyn CourseAnnotationRepository {
        &self.annotations
    }

    fn coupons(&self) -> &dyn CouponRepository {
        &self.coupons
    }

    fn coupon_redemptions(&self) -> &dyn CouponRedemptionRepository {
        &self.coupon_redemptions
    }

    fn registration_codes(&self) -> &dyn RegistrationCodeRepository {
        &self.registration_codes
    }

    fn code_redemptions(&self) -> &dyn CodeRedemptionRepository {
        &self.code_redemptions
    }

    fn invoices(&self) -> &dyn InvoiceRepository {
        &self.invoices
    }

    fn reporting(&self) -> &dyn ReportingRepository {
        &self.reporting
    }
}

// ── Tests ──────────────────────────────────────────────────────
