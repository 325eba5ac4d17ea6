//! Repository traits for the domain layer
//!
//! Contains:
//! - `RepositoryProvider`: unified access to all per-aggregate repositories
//! - `DomainResult`: standard result type for domain operations

use super::coupon::{CouponRedemptionRepository, CouponRepository};
use super::order::OrderRepository;
use super::order_item::{CourseAnnotationRepository, OrderItemRepository};
use super::registration_code::{
    CodeRedemptionRepository, InvoiceRepository, RegistrationCodeRepository,
};
use super::reporting::ReportingRepository;
use crate::shared::errors::DomainError;

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;

// ── RepositoryProvider ──────────────────────────────────────────

/// Provides access to all domain repositories.
///
/// Consumers request only the repository they need:
///
/// ```ignore
/// async fn handle(repos: &dyn RepositoryProvider) {
///     let cart = repos.orders().find_newest_cart(42).await?;
///     let items = repos.order_items().find_by_order(cart.id).await?;
/// }
/// ```
pub trait RepositoryProvider: Send + Sync {
    fn orders(&self) -> &dyn OrderRepository;
    fn order_items(&self) -> &dyn OrderItemRepository;
    fn annotations(&self) -> &dyn CourseAnnotationRepository;
    fn coupons(&self) -> &dyn CouponRepository;
    fn coupon_redemptions(&self) -> &dyn CouponRedemptionRepository;
    fn registration_codes(&self) -> &dyn RegistrationCodeRepository;
    fn code_redemptions(&self) -> &dyn CodeRedemptionRepository;
    fn invoices(&self) -> &dyn InvoiceRepository;
    /// May be backed by a read replica
    fn reporting(&self) -> &dyn ReportingRepository;
}
