//! Reporting repository interface

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::order::OrderStatus;
use crate::domain::order_item::ItemKindTag;
use crate::domain::DomainResult;

/// Monetary column of an order item that can be aggregated
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonetaryField {
    UnitCost,
    ListPrice,
    ServiceFee,
}

impl MonetaryField {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnitCost => "unit_cost",
            Self::ListPrice => "list_price",
            Self::ServiceFee => "service_fee",
        }
    }
}

#[async_trait]
pub trait ReportingRepository: Send + Sync {
    /// Sum of `qty * unit_cost` over purchased items of `kind` for the course
    async fn purchased_line_cost_total(&self, kind: ItemKindTag, course_id: &str) -> DomainResult<Decimal>;

    async fn certificate_count(&self, course_id: &str, mode: &str, status: OrderStatus) -> DomainResult<u64>;

    /// Sum of `field` over certificates; missing list prices count as zero
    async fn certificate_field_sum(
        &self,
        course_id: &str,
        mode: &str,
        status: OrderStatus,
        field: MonetaryField,
    ) -> DomainResult<Decimal>;

    /// Certificates whose unit cost is strictly above `min_unit_cost`
    async fn certificates_above(
        &self,
        course_id: &str,
        mode: &str,
        status: OrderStatus,
        min_unit_cost: Decimal,
    ) -> DomainResult<u64>;
}
