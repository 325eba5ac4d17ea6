//! SeaORM implementation of ReportingRepository
//!
//! Bound to the replica connection when one is configured.

use async_trait::async_trait;
use rust_decimal::{Decimal, RoundingStrategy};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter, Select};

use super::db_err;
use crate::domain::order::OrderStatus;
use crate::domain::order_item::ItemKindTag;
use crate::domain::reporting::{MonetaryField, ReportingRepository};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::order_item;
use crate::shared::money::{from_cents, to_cents, MONEY_DP};

pub struct SeaOrmReportingRepository {
    db: DatabaseConnection,
}

impl SeaOrmReportingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    async fn rows(&self, query: Select<order_item::Entity>) -> DomainResult<Vec<order_item::Model>> {
        query.all(&self.db).await.map_err(db_err)
    }
}

fn certificates(course_id: &str, mode: &str, status: OrderStatus) -> Select<order_item::Entity> {
    order_item::Entity::find()
        .filter(order_item::Column::Kind.eq(ItemKindTag::Certificate.as_str()))
        .filter(order_item::Column::CourseId.eq(course_id))
        .filter(order_item::Column::Mode.eq(mode))
        .filter(order_item::Column::Status.eq(status.as_str()))
}

fn field_cents(m: &order_item::Model, field: MonetaryField) -> i64 {
    match field {
        MonetaryField::UnitCost => m.unit_cost,
        MonetaryField::ListPrice => m.list_price.unwrap_or(0),
        MonetaryField::ServiceFee => m.service_fee,
    }
}

#[async_trait]
impl ReportingRepository for SeaOrmReportingRepository {
    async fn purchased_line_cost_total(&self, kind: ItemKindTag, course_id: &str) -> DomainResult<Decimal> {
        let rows = self
            .rows(
                order_item::Entity::find()
                    .filter(order_item::Column::Kind.eq(kind.as_str()))
                    .filter(order_item::Column::CourseId.eq(course_id))
                    .filter(order_item::Column::Status.eq(OrderStatus::Purchased.as_str())),
            )
            .await?;
        Ok(rows
            .iter()
            .map(|m| Decimal::from(m.qty) * from_cents(m.unit_cost))
            .sum())
    }

    async fn certificate_count(&self, course_id: &str, mode: &str, status: OrderStatus) -> DomainResult<u64> {
        certificates(course_id, mode, status)
            .count(&self.db)
            .await
            .map_err(db_err)
    }

    async fn certificate_field_sum(
        &self,
        course_id: &str,
        mode: &str,
        status: OrderStatus,
        field: MonetaryField,
    ) -> DomainResult<Decimal> {
        let rows = self.rows(certificates(course_id, mode, status)).await?;
        let cents: i64 = rows.iter().map(|m| field_cents(m, field)).sum();
        Ok(from_cents(cents))
    }

    async fn certificates_above(
        &self,
        course_id: &str,
        mode: &str,
        status: OrderStatus,
        min_unit_cost: Decimal,
    ) -> DomainResult<u64> {
        // Whole cents above the floored minimum are exactly the amounts above it
        let floor = to_cents(min_unit_cost.round_dp_with_strategy(MONEY_DP, RoundingStrategy::ToNegativeInfinity))?;
        certificates(course_id, mode, status)
            .filter(order_item::Column::UnitCost.gt(floor))
            .count(&self.db)
            .await
            .map_err(db_err)
    }
}
