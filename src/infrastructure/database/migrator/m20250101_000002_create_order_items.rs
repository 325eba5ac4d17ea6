//! Create order_items table
//!
//! All item variants share this table, discriminated by `kind`.

use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_orders::Orders;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OrderItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OrderItems::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OrderItems::OrderId).integer().not_null())
                    .col(ColumnDef::new(OrderItems::UserId).integer().not_null())
                    .col(ColumnDef::new(OrderItems::Status).string_len(32).not_null().default("cart"))
                    .col(ColumnDef::new(OrderItems::Kind).string_len(32).not_null())
                    .col(ColumnDef::new(OrderItems::Qty).integer().not_null().default(1))
                    .col(ColumnDef::new(OrderItems::UnitCost).big_integer().not_null().default(0))
                    .col(ColumnDef::new(OrderItems::ListPrice).big_integer())
                    .col(ColumnDef::new(OrderItems::ServiceFee).big_integer().not_null().default(0))
                    .col(
                        ColumnDef::new(OrderItems::LineDesc)
                            .string_len(1024)
                            .not_null()
                            .default("Misc. Item"),
                    )
                    .col(ColumnDef::new(OrderItems::Currency).string_len(8).not_null().default("usd"))
                    .col(ColumnDef::new(OrderItems::FulfilledTime).timestamp_with_time_zone())
                    .col(ColumnDef::new(OrderItems::RefundRequestedTime).timestamp_with_time_zone())
                    .col(ColumnDef::new(OrderItems::ReportComments).text().not_null().default(""))
                    .col(ColumnDef::new(OrderItems::CourseId).string_len(255))
                    .col(ColumnDef::new(OrderItems::Mode).string_len(100))
                    .col(ColumnDef::new(OrderItems::EnrollmentId).integer())
                    .col(ColumnDef::new(OrderItems::DonationType).string_len(32))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_order_items_order")
                            .from(OrderItems::Table, OrderItems::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_order_items_order")
                    .table(OrderItems::Table)
                    .col(OrderItems::OrderId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_order_items_course_kind_status")
                    .table(OrderItems::Table)
                    .col(OrderItems::CourseId)
                    .col(OrderItems::Kind)
                    .col(OrderItems::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OrderItems::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum OrderItems {
    Table,
    Id,
    OrderId,
    UserId,
    Status,
    Kind,
    Qty,
    UnitCost,
    ListPrice,
    ServiceFee,
    LineDesc,
    Currency,
    FulfilledTime,
    RefundRequestedTime,
    ReportComments,
    CourseId,
    Mode,
    EnrollmentId,
    DonationType,
}
