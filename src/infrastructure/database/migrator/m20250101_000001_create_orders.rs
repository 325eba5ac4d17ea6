//! Create orders table
//!
//! One row per cart; the row becomes the receipt once purchased.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Orders::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Orders::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Orders::UserId).integer().not_null())
                    .col(ColumnDef::new(Orders::Currency).string_len(8).not_null().default("usd"))
                    .col(ColumnDef::new(Orders::Status).string_len(32).not_null().default("cart"))
                    .col(ColumnDef::new(Orders::PurchaseTime).timestamp_with_time_zone())
                    .col(ColumnDef::new(Orders::RefundedTime).timestamp_with_time_zone())
                    .col(ColumnDef::new(Orders::BillToFirst).string().not_null().default(""))
                    .col(ColumnDef::new(Orders::BillToLast).string().not_null().default(""))
                    .col(ColumnDef::new(Orders::BillToStreet1).string().not_null().default(""))
                    .col(ColumnDef::new(Orders::BillToStreet2).string().not_null().default(""))
                    .col(ColumnDef::new(Orders::BillToCity).string().not_null().default(""))
                    .col(ColumnDef::new(Orders::BillToState).string().not_null().default(""))
                    .col(ColumnDef::new(Orders::BillToPostalcode).string().not_null().default(""))
                    .col(ColumnDef::new(Orders::BillToCountry).string().not_null().default(""))
                    .col(ColumnDef::new(Orders::BillToCcnum).string_len(8).not_null().default(""))
                    .col(ColumnDef::new(Orders::BillToCardtype).string_len(32).not_null().default(""))
                    .col(ColumnDef::new(Orders::ProcessorReplyDump).text().not_null().default(""))
                    .col(
                        ColumnDef::new(Orders::OrderType)
                            .string_len(32)
                            .not_null()
                            .default("personal"),
                    )
                    .col(ColumnDef::new(Orders::CompanyName).string())
                    .col(ColumnDef::new(Orders::CompanyContactName).string())
                    .col(ColumnDef::new(Orders::CompanyContactEmail).string())
                    .col(ColumnDef::new(Orders::RecipientName).string())
                    .col(ColumnDef::new(Orders::RecipientEmail).string())
                    .col(ColumnDef::new(Orders::CustomerReferenceNumber).string_len(63))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_orders_user_status")
                    .table(Orders::Table)
                    .col(Orders::UserId)
                    .col(Orders::Status)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Orders::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Orders {
    Table,
    Id,
    UserId,
    Currency,
    Status,
    PurchaseTime,
    RefundedTime,
    BillToFirst,
    BillToLast,
    BillToStreet1,
    BillToStreet2,
    BillToCity,
    BillToState,
    BillToPostalcode,
    BillToCountry,
    BillToCcnum,
    BillToCardtype,
    ProcessorReplyDump,
    OrderType,
    CompanyName,
    CompanyContactName,
    CompanyContactEmail,
    RecipientName,
    RecipientEmail,
    CustomerReferenceNumber,
}
