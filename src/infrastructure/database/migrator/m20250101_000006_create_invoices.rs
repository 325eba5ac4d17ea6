//! Create invoices table
//!
//! Bulk code sales settled outside the card processor.

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Invoices::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Invoices::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Invoices::CompanyName).string().not_null())
                    .col(ColumnDef::new(Invoices::CompanyContactName).string().not_null())
                    .col(ColumnDef::new(Invoices::CompanyContactEmail).string().not_null())
                    .col(ColumnDef::new(Invoices::RecipientName).string().not_null())
                    .col(ColumnDef::new(Invoices::RecipientEmail).string().not_null())
                    .col(ColumnDef::new(Invoices::AddressLine1).string().not_null())
                    .col(ColumnDef::new(Invoices::AddressLine2).string())
                    .col(ColumnDef::new(Invoices::AddressLine3).string())
                    .col(ColumnDef::new(Invoices::City).string())
                    .col(ColumnDef::new(Invoices::State).string())
                    .col(ColumnDef::new(Invoices::Zip).string_len(15))
                    .col(ColumnDef::new(Invoices::Country).string_len(64))
                    .col(ColumnDef::new(Invoices::CourseId).string_len(255).not_null())
                    .col(ColumnDef::new(Invoices::TotalAmount).big_integer().not_null().default(0))
                    .col(ColumnDef::new(Invoices::InternalReference).string())
                    .col(ColumnDef::new(Invoices::CustomerReferenceNumber).string_len(63))
                    .col(ColumnDef::new(Invoices::IsValid).boolean().not_null().default(true))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Invoices::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Invoices {
    Table,
    Id,
    CompanyName,
    CompanyContactName,
    CompanyContactEmail,
    RecipientName,
    RecipientEmail,
    #[iden = "address_line_1"]
    AddressLine1,
    #[iden = "address_line_2"]
    AddressLine2,
    #[iden = "address_line_3"]
    AddressLine3,
    City,
    State,
    Zip,
    Country,
    CourseId,
    TotalAmount,
    InternalReference,
    CustomerReferenceNumber,
    IsValid,
}
