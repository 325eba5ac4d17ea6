//! Create registration_codes table

use sea_orm_migration::prelude::*;

use super::m20250101_000006_create_invoices::Invoices;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RegistrationCodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RegistrationCodes::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(RegistrationCodes::Code)
                            .string_len(32)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(RegistrationCodes::CourseId).string_len(255).not_null())
                    .col(ColumnDef::new(RegistrationCodes::CreatedBy).integer().not_null())
                    .col(
                        ColumnDef::new(RegistrationCodes::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RegistrationCodes::OrderId).integer())
                    .col(ColumnDef::new(RegistrationCodes::InvoiceId).integer())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_registration_codes_invoice")
                            .from(RegistrationCodes::Table, RegistrationCodes::InvoiceId)
                            .to(Invoices::Table, Invoices::Id)
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_registration_codes_order_course")
                    .table(RegistrationCodes::Table)
                    .col(RegistrationCodes::OrderId)
                    .col(RegistrationCodes::CourseId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RegistrationCodes::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum RegistrationCodes {
    Table,
    Id,
    Code,
    CourseId,
    CreatedBy,
    CreatedAt,
    OrderId,
    InvoiceId,
}
