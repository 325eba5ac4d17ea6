//! Create registration_code_redemptions table
//!
//! The unique index on the redeemed code is what stops a double spend.

use sea_orm_migration::prelude::*;

use super::m20250101_000007_create_registration_codes::RegistrationCodes;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(RegistrationCodeRedemptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RegistrationCodeRedemptions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RegistrationCodeRedemptions::OrderId).integer())
                    .col(
                        ColumnDef::new(RegistrationCodeRedemptions::RegistrationCodeId)
                            .integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RegistrationCodeRedemptions::RedeemedBy).integer().not_null())
                    .col(
                        ColumnDef::new(RegistrationCodeRedemptions::RedeemedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_code_redemptions_code")
                            .from(
                                RegistrationCodeRedemptions::Table,
                                RegistrationCodeRedemptions::RegistrationCodeId,
                            )
                            .to(RegistrationCodes::Table, RegistrationCodes::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_code_redemptions_code")
                    .table(RegistrationCodeRedemptions::Table)
                    .col(RegistrationCodeRedemptions::RegistrationCodeId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(RegistrationCodeRedemptions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum RegistrationCodeRedemptions {
    Table,
    Id,
    OrderId,
    RegistrationCodeId,
    RedeemedBy,
    RedeemedAt,
}
