//! Create coupons table

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Coupons::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Coupons::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Coupons::Code).string_len(32).not_null())
                    .col(ColumnDef::new(Coupons::Description).string_len(255))
                    .col(ColumnDef::new(Coupons::CourseId).string_len(255).not_null())
                    .col(ColumnDef::new(Coupons::PercentageDiscount).integer().not_null().default(0))
                    .col(ColumnDef::new(Coupons::CreatedBy).integer().not_null())
                    .col(ColumnDef::new(Coupons::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Coupons::IsActive).boolean().not_null().default(true))
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_coupons_code")
                    .table(Coupons::Table)
                    .col(Coupons::Code)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Coupons::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum Coupons {
    Table,
    Id,
    Code,
    Description,
    CourseId,
    PercentageDiscount,
    CreatedBy,
    CreatedAt,
    IsActive,
}
