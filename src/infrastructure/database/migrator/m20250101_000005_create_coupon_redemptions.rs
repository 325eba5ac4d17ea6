//! Create coupon_redemptions table

use sea_orm_migration::prelude::*;

use super::m20250101_000001_create_orders::Orders;
use super::m20250101_000004_create_coupons::Coupons;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(CouponRedemptions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(CouponRedemptions::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(CouponRedemptions::OrderId).integer().not_null())
                    .col(ColumnDef::new(CouponRedemptions::UserId).integer().not_null())
                    .col(ColumnDef::new(CouponRedemptions::CouponId).integer().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_coupon_redemptions_order")
                            .from(CouponRedemptions::Table, CouponRedemptions::OrderId)
                            .to(Orders::Table, Orders::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_coupon_redemptions_coupon")
                            .from(CouponRedemptions::Table, CouponRedemptions::CouponId)
                            .to(Coupons::Table, Coupons::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_coupon_redemptions_order_user")
                    .table(CouponRedemptions::Table)
                    .col(CouponRedemptions::OrderId)
                    .col(CouponRedemptions::UserId)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(CouponRedemptions::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
pub enum CouponRedemptions {
    Table,
    Id,
    OrderId,
    UserId,
    CouponId,
}
