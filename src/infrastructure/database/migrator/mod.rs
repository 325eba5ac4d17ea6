//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_orders;
mod m20250101_000002_create_order_items;
mod m20250101_000003_create_course_annotations;
mod m20250101_000004_create_coupons;
mod m20250101_000005_create_coupon_redemptions;
mod m20250101_000006_create_invoices;
mod m20250101_000007_create_registration_codes;
mod m20250101_000008_create_registration_code_redemptions;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_orders::Migration),
            Box::new(m20250101_000002_create_order_items::Migration),
            Box::new(m20250101_000003_create_course_annotations::Migration),
            Box::new(m20250101_000004_create_coupons::Migration),
            Box::new(m20250101_000005_create_coupon_redemptions::Migration),
            Box::new(m20250101_000006_create_invoices::Migration),
            Box::new(m20250101_000007_create_registration_codes::Migration),
            Box::new(m20250101_000008_create_registration_code_redemptions::Migration),
        ]
    }
}
