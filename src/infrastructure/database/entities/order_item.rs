//! Order item entity
//!
//! One table for every item variant; `kind` selects which of the variant
//! columns are meaningful.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "order_items")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub order_id: i32,
    pub user_id: i32,

    /// Mirrors the order status
    pub status: String,

    /// course_seat, code_bundle, certificate, donation
    pub kind: String,

    pub qty: i32,

    // Money in cents
    pub unit_cost: i64,
    #[sea_orm(nullable)]
    pub list_price: Option<i64>,
    pub service_fee: i64,

    pub line_desc: String,
    pub currency: String,

    #[sea_orm(nullable)]
    pub fulfilled_time: Option<DateTimeUtc>,
    #[sea_orm(nullable)]
    pub refund_requested_time: Option<DateTimeUtc>,

    pub report_comments: String,

    // Variant columns
    #[sea_orm(nullable)]
    pub course_id: Option<String>,
    #[sea_orm(nullable)]
    pub mode: Option<String>,
    #[sea_orm(nullable)]
    pub enrollment_id: Option<i32>,
    #[sea_orm(nullable)]
    pub donation_type: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::order::Entity",
        from = "Column::OrderId",
        to = "super::order::Column::Id"
    )]
    Order,
}

impl Related<super::order::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Order.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
