//! Order entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "orders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub user_id: i32,
    pub currency: String,

    /// Order status: cart, paying, purchased, refunded
    pub status: String,

    #[sea_orm(nullable)]
    pub purchase_time: Option<DateTimeUtc>,
    #[sea_orm(nullable)]
    pub refunded_time: Option<DateTimeUtc>,

    // Billing snapshot
    pub bill_to_first: String,
    pub bill_to_last: String,
    pub bill_to_street1: String,
    pub bill_to_street2: String,
    pub bill_to_city: String,
    pub bill_to_state: String,
    pub bill_to_postalcode: String,
    pub bill_to_country: String,
    pub bill_to_ccnum: String,
    pub bill_to_cardtype: String,
    pub processor_reply_dump: String,

    /// personal or business
    pub order_type: String,

    // Bulk purchase billing
    #[sea_orm(nullable)]
    pub company_name: Option<String>,
    #[sea_orm(nullable)]
    pub company_contact_name: Option<String>,
    #[sea_orm(nullable)]
    pub company_contact_email: Option<String>,
    #[sea_orm(nullable)]
    pub recipient_name: Option<String>,
    #[sea_orm(nullable)]
    pub recipient_email: Option<String>,
    #[sea_orm(nullable)]
    pub customer_reference_number: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::order_item::Entity")]
    OrderItems,
}

impl Related<super::order_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::OrderItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
