//! Invoice entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invoices")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub company_name: String,
    pub company_contact_name: String,
    pub company_contact_email: String,
    pub recipient_name: String,
    pub recipient_email: String,

    pub address_line_1: String,
    #[sea_orm(nullable)]
    pub address_line_2: Option<String>,
    #[sea_orm(nullable)]
    pub address_line_3: Option<String>,
    #[sea_orm(nullable)]
    pub city: Option<String>,
    #[sea_orm(nullable)]
    pub state: Option<String>,
    #[sea_orm(nullable)]
    pub zip: Option<String>,
    #[sea_orm(nullable)]
    pub country: Option<String>,

    pub course_id: String,

    /// Cents
    pub total_amount: i64,

    #[sea_orm(nullable)]
    pub internal_reference: Option<String>,
    #[sea_orm(nullable)]
    pub customer_reference_number: Option<String>,

    pub is_valid: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::registration_code::Entity")]
    RegistrationCodes,
}

impl Related<super::registration_code::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RegistrationCodes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
