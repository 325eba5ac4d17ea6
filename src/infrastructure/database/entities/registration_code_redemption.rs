//! Registration code redemption entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "registration_code_redemptions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// Empty for invoice codes redeemed outside a cart
    #[sea_orm(nullable)]
    pub order_id: Option<i32>,

    /// Unique: a code is redeemed at most once
    #[sea_orm(unique)]
    pub registration_code_id: i32,

    pub redeemed_by: i32,
    pub redeemed_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::registration_code::Entity",
        from = "Column::RegistrationCodeId",
        to = "super::registration_code::Column::Id"
    )]
    RegistrationCode,
}

impl Related<super::registration_code::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::RegistrationCode.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
