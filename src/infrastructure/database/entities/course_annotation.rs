//! Course annotation entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "course_annotations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    /// course_seat or code_bundle
    pub kind: String,
    pub course_id: String,
    pub annotation: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
