//! Rating entity
//!
//! One row per (artist, person) pair; the composite primary key is the
//! schema-level enforcement of the at-most-one-rating invariant.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ratings")]
pub struct Model {
    /// The artist being rated.
    #[sea_orm(primary_key, auto_increment = false)]
    pub artist_id: Uuid,

    /// The person who rates.
    #[sea_orm(primary_key, auto_increment = false)]
    pub person_id: Uuid,

    /// The numeric value of the rating.
    #[sea_orm(column_type = "Double")]
    pub value: f64,

    pub created_at: DateTimeWithTimeZone,

    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::artist::Entity",
        from = "Column::ArtistId",
        to = "super::artist::Column::Id",
        on_update = "Restrict",
        on_delete = "Cascade"
    )]
    Artist,

    #[sea_orm(
        belongs_to = "super::person::Entity",
        from = "Column::PersonId",
        to = "super::person::Column::Id",
        on_update = "Restrict",
        on_delete = "Cascade"
    )]
    Person,
}

impl Related<super::artist::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Artist.def()
    }
}

impl Related<super::person::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Person.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
