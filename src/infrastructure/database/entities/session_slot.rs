//! SessionSlot entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "session_slot")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub reference: String,

    /// Null for ad-hoc or migrated slots
    #[sea_orm(nullable)]
    pub session_template_reference: Option<String>,

    /// Template reference, or empty for ad-hoc slots; part of the occurrence key
    pub template_key: String,

    pub prison_id: i32,
    pub slot_date: Date,
    pub slot_start: DateTimeUtc,
    pub slot_end: DateTimeUtc,
    pub create_timestamp: DateTimeUtc,

    /// Touched by every admission check; serializes writers per slot
    pub modify_timestamp: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::application::Entity")]
    Applications,
    #[sea_orm(has_many = "super::visit::Entity")]
    Visits,
}

impl Related<super::application::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Applications.def()
    }
}

impl Related<super::visit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Visits.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
