//! Visit entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "visit")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub reference: String,

    pub prisoner_id: String,
    pub prison_id: i32,
    pub session_slot_id: i32,

    /// OPEN, CLOSED
    pub restriction: String,
    pub visit_type: String,
    pub visit_room: String,

    /// BOOKED, CANCELLED
    pub visit_status: String,

    #[sea_orm(nullable)]
    pub outcome_status: Option<String>,

    pub user_type: String,
    pub create_timestamp: DateTimeUtc,
    pub modify_timestamp: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::session_slot::Entity",
        from = "Column::SessionSlotId",
        to = "super::session_slot::Column::Id"
    )]
    SessionSlot,
    #[sea_orm(has_many = "super::application::Entity")]
    Applications,
    #[sea_orm(has_one = "super::visit_contact::Entity")]
    Contact,
    #[sea_orm(has_many = "super::visit_visitor::Entity")]
    Visitors,
    #[sea_orm(has_one = "super::visit_support::Entity")]
    Support,
    #[sea_orm(has_many = "super::visit_note::Entity")]
    Notes,
}

impl Related<super::session_slot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SessionSlot.def()
    }
}

impl Related<super::application::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Applications.def()
    }
}

impl Related<super::visit_contact::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contact.def()
    }
}

impl Related<super::visit_visitor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Visitors.def()
    }
}

impl Related<super::visit_support::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Support.def()
    }
}

impl Related<super::visit_note::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Notes.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
