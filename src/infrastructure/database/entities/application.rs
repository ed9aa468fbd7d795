//! Application entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "application")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(unique)]
    pub reference: String,

    pub prisoner_id: String,
    pub prison_id: i32,
    pub session_slot_id: i32,

    /// SOCIAL
    pub visit_type: String,
    /// OPEN, CLOSED
    pub restriction: String,

    pub reserved_slot: bool,
    pub completed: bool,

    /// STAFF, PUBLIC
    pub user_type: String,
    pub application_method: String,
    pub created_by: String,

    #[sea_orm(nullable)]
    pub visit_id: Option<i32>,

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
    #[sea_orm(
        belongs_to = "super::visit::Entity",
        from = "Column::VisitId",
        to = "super::visit::Column::Id"
    )]
    Visit,
    #[sea_orm(has_one = "super::application_contact::Entity")]
    Contact,
    #[sea_orm(has_many = "super::application_visitor::Entity")]
    Visitors,
    #[sea_orm(has_many = "super::application_support::Entity")]
    Support,
}

impl Related<super::session_slot::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SessionSlot.def()
    }
}

impl Related<super::visit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Visit.def()
    }
}

impl Related<super::application_contact::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contact.def()
    }
}

impl Related<super::application_visitor::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Visitors.def()
    }
}

impl Related<super::application_support::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Support.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
