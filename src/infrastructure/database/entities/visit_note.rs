//! Visit note entity

use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "visit_note")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub visit_id: i32,

    /// VISITOR_CONCERN, VISIT_OUTCOMES, VISIT_COMMENT, STATUS_CHANGED_REASON
    pub note_type: String,

    pub text: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::visit::Entity",
        from = "Column::VisitId",
        to = "super::visit::Column::Id"
    )]
    Visit,
}

impl Related<super::visit::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Visit.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
