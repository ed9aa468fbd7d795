//! SeaORM persistence for session slots

use chrono::{DateTime, NaiveDate, Utc};
use log::debug;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter, Set,
    SqlErr,
};

use crate::domain::{DomainResult, SessionSlot};
use crate::infrastructure::database::entities::session_slot;
use crate::shared::errors::db_err;

/// Occurrence key of a slot plus the reference to give it if created.
#[derive(Debug, Clone)]
pub struct NewSessionSlot {
    pub reference: String,
    pub session_template_reference: Option<String>,
    pub prison_id: i32,
    pub slot_date: NaiveDate,
    pub slot_start: DateTime<Utc>,
    pub slot_end: DateTime<Utc>,
}

/// Works against the pool or an open transaction.
pub struct SeaOrmSessionSlotRepository<'c, C> {
    conn: &'c C,
}

/// Non-null stand-in for the template reference in the occurrence key.
fn template_key(session_template_reference: Option<&str>) -> String {
    session_template_reference.unwrap_or_default().to_string()
}

fn model_to_domain(m: session_slot::Model) -> SessionSlot {
    SessionSlot {
        id: m.id,
        reference: m.reference,
        session_template_reference: m.session_template_reference,
        prison_id: m.prison_id,
        slot_date: m.slot_date,
        slot_start: m.slot_start,
        slot_end: m.slot_end,
    }
}

impl<'c, C: ConnectionTrait> SeaOrmSessionSlotRepository<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    pub async fn find_by_id(&self, id: i32) -> DomainResult<Option<SessionSlot>> {
        let model = session_slot::Entity::find_by_id(id)
            .one(self.conn)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    pub async fn find_occurrence(
        &self,
        prison_id: i32,
        session_template_reference: Option<&str>,
        slot_start: DateTime<Utc>,
        slot_end: DateTime<Utc>,
    ) -> DomainResult<Option<SessionSlot>> {
        let model = session_slot::Entity::find()
            .filter(session_slot::Column::PrisonId.eq(prison_id))
            .filter(
                session_slot::Column::TemplateKey.eq(template_key(session_template_reference)),
            )
            .filter(session_slot::Column::SlotStart.eq(slot_start))
            .filter(session_slot::Column::SlotEnd.eq(slot_end))
            .one(self.conn)
            .await
            .map_err(db_err)?;
        Ok(model.map(model_to_domain))
    }

    /// Insert unless the occurrence already exists. Returns `false` when
    /// another writer got there first.
    pub async fn insert_if_absent(&self, slot: NewSessionSlot) -> DomainResult<bool> {
        debug!(
            "Inserting session slot {} for prison {} at {}",
            slot.reference, slot.prison_id, slot.slot_start
        );
        let now = Utc::now();
        let model = session_slot::ActiveModel {
            id: NotSet,
            reference: Set(slot.reference),
            template_key: Set(template_key(slot.session_template_reference.as_deref())),
            session_template_reference: Set(slot.session_template_reference),
            prison_id: Set(slot.prison_id),
            slot_date: Set(slot.slot_date),
            slot_start: Set(slot.slot_start),
            slot_end: Set(slot.slot_end),
            create_timestamp: Set(now),
            modify_timestamp: Set(now),
        };

        let result = session_slot::Entity::insert(model)
            .on_conflict(
                OnConflict::columns([
                    session_slot::Column::PrisonId,
                    session_slot::Column::TemplateKey,
                    session_slot::Column::SlotStart,
                    session_slot::Column::SlotEnd,
                ])
                .do_nothing()
                .to_owned(),
            )
            .exec(self.conn)
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(DbErr::RecordNotInserted) => Ok(false),
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                Ok(false)
            }
            Err(e) => Err(db_err(e)),
        }
    }

    /// Take the slot's admission lock for the rest of the transaction.
    pub async fn lock(&self, id: i32) -> DomainResult<()> {
        debug!("Locking session slot {}", id);
        session_slot::Entity::update_many()
            .col_expr(
                session_slot::Column::ModifyTimestamp,
                sea_orm::sea_query::Expr::value(Utc::now()),
            )
            .filter(session_slot::Column::Id.eq(id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
