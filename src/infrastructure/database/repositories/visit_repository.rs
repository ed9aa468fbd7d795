//! SeaORM persistence for visits and their owned children

use chrono::NaiveDate;
use log::debug;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, RelationTrait, Set,
};
use sea_orm::sea_query::JoinType;

use crate::domain::{
    Contact, DomainResult, Visit, VisitNote, VisitRestriction, VisitStatus, Visitor,
};
use crate::infrastructure::database::entities::{
    session_slot, visit, visit_contact, visit_note, visit_support, visit_visitor,
};
use crate::shared::errors::db_err;

pub struct SeaOrmVisitRepository<'c, C> {
    conn: &'c C,
}

fn model_to_domain(
    m: visit::Model,
    contact: Option<visit_contact::Model>,
    visitors: Vec<visit_visitor::Model>,
    support: Option<visit_support::Model>,
    notes: Vec<visit_note::Model>,
) -> DomainResult<Visit> {
    let notes = notes
        .into_iter()
        .map(|n| {
            Ok(VisitNote {
                note_type: n.note_type.parse()?,
                text: n.text,
            })
        })
        .collect::<DomainResult<Vec<_>>>()?;

    Ok(Visit {
        id: m.id,
        reference: m.reference,
        prisoner_id: m.prisoner_id,
        prison_id: m.prison_id,
        session_slot_id: m.session_slot_id,
        restriction: m.restriction.parse()?,
        visit_type: m.visit_type.parse()?,
        visit_room: m.visit_room,
        status: m.visit_status.parse()?,
        outcome_status: m.outcome_status.map(|s| s.parse()).transpose()?,
        user_type: m.user_type.parse()?,
        contact: contact.map(|c| Contact {
            name: c.name,
            telephone: c.telephone,
            email: c.email,
        }),
        visitors: visitors
            .into_iter()
            .map(|v| Visitor {
                nomis_person_id: v.nomis_person_id,
                visit_contact: v.visit_contact,
            })
            .collect(),
        support: support.map(|s| s.description),
        notes,
        created_at: m.create_timestamp,
        modified_at: m.modify_timestamp,
    })
}

impl<'c, C: ConnectionTrait> SeaOrmVisitRepository<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Insert the visit row and its children; `visit.id` is ignored.
    pub async fn insert(&self, v: &Visit) -> DomainResult<Visit> {
        debug!("Saving visit: {}", v.reference);

        let model = visit::ActiveModel {
            id: NotSet,
            reference: Set(v.reference.clone()),
            prisoner_id: Set(v.prisoner_id.clone()),
            prison_id: Set(v.prison_id),
            session_slot_id: Set(v.session_slot_id),
            restriction: Set(v.restriction.as_str().to_string()),
            visit_type: Set(v.visit_type.as_str().to_string()),
            visit_room: Set(v.visit_room.clone()),
            visit_status: Set(v.status.as_str().to_string()),
            outcome_status: Set(v.outcome_status.map(|s| s.as_str().to_string())),
            user_type: Set(v.user_type.as_str().to_string()),
            create_timestamp: Set(v.created_at),
            modify_timestamp: Set(v.modified_at),
        };
        let inserted = model.insert(self.conn).await.map_err(db_err)?;
        self.insert_children(inserted.id, v).await?;

        let mut saved = v.clone();
        saved.id = inserted.id;
        Ok(saved)
    }

    /// Overwrite the row and replace contact, visitors, support and notes.
    pub async fn update(&self, v: &Visit) -> DomainResult<()> {
        debug!("Updating visit: {}", v.reference);

        let model = visit::ActiveModel {
            id: Set(v.id),
            session_slot_id: Set(v.session_slot_id),
            restriction: Set(v.restriction.as_str().to_string()),
            visit_type: Set(v.visit_type.as_str().to_string()),
            visit_room: Set(v.visit_room.clone()),
            visit_status: Set(v.status.as_str().to_string()),
            outcome_status: Set(v.outcome_status.map(|s| s.as_str().to_string())),
            modify_timestamp: Set(v.modified_at),
            ..Default::default()
        };
        model.update(self.conn).await.map_err(db_err)?;

        self.delete_children(v.id).await?;
        self.insert_children(v.id, v).await
    }

    async fn insert_children(&self, visit_id: i32, v: &Visit) -> DomainResult<()> {
        if let Some(contact) = &v.contact {
            visit_contact::ActiveModel {
                id: NotSet,
                visit_id: Set(visit_id),
                name: Set(contact.name.clone()),
                telephone: Set(contact.telephone.clone()),
                email: Set(contact.email.clone()),
            }
            .insert(self.conn)
            .await
            .map_err(db_err)?;
        }

        if !v.visitors.is_empty() {
            let rows = v.visitors.iter().map(|visitor| visit_visitor::ActiveModel {
                id: NotSet,
                visit_id: Set(visit_id),
                nomis_person_id: Set(visitor.nomis_person_id),
                visit_contact: Set(visitor.visit_contact),
            });
            visit_visitor::Entity::insert_many(rows)
                .exec(self.conn)
                .await
                .map_err(db_err)?;
        }

        if let Some(description) = &v.support {
            visit_support::ActiveModel {
                id: NotSet,
                visit_id: Set(visit_id),
                description: Set(description.clone()),
            }
            .insert(self.conn)
            .await
            .map_err(db_err)?;
        }

        if !v.notes.is_empty() {
            let rows = v.notes.iter().map(|note| visit_note::ActiveModel {
                id: NotSet,
                visit_id: Set(visit_id),
                note_type: Set(note.note_type.as_str().to_string()),
                text: Set(note.text.clone()),
            });
            visit_note::Entity::insert_many(rows)
                .exec(self.conn)
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }

    async fn delete_children(&self, visit_id: i32) -> DomainResult<()> {
        visit_contact::Entity::delete_many()
            .filter(visit_contact::Column::VisitId.eq(visit_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;
        visit_visitor::Entity::delete_many()
            .filter(visit_visitor::Column::VisitId.eq(visit_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;
        visit_support::Entity::delete_many()
            .filter(visit_support::Column::VisitId.eq(visit_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;
        visit_note::Entity::delete_many()
            .filter(visit_note::Column::VisitId.eq(visit_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn load(&self, m: visit::Model) -> DomainResult<Visit> {
        let contact = visit_contact::Entity::find()
            .filter(visit_contact::Column::VisitId.eq(m.id))
            .one(self.conn)
            .await
            .map_err(db_err)?;
        let visitors = visit_visitor::Entity::find()
            .filter(visit_visitor::Column::VisitId.eq(m.id))
            .order_by_asc(visit_visitor::Column::Id)
            .all(self.conn)
            .await
            .map_err(db_err)?;
        let support = visit_support::Entity::find()
            .filter(visit_support::Column::VisitId.eq(m.id))
            .one(self.conn)
            .await
            .map_err(db_err)?;
        let notes = visit_note::Entity::find()
            .filter(visit_note::Column::VisitId.eq(m.id))
            .order_by_asc(visit_note::Column::Id)
            .all(self.conn)
            .await
            .map_err(db_err)?;
        model_to_domain(m, contact, visitors, support, notes)
    }

    pub async fn find_by_id(&self, id: i32) -> DomainResult<Option<Visit>> {
        let model = visit::Entity::find_by_id(id)
            .one(self.conn)
            .await
            .map_err(db_err)?;
        match model {
            Some(m) => Ok(Some(self.load(m).await?)),
            None => Ok(None),
        }
    }

    pub async fn find_by_reference(&self, reference: &str) -> DomainResult<Option<Visit>> {
        let model = visit::Entity::find()
            .filter(visit::Column::Reference.eq(reference))
            .one(self.conn)
            .await
            .map_err(db_err)?;
        match model {
            Some(m) => Ok(Some(self.load(m).await?)),
            None => Ok(None),
        }
    }

    pub async fn count_booked(
        &self,
        session_slot_id: i32,
        restriction: VisitRestriction,
    ) -> DomainResult<u64> {
        visit::Entity::find()
            .filter(visit::Column::SessionSlotId.eq(session_slot_id))
            .filter(visit::Column::Restriction.eq(restriction.as_str()))
            .filter(visit::Column::VisitStatus.eq(VisitStatus::Booked.as_str()))
            .count(self.conn)
            .await
            .map_err(db_err)
    }

    /// References of the prisoner's booked visits in the slot, any restriction.
    pub async fn find_booked_references_in_slot(
        &self,
        prisoner_id: &str,
        session_slot_id: i32,
        exclude_visit_id: Option<i32>,
    ) -> DomainResult<Vec<String>> {
        let mut query = visit::Entity::find()
            .select_only()
            .column(visit::Column::Reference)
            .filter(visit::Column::PrisonerId.eq(prisoner_id))
            .filter(visit::Column::SessionSlotId.eq(session_slot_id))
            .filter(visit::Column::VisitStatus.eq(VisitStatus::Booked.as_str()));
        if let Some(id) = exclude_visit_id {
            query = query.filter(visit::Column::Id.ne(id));
        }
        let references: Vec<String> = query.into_tuple().all(self.conn).await.map_err(db_err)?;
        Ok(references)
    }

    /// Prisoners among `prisoner_ids` with a booked visit at the prison on the date.
    pub async fn find_prisoners_booked_on_date(
        &self,
        prisoner_ids: &[String],
        prison_id: i32,
        slot_date: NaiveDate,
    ) -> DomainResult<Vec<String>> {
        if prisoner_ids.is_empty() {
            return Ok(vec![]);
        }
        let prisoners: Vec<String> = visit::Entity::find()
            .select_only()
            .column(visit::Column::PrisonerId)
            .distinct()
            .join(JoinType::InnerJoin, visit::Relation::SessionSlot.def())
            .filter(visit::Column::PrisonerId.is_in(prisoner_ids.iter().cloned()))
            .filter(visit::Column::PrisonId.eq(prison_id))
            .filter(visit::Column::VisitStatus.eq(VisitStatus::Booked.as_str()))
            .filter(session_slot::Column::SlotDate.eq(slot_date))
            .into_tuple()
            .all(self.conn)
            .await
            .map_err(db_err)?;
        Ok(prisoners)
    }
}
