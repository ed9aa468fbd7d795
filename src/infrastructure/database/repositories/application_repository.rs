//! SeaORM persistence for applications and their owned children

use chrono::{DateTime, Utc};
use log::debug;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set,
};

use crate::domain::{Application, Contact, DomainResult, SupportRequest, VisitRestriction, Visitor};
use crate::infrastructure::database::entities::{
    application, application_contact, application_support, application_visitor,
};
use crate::shared::errors::db_err;

pub struct SeaOrmApplicationRepository<'c, C> {
    conn: &'c C,
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(
    m: application::Model,
    contact: Option<application_contact::Model>,
    visitors: Vec<application_visitor::Model>,
    support: Vec<application_support::Model>,
) -> DomainResult<Application> {
    Ok(Application {
        id: m.id,
        reference: m.reference,
        prisoner_id: m.prisoner_id,
        prison_id: m.prison_id,
        session_slot_id: m.session_slot_id,
        visit_type: m.visit_type.parse()?,
        restriction: m.restriction.parse()?,
        reserved_slot: m.reserved_slot,
        completed: m.completed,
        user_type: m.user_type.parse()?,
        application_method: m.application_method.parse()?,
        created_by: m.created_by,
        visit_id: m.visit_id,
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
        support: support
            .into_iter()
            .map(|s| SupportRequest {
                support_type: s.support_type,
                details: s.support_details,
            })
            .collect(),
        created_at: m.create_timestamp,
        modified_at: m.modify_timestamp,
    })
}

fn live_reserved_filter(
    session_slot_id: i32,
    restriction: VisitRestriction,
    cutoff: DateTime<Utc>,
) -> sea_orm::Condition {
    sea_orm::Condition::all()
        .add(application::Column::SessionSlotId.eq(session_slot_id))
        .add(application::Column::Restriction.eq(restriction.as_str()))
        .add(application::Column::ReservedSlot.eq(true))
        .add(application::Column::Completed.eq(false))
        .add(application::Column::ModifyTimestamp.gte(cutoff))
}

fn expired_filter(cutoff: DateTime<Utc>) -> sea_orm::Condition {
    sea_orm::Condition::all()
        .add(application::Column::Completed.eq(false))
        .add(application::Column::ModifyTimestamp.lt(cutoff))
}

impl<'c, C: ConnectionTrait> SeaOrmApplicationRepository<'c, C> {
    pub fn new(conn: &'c C) -> Self {
        Self { conn }
    }

    /// Insert the application row and its children; `app.id` is ignored.
    pub async fn insert(&self, app: &Application) -> DomainResult<Application> {
        debug!("Saving application: {}", app.reference);

        let model = application::ActiveModel {
            id: NotSet,
            reference: Set(app.reference.clone()),
            prisoner_id: Set(app.prisoner_id.clone()),
            prison_id: Set(app.prison_id),
            session_slot_id: Set(app.session_slot_id),
            visit_type: Set(app.visit_type.as_str().to_string()),
            restriction: Set(app.restriction.as_str().to_string()),
            reserved_slot: Set(app.reserved_slot),
            completed: Set(app.completed),
            user_type: Set(app.user_type.as_str().to_string()),
            application_method: Set(app.application_method.as_str().to_string()),
            created_by: Set(app.created_by.clone()),
            visit_id: Set(app.visit_id),
            create_timestamp: Set(app.created_at),
            modify_timestamp: Set(app.modified_at),
        };
        let inserted = model.insert(self.conn).await.map_err(db_err)?;

        self.insert_children(inserted.id, app.contact.as_ref(), &app.visitors, &app.support)
            .await?;

        let mut saved = app.clone();
        saved.id = inserted.id;
        Ok(saved)
    }

    /// Overwrite the mutable columns and replace every child collection.
    pub async fn update(&self, app: &Application) -> DomainResult<()> {
        debug!("Updating application: {}", app.reference);

        let model = application::ActiveModel {
            id: Set(app.id),
            session_slot_id: Set(app.session_slot_id),
            visit_type: Set(app.visit_type.as_str().to_string()),
            restriction: Set(app.restriction.as_str().to_string()),
            reserved_slot: Set(app.reserved_slot),
            application_method: Set(app.application_method.as_str().to_string()),
            visit_id: Set(app.visit_id),
            modify_timestamp: Set(app.modified_at),
            ..Default::default()
        };
        model.update(self.conn).await.map_err(db_err)?;

        self.delete_children(app.id).await?;
        self.insert_children(app.id, app.contact.as_ref(), &app.visitors, &app.support)
            .await
    }

    async fn insert_children(
        &self,
        application_id: i32,
        contact: Option<&Contact>,
        visitors: &[Visitor],
        support: &[SupportRequest],
    ) -> DomainResult<()> {
        if let Some(contact) = contact {
            application_contact::ActiveModel {
                id: NotSet,
                application_id: Set(application_id),
                name: Set(contact.name.clone()),
                telephone: Set(contact.telephone.clone()),
                email: Set(contact.email.clone()),
            }
            .insert(self.conn)
            .await
            .map_err(db_err)?;
        }

        if !visitors.is_empty() {
            let rows = visitors.iter().map(|v| application_visitor::ActiveModel {
                id: NotSet,
                application_id: Set(application_id),
                nomis_person_id: Set(v.nomis_person_id),
                visit_contact: Set(v.visit_contact),
            });
            application_visitor::Entity::insert_many(rows)
                .exec(self.conn)
                .await
                .map_err(db_err)?;
        }

        if !support.is_empty() {
            let rows = support.iter().map(|s| application_support::ActiveModel {
                id: NotSet,
                application_id: Set(application_id),
                support_type: Set(s.support_type.clone()),
                support_details: Set(s.details.clone()),
            });
            application_support::Entity::insert_many(rows)
                .exec(self.conn)
                .await
                .map_err(db_err)?;
        }
        Ok(())
    }

    pub async fn delete_children(&self, application_id: i32) -> DomainResult<()> {
        application_contact::Entity::delete_many()
            .filter(application_contact::Column::ApplicationId.eq(application_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;
        application_visitor::Entity::delete_many()
            .filter(application_visitor::Column::ApplicationId.eq(application_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;
        application_support::Entity::delete_many()
            .filter(application_support::Column::ApplicationId.eq(application_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn load(&self, m: application::Model) -> DomainResult<Application> {
        let contact = application_contact::Entity::find()
            .filter(application_contact::Column::ApplicationId.eq(m.id))
            .one(self.conn)
            .await
            .map_err(db_err)?;
        let visitors = application_visitor::Entity::find()
            .filter(application_visitor::Column::ApplicationId.eq(m.id))
            .order_by_asc(application_visitor::Column::Id)
            .all(self.conn)
            .await
            .map_err(db_err)?;
        let support = application_support::Entity::find()
            .filter(application_support::Column::ApplicationId.eq(m.id))
            .order_by_asc(application_support::Column::Id)
            .all(self.conn)
            .await
            .map_err(db_err)?;
        model_to_domain(m, contact, visitors, support)
    }

    pub async fn find_by_reference(&self, reference: &str) -> DomainResult<Option<Application>> {
        let model = application::Entity::find()
            .filter(application::Column::Reference.eq(reference))
            .one(self.conn)
            .await
            .map_err(db_err)?;
        match model {
            Some(m) => Ok(Some(self.load(m).await?)),
            None => Ok(None),
        }
    }

    /// `None` when the reference is unknown.
    pub async fn is_completed(&self, reference: &str) -> DomainResult<Option<bool>> {
        let completed: Option<bool> = application::Entity::find()
            .select_only()
            .column(application::Column::Completed)
            .filter(application::Column::Reference.eq(reference))
            .into_tuple()
            .one(self.conn)
            .await
            .map_err(db_err)?;
        Ok(completed)
    }

    /// Flip `completed` to true. Returns whether this call made the change.
    pub async fn mark_completed(&self, reference: &str) -> DomainResult<bool> {
        let result = application::Entity::update_many()
            .col_expr(application::Column::Completed, Expr::value(true))
            .filter(application::Column::Reference.eq(reference))
            .filter(application::Column::Completed.eq(false))
            .exec(self.conn)
            .await
            .map_err(db_err)?;
        debug!(
            "Mark completed {}: {} row(s) affected",
            reference, result.rows_affected
        );
        Ok(result.rows_affected == 1)
    }

    pub async fn set_visit_id(&self, application_id: i32, visit_id: i32) -> DomainResult<()> {
        application::Entity::update_many()
            .col_expr(application::Column::VisitId, Expr::value(visit_id))
            .filter(application::Column::Id.eq(application_id))
            .exec(self.conn)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Live, uncompleted reservations holding a place in the pool.
    pub async fn count_live_reserved(
        &self,
        session_slot_id: i32,
        restriction: VisitRestriction,
        cutoff: DateTime<Utc>,
        exclude_application_id: Option<i32>,
    ) -> DomainResult<u64> {
        let mut query = application::Entity::find().filter(live_reserved_filter(
            session_slot_id,
            restriction,
            cutoff,
        ));
        if let Some(id) = exclude_application_id {
            query = query.filter(application::Column::Id.ne(id));
        }
        query.count(self.conn).await.map_err(db_err)
    }

    pub async fn find_expired_references(&self, cutoff: DateTime<Utc>) -> DomainResult<Vec<String>> {
        let references: Vec<String> = application::Entity::find()
            .select_only()
            .column(application::Column::Reference)
            .filter(expired_filter(cutoff))
            .order_by_asc(application::Column::ModifyTimestamp)
            .into_tuple()
            .all(self.conn)
            .await
            .map_err(db_err)?;
        Ok(references)
    }

    /// The application, only while it still matches the expiry predicate.
    pub async fn find_expired_by_reference(
        &self,
        reference: &str,
        cutoff: DateTime<Utc>,
    ) -> DomainResult<Option<Application>> {
        let model = application::Entity::find()
            .filter(application::Column::Reference.eq(reference))
            .filter(expired_filter(cutoff))
            .one(self.conn)
            .await
            .map_err(db_err)?;
        match model {
            Some(m) => Ok(Some(self.load(m).await?)),
            None => Ok(None),
        }
    }

    /// Delete the row if it is still expired. Returns rows deleted.
    pub async fn delete_if_expired(&self, reference: &str, cutoff: DateTime<Utc>) -> DomainResult<u64> {
        let result = application::Entity::delete_many()
            .filter(application::Column::Reference.eq(reference))
            .filter(expired_filter(cutoff))
            .exec(self.conn)
            .await
            .map_err(db_err)?;
        Ok(result.rows_affected)
    }

    /// Backdate the modify timestamp. Used by tests simulating abandonment.
    pub async fn set_modify_timestamp(&self, reference: &str, at: DateTime<Utc>) -> DomainResult<()> {
        application::Entity::update_many()
            .col_expr(application::Column::ModifyTimestamp, Expr::value(at))
            .filter(application::Column::Reference.eq(reference))
            .exec(self.conn)
            .await
            .map_err(db_err)?;
        Ok(())
    }
}
