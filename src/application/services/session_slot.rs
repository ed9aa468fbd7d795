//! Get-or-create resolution of session slots

use std::sync::Arc;

use chrono::NaiveDate;
use sea_orm::DatabaseConnection;
use tracing::{debug, info};

use crate::domain::application::generate_reference;
use crate::domain::ports::{PrisonDirectory, SessionTemplate};
use crate::domain::{DomainError, DomainResult, SessionSlot};
use crate::infrastructure::database::repositories::{NewSessionSlot, SeaOrmSessionSlotRepository};

pub struct SessionSlotService {
    db: DatabaseConnection,
    prisons: Arc<dyn PrisonDirectory>,
}

impl SessionSlotService {
    pub fn new(db: DatabaseConnection, prisons: Arc<dyn PrisonDirectory>) -> Self {
        Self { db, prisons }
    }

    /// Return the slot for the occurrence, creating it on first use.
    ///
    /// Concurrent callers for one occurrence all get the same row.
    pub async fn resolve_slot(
        &self,
        session_template_reference: Option<&str>,
        slot_date: NaiveDate,
        slot_start: chrono::DateTime<chrono::Utc>,
        slot_end: chrono::DateTime<chrono::Utc>,
        prison_id: i32,
    ) -> DomainResult<SessionSlot> {
        let repo = SeaOrmSessionSlotRepository::new(&self.db);

        if let Some(slot) = repo
            .find_occurrence(prison_id, session_template_reference, slot_start, slot_end)
            .await?
        {
            return Ok(slot);
        }

        let inserted = repo
            .insert_if_absent(NewSessionSlot {
                reference: generate_reference(),
                session_template_reference: session_template_reference.map(String::from),
                prison_id,
                slot_date,
                slot_start,
                slot_end,
            })
            .await?;

        if inserted {
            metrics::counter!("visit_session_slots_created_total").increment(1);
            info!(
                template = ?session_template_reference,
                prison_id,
                %slot_start,
                "Session slot created"
            );
        } else {
            debug!(
                template = ?session_template_reference,
                %slot_start,
                "Session slot created concurrently, re-reading"
            );
        }

        repo.find_occurrence(prison_id, session_template_reference, slot_start, slot_end)
            .await?
            .ok_or_else(|| {
                DomainError::Conflict(format!(
                    "session slot for template {:?} at {} could not be created",
                    session_template_reference, slot_start
                ))
            })
    }

    /// Slot for one dated occurrence of a template.
    pub async fn resolve_slot_for_template(
        &self,
        template: &SessionTemplate,
        slot_date: NaiveDate,
    ) -> DomainResult<SessionSlot> {
        let prison = self
            .prisons
            .find_prison_by_code(&template.prison_code)
            .await?
            .ok_or_else(|| DomainError::not_found("Prison", "code", &template.prison_code))?;

        let slot_start = slot_date.and_time(template.start_time).and_utc();
        let slot_end = slot_date.and_time(template.end_time).and_utc();

        self.resolve_slot(
            Some(&template.reference),
            slot_date,
            slot_start,
            slot_end,
            prison.id,
        )
        .await
    }

    pub async fn find_by_id(&self, id: i32) -> DomainResult<SessionSlot> {
        SeaOrmSessionSlotRepository::new(&self.db)
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("SessionSlot", "id", id.to_string()))
    }
}
