//! Application (reservation) lifecycle: create, change, complete

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseTransaction, TransactionTrait};
use tracing::{debug, info};
use validator::Validate;

use crate::application::dto::{ChangeApplicationRequest, CreateApplicationRequest};
use crate::application::services::application_expiry::ExpiryReclaimer;
use crate::application::services::validation::{AdmissionCheck, ValidationEvent};
use crate::application::services::{record_event, ServiceContext};
use crate::domain::application::{generate_reference, requires_reservation};
use crate::domain::contact::OTHER_SUPPORT_TYPE;
use crate::domain::events::{ApplicationEvent, Event};
use crate::domain::ports::SessionTemplate;
use crate::domain::{
    Application, DomainError, DomainResult, SessionSlot, SupportRequest, Visit,
};
use crate::infrastructure::database::repositories::{
    SeaOrmApplicationRepository, SeaOrmSessionSlotRepository, SeaOrmSupportTypeRepository,
    SeaOrmVisitRepository,
};

/// Operations the booking finalizer needs from the application side.
#[async_trait]
pub trait ApplicationLifecycle: Send + Sync {
    /// Flip `completed` inside `txn`. `true` only for the caller that flipped it.
    async fn mark_completed(&self, txn: &DatabaseTransaction, reference: &str)
        -> DomainResult<bool>;

    async fn is_completed(&self, reference: &str) -> DomainResult<bool>;

    async fn find_in(
        &self,
        txn: &DatabaseTransaction,
        reference: &str,
    ) -> DomainResult<Option<Application>>;

    async fn link_visit(
        &self,
        txn: &DatabaseTransaction,
        application_id: i32,
        visit_id: i32,
    ) -> DomainResult<()>;
}

pub struct ApplicationService {
    ctx: ServiceContext,
    reclaimer: Arc<ExpiryReclaimer>,
}

fn application_event(
    app: &Application,
    slot: &SessionSlot,
    booking_reference: Option<String>,
    actioned_by: &str,
) -> ApplicationEvent {
    ApplicationEvent {
        application_reference: app.reference.clone(),
        booking_reference,
        prisoner_id: app.prisoner_id.clone(),
        session_slot_reference: slot.reference.clone(),
        restriction: app.restriction,
        reserved_slot: app.reserved_slot,
        user_type: app.user_type,
        actioned_by: actioned_by.to_string(),
        timestamp: Utc::now(),
    }
}

/// Every support code must be seeded, and OTHER must say what is needed.
async fn validate_support<C: ConnectionTrait>(
    conn: &C,
    support: &[SupportRequest],
) -> DomainResult<()> {
    let support_types = SeaOrmSupportTypeRepository::new(conn);
    for request in support {
        if !support_types.exists(&request.support_type).await? {
            return Err(DomainError::not_found(
                "SupportType",
                "code",
                &request.support_type,
            ));
        }
        let has_details = request
            .details
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty());
        if request.support_type == OTHER_SUPPORT_TYPE && !has_details {
            return Err(DomainError::Validation(
                "details are required for support type OTHER".into(),
            ));
        }
    }
    Ok(())
}

impl ApplicationService {
    pub fn new(ctx: ServiceContext) -> Self {
        let reclaimer = Arc::new(ExpiryReclaimer::new(
            ctx.db.clone(),
            ctx.collaborators.audit.clone(),
            ctx.booking.expired_applications_validity_minutes,
        ));
        Self { ctx, reclaimer }
    }

    pub fn reclaimer(&self) -> Arc<ExpiryReclaimer> {
        self.reclaimer.clone()
    }

    async fn template(&self, reference: &str) -> DomainResult<SessionTemplate> {
        self.ctx
            .collaborators
            .templates
            .get_template(reference)
            .await?
            .ok_or_else(|| DomainError::not_found("SessionTemplate", "reference", reference))
    }

    async fn template_for_slot(&self, slot: &SessionSlot) -> DomainResult<Option<SessionTemplate>> {
        match slot.session_template_reference.as_deref() {
            Some(reference) => self.ctx.collaborators.templates.get_template(reference).await,
            None => Ok(None),
        }
    }

    /// Reserve a place for a new visit.
    pub async fn create_initial(&self, request: CreateApplicationRequest) -> DomainResult<Application> {
        request.validate()?;
        let template = self.template(&request.session_template_reference).await?;
        let slot = self
            .ctx
            .slots
            .resolve_slot_for_template(&template, request.session_date)
            .await?;
        if slot.has_started(Utc::now()) {
            return Err(DomainError::Validation(format!(
                "session slot {} has already started",
                slot.reference
            )));
        }

        let support: Vec<SupportRequest> =
            request.support.iter().cloned().map(Into::into).collect();
        validate_support(&self.ctx.db, &support).await?;

        let now = Utc::now();
        let app = Application {
            id: 0,
            reference: generate_reference(),
            prisoner_id: request.prisoner_id.clone(),
            prison_id: slot.prison_id,
            session_slot_id: slot.id,
            visit_type: request.visit_type,
            restriction: request.restriction,
            reserved_slot: true,
            completed: false,
            user_type: request.user_type,
            application_method: request.application_method,
            created_by: request.actioned_by.clone(),
            visit_id: None,
            contact: request.contact.clone().map(Into::into),
            visitors: request.visitors.iter().cloned().map(Into::into).collect(),
            support,
            created_at: now,
            modified_at: now,
        };

        let txn = self.ctx.db.begin().await?;
        SeaOrmSessionSlotRepository::new(&txn).lock(slot.id).await?;
        self.ctx
            .validator
            .validate(
                &txn,
                &AdmissionCheck {
                    prisoner_id: &app.prisoner_id,
                    user_type: app.user_type,
                    slot: &slot,
                    template: Some(&template),
                    restriction: app.restriction,
                    existing_visit: None,
                    event: ValidationEvent::CreateReservation,
                    reserved: true,
                    allow_override: request.allow_over_booking,
                    include_reserved: false,
                    exclude_application_id: None,
                },
            )
            .await?;
        let app = SeaOrmApplicationRepository::new(&txn).insert(&app).await?;
        txn.commit().await?;

        metrics::counter!("visit_applications_reserved_total", "user_type" => app.user_type.as_str())
            .increment(1);
        info!(
            application = %app.reference,
            prisoner = %app.prisoner_id,
            slot = %slot.reference,
            restriction = %app.restriction,
            "Application reserved"
        );
        record_event(
            self.ctx.collaborators.audit.as_ref(),
            Event::ApplicationReserved(application_event(&app, &slot, None, &request.actioned_by)),
        )
        .await;
        Ok(app)
    }

    /// Open an application that will change an existing booking.
    pub async fn create_for_existing_booking(
        &self,
        booking_reference: &str,
        request: CreateApplicationRequest,
    ) -> DomainResult<Application> {
        request.validate()?;
        let template = self.template(&request.session_template_reference).await?;
        let now = Utc::now();

        let visit = SeaOrmVisitRepository::new(&self.ctx.db)
            .find_by_reference(booking_reference)
            .await?;
        let mut problems = Vec::new();
        match &visit {
            None => problems.push(format!("visit {} not found", booking_reference)),
            Some(visit) => {
                if visit.prisoner_id != request.prisoner_id {
                    problems.push(format!(
                        "prisoner {} does not match visit {} prisoner {}",
                        request.prisoner_id, visit.reference, visit.prisoner_id
                    ));
                }
                let template_prison = self
                    .ctx
                    .collaborators
                    .prisons
                    .find_prison_by_code(&template.prison_code)
                    .await?;
                if template_prison.map(|p| p.id) != Some(visit.prison_id) {
                    problems.push(format!(
                        "session template {} is not at the prison of visit {}",
                        template.reference, visit.reference
                    ));
                }
                let visit_slot = self.ctx.slots.find_by_id(visit.session_slot_id).await?;
                if visit_slot.has_started(now) {
                    problems.push(format!("visit {} has already started", visit.reference));
                }
            }
        }
        let visit = match visit {
            Some(visit) if problems.is_empty() => visit,
            _ => return Err(DomainError::ValidationAggregate(problems)),
        };

        let slot = self
            .ctx
            .slots
            .resolve_slot_for_template(&template, request.session_date)
            .await?;
        if slot.has_started(now) {
            return Err(DomainError::ExpiredAmend(format!(
                "session slot {} has already started",
                slot.reference
            )));
        }
        let reserved = requires_reservation(Some(&visit), slot.id, request.restriction);

        let support: Vec<SupportRequest> =
            request.support.iter().cloned().map(Into::into).collect();
        validate_support(&self.ctx.db, &support).await?;

        let app = Application {
            id: 0,
            reference: generate_reference(),
            prisoner_id: request.prisoner_id.clone(),
            prison_id: slot.prison_id,
            session_slot_id: slot.id,
            visit_type: request.visit_type,
            restriction: request.restriction,
            reserved_slot: reserved,
            completed: false,
            user_type: request.user_type,
            application_method: request.application_method,
            created_by: request.actioned_by.clone(),
            visit_id: Some(visit.id),
            contact: request.contact.clone().map(Into::into),
            visitors: request.visitors.iter().cloned().map(Into::into).collect(),
            support,
            created_at: now,
            modified_at: now,
        };

        let txn = self.ctx.db.begin().await?;
        SeaOrmSessionSlotRepository::new(&txn).lock(slot.id).await?;
        self.ctx
            .validator
            .validate(
                &txn,
                &AdmissionCheck {
                    prisoner_id: &app.prisoner_id,
                    user_type: app.user_type,
                    slot: &slot,
                    template: Some(&template),
                    restriction: app.restriction,
                    existing_visit: Some(&visit),
                    event: ValidationEvent::CreateReservation,
                    reserved,
                    allow_override: request.allow_over_booking,
                    include_reserved: false,
                    exclude_application_id: None,
                },
            )
            .await?;
        let app = SeaOrmApplicationRepository::new(&txn).insert(&app).await?;
        txn.commit().await?;

        if reserved {
            metrics::counter!("visit_applications_reserved_total", "user_type" => app.user_type.as_str())
                .increment(1);
        }
        info!(
            application = %app.reference,
            visit = %visit.reference,
            reserved_slot = reserved,
            "Application opened against existing visit"
        );
        record_event(
            self.ctx.collaborators.audit.as_ref(),
            Event::ApplicationChanging(application_event(
                &app,
                &slot,
                Some(visit.reference.clone()),
                &request.actioned_by,
            )),
        )
        .await;
        Ok(app)
    }

    /// Apply the supplied fields to an open application.
    pub async fn change(
        &self,
        application_reference: &str,
        request: ChangeApplicationRequest,
    ) -> DomainResult<Application> {
        request.validate()?;
        let target = request.session().map_err(DomainError::Validation)?;

        let current = self.get(application_reference).await?;
        if current.completed {
            return Err(DomainError::Conflict(format!(
                "application {} is already completed",
                application_reference
            )));
        }

        let (slot, template) = match target {
            Some((template_reference, date)) => {
                let template = self.template(template_reference).await?;
                let slot = self.ctx.slots.resolve_slot_for_template(&template, date).await?;
                (slot, Some(template))
            }
            None => {
                let slot = self.ctx.slots.find_by_id(current.session_slot_id).await?;
                let template = self.template_for_slot(&slot).await?;
                (slot, template)
            }
        };

        let now = Utc::now();
        if slot.has_started(now) {
            return Err(DomainError::ExpiredAmend(format!(
                "session slot {} has already started",
                slot.reference
            )));
        }

        let existing_visit: Option<Visit> = match current.visit_id {
            Some(id) => SeaOrmVisitRepository::new(&self.ctx.db).find_by_id(id).await?,
            None => None,
        };
        if let Some(visit) = &existing_visit {
            let visit_slot = self.ctx.slots.find_by_id(visit.session_slot_id).await?;
            if visit_slot.has_started(now) {
                return Err(DomainError::ExpiredAmend(format!(
                    "visit {} has already started",
                    visit.reference
                )));
            }
        }

        let restriction = request.restriction.unwrap_or(current.restriction);
        let reserved = requires_reservation(existing_visit.as_ref(), slot.id, restriction);

        let support: Option<Vec<SupportRequest>> = request
            .support
            .as_ref()
            .map(|s| s.iter().cloned().map(Into::into).collect());
        if let Some(support) = &support {
            validate_support(&self.ctx.db, support).await?;
        }

        let txn = self.ctx.db.begin().await?;
        SeaOrmSessionSlotRepository::new(&txn).lock(slot.id).await?;
        let applications = SeaOrmApplicationRepository::new(&txn);
        let mut app = applications
            .find_by_reference(application_reference)
            .await?
            .ok_or_else(|| {
                DomainError::not_found("Application", "reference", application_reference)
            })?;
        if app.completed {
            return Err(DomainError::Conflict(format!(
                "application {} is already completed",
                application_reference
            )));
        }

        let moved = slot.id != app.session_slot_id || restriction != app.restriction;
        // an expired hold must win its place back before being refreshed
        let revived = app.holds_capacity()
            && app.is_expired(self.ctx.booking.expired_applications_validity_minutes, now);
        if moved || revived {
            self.ctx
                .validator
                .validate(
                    &txn,
                    &AdmissionCheck {
                        prisoner_id: &app.prisoner_id,
                        user_type: app.user_type,
                        slot: &slot,
                        template: template.as_ref(),
                        restriction,
                        existing_visit: existing_visit.as_ref(),
                        event: ValidationEvent::CreateReservation,
                        reserved,
                        allow_override: request.allow_over_booking,
                        include_reserved: false,
                        exclude_application_id: Some(app.id),
                    },
                )
                .await?;
        } else {
            debug!(application = %app.reference, "Slot unchanged, skipping admission");
        }

        app.session_slot_id = slot.id;
        app.prison_id = slot.prison_id;
        app.restriction = restriction;
        app.reserved_slot = reserved;
        if let Some(visit_type) = request.visit_type {
            app.visit_type = visit_type;
        }
        if let Some(method) = request.application_method {
            app.application_method = method;
        }
        if let Some(contact) = request.contact {
            app.contact = Some(contact.into());
        }
        if let Some(visitors) = request.visitors {
            app.visitors = visitors.into_iter().map(Into::into).collect();
        }
        if let Some(support) = support {
            app.support = support;
        }
        app.modified_at = now;

        applications.update(&app).await?;
        txn.commit().await?;

        info!(
            application = %app.reference,
            slot = %slot.reference,
            moved,
            "Application changed"
        );
        let booking_reference = existing_visit.map(|v| v.reference);
        record_event(
            self.ctx.collaborators.audit.as_ref(),
            Event::ApplicationChanged(application_event(
                &app,
                &slot,
                booking_reference,
                &app.created_by,
            )),
        )
        .await;
        Ok(app)
    }

    pub async fn get(&self, reference: &str) -> DomainResult<Application> {
        SeaOrmApplicationRepository::new(&self.ctx.db)
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| DomainError::not_found("Application", "reference", reference))
    }

    pub async fn find_expired(&self, validity_minutes: i64) -> DomainResult<Vec<String>> {
        self.reclaimer.find_expired(validity_minutes).await
    }

    pub async fn reclaim(
        &self,
        references: &[String],
        validity_minutes: i64,
    ) -> DomainResult<Vec<String>> {
        self.reclaimer.reclaim(references, validity_minutes).await
    }
}

#[async_trait]
impl ApplicationLifecycle for ApplicationService {
    async fn mark_completed(
        &self,
        txn: &DatabaseTransaction,
        reference: &str,
    ) -> DomainResult<bool> {
        SeaOrmApplicationRepository::new(txn)
            .mark_completed(reference)
            .await
    }

    async fn is_completed(&self, reference: &str) -> DomainResult<bool> {
        SeaOrmApplicationRepository::new(&self.ctx.db)
            .is_completed(reference)
            .await?
            .ok_or_else(|| DomainError::not_found("Application", "reference", reference))
    }

    async fn find_in(
        &self,
        txn: &DatabaseTransaction,
        reference: &str,
    ) -> DomainResult<Option<Application>> {
        SeaOrmApplicationRepository::new(txn)
            .find_by_reference(reference)
            .await
    }

    async fn link_visit(
        &self,
        txn: &DatabaseTransaction,
        application_id: i32,
        visit_id: i32,
    ) -> DomainResult<()> {
        SeaOrmApplicationRepository::new(txn)
            .set_visit_id(application_id, visit_id)
            .await
    }
}
