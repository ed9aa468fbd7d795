//! Booking finalization and cancellation

use std::sync::Arc;

use chrono::Utc;
use sea_orm::TransactionTrait;
use tracing::{debug, info};
use validator::Validate;

use crate::application::dto::{BookingRequest, CancelVisitRequest};
use crate::application::services::application::ApplicationLifecycle;
use crate::application::services::validation::{AdmissionCheck, ValidationEvent};
use crate::application::services::{record_event, ServiceContext};
use crate::domain::application::generate_reference;
use crate::domain::contact::support_summary;
use crate::domain::events::{Event, VisitCancelledEvent, VisitEvent};
use crate::domain::{DomainError, DomainResult, UserType, Visit, VisitStatus};
use crate::infrastructure::database::repositories::{
    SeaOrmSessionSlotRepository, SeaOrmVisitRepository,
};

pub struct VisitService {
    ctx: ServiceContext,
    applications: Arc<dyn ApplicationLifecycle>,
}

impl VisitService {
    pub fn new(ctx: ServiceContext, applications: Arc<dyn ApplicationLifecycle>) -> Self {
        Self { ctx, applications }
    }

    /// Promote an application into a booking, or update the visit it changes.
    ///
    /// Finalizing an already completed application returns its visit.
    pub async fn finalize(
        &self,
        application_reference: &str,
        request: BookingRequest,
    ) -> DomainResult<Visit> {
        request.validate()?;

        let txn = self.ctx.db.begin().await?;
        let won = self
            .applications
            .mark_completed(&txn, application_reference)
            .await?;
        let app = self
            .applications
            .find_in(&txn, application_reference)
            .await?
            .ok_or_else(|| {
                DomainError::not_found("Application", "reference", application_reference)
            })?;
        let visits = SeaOrmVisitRepository::new(&txn);

        if !won {
            debug!(application = %app.reference, "Application already completed");
            let visit_id = app.visit_id.ok_or_else(|| {
                DomainError::Conflict(format!(
                    "application {} is completed but has no visit",
                    app.reference
                ))
            })?;
            return visits
                .find_by_id(visit_id)
                .await?
                .ok_or_else(|| DomainError::not_found("Visit", "id", visit_id.to_string()));
        }

        let slots = SeaOrmSessionSlotRepository::new(&txn);
        let slot = slots
            .find_by_id(app.session_slot_id)
            .await?
            .ok_or_else(|| {
                DomainError::not_found("SessionSlot", "id", app.session_slot_id.to_string())
            })?;
        slots.lock(slot.id).await?;

        let now = Utc::now();
        let existing = match app.visit_id {
            Some(id) => visits.find_by_id(id).await?,
            None => None,
        };
        if let Some(visit) = &existing {
            let visit_slot = slots.find_by_id(visit.session_slot_id).await?;
            if visit_slot.is_some_and(|s| s.has_started(now)) {
                return Err(DomainError::ExpiredAmend(format!(
                    "visit {} has already started",
                    visit.reference
                )));
            }
        }
        if slot.has_started(now) {
            return Err(DomainError::ExpiredAmend(format!(
                "session slot {} has already started",
                slot.reference
            )));
        }

        let template = match slot.session_template_reference.as_deref() {
            Some(reference) => self.ctx.collaborators.templates.get_template(reference).await?,
            None => None,
        };

        let validity = self.ctx.booking.expired_applications_validity_minutes;
        let include_reserved = app.user_type == UserType::Staff && app.is_expired(validity, now);
        self.ctx
            .validator
            .validate(
                &txn,
                &AdmissionCheck {
                    prisoner_id: &app.prisoner_id,
                    user_type: app.user_type,
                    slot: &slot,
                    template: template.as_ref(),
                    restriction: app.restriction,
                    existing_visit: existing.as_ref(),
                    event: ValidationEvent::Finalize,
                    reserved: app.reserved_slot,
                    allow_override: request.allow_over_booking,
                    include_reserved,
                    exclude_application_id: Some(app.id),
                },
            )
            .await?;

        let (visit, updated) = match existing {
            Some(mut visit) => {
                visit.session_slot_id = slot.id;
                visit.restriction = app.restriction;
                visit.visit_type = app.visit_type;
                if let Some(template) = &template {
                    visit.visit_room = template.visit_room.clone();
                }
                visit.status = VisitStatus::Booked;
                visit.outcome_status = None;
                visit.contact = app.contact.clone();
                visit.visitors = app.visitors.clone();
                visit.support = support_summary(&app.support);
                visit.modified_at = now;
                visits.update(&visit).await?;
                (visit, true)
            }
            None => {
                let visit = Visit {
                    id: 0,
                    reference: generate_reference(),
                    prisoner_id: app.prisoner_id.clone(),
                    prison_id: slot.prison_id,
                    session_slot_id: slot.id,
                    restriction: app.restriction,
                    visit_type: app.visit_type,
                    visit_room: template
                        .as_ref()
                        .map(|t| t.visit_room.clone())
                        .unwrap_or_default(),
                    status: VisitStatus::Booked,
                    outcome_status: None,
                    user_type: app.user_type,
                    contact: app.contact.clone(),
                    visitors: app.visitors.clone(),
                    support: support_summary(&app.support),
                    notes: vec![],
                    created_at: now,
                    modified_at: now,
                };
                (visits.insert(&visit).await?, false)
            }
        };

        self.applications.link_visit(&txn, app.id, visit.id).await?;
        txn.commit().await?;

        let event = VisitEvent {
            booking_reference: visit.reference.clone(),
            application_reference: app.reference.clone(),
            prisoner_id: visit.prisoner_id.clone(),
            session_slot_reference: slot.reference.clone(),
            restriction: visit.restriction,
            actioned_by: request.actioned_by.clone(),
            application_method: request.application_method,
            timestamp: now,
        };
        if updated {
            metrics::counter!("visit_bookings_updated_total").increment(1);
            info!(visit = %visit.reference, application = %app.reference, "Visit updated");
            record_event(self.ctx.collaborators.audit.as_ref(), Event::VisitUpdated(event)).await;
        } else {
            metrics::counter!("visit_bookings_total", "user_type" => visit.user_type.as_str())
                .increment(1);
            info!(visit = %visit.reference, application = %app.reference, "Visit booked");
            record_event(self.ctx.collaborators.audit.as_ref(), Event::VisitBooked(event)).await;
        }
        Ok(visit)
    }

    /// Cancel a booked visit. Cancelling twice returns the cancelled visit.
    pub async fn cancel(
        &self,
        visit_reference: &str,
        request: CancelVisitRequest,
    ) -> DomainResult<Visit> {
        request.validate()?;

        let txn = self.ctx.db.begin().await?;
        let visits = SeaOrmVisitRepository::new(&txn);
        let mut visit = visits
            .find_by_reference(visit_reference)
            .await?
            .ok_or_else(|| DomainError::not_found("Visit", "reference", visit_reference))?;
        if visit.status == VisitStatus::Cancelled {
            debug!(visit = %visit.reference, "Visit already cancelled");
            return Ok(visit);
        }

        let slot = SeaOrmSessionSlotRepository::new(&txn)
            .find_by_id(visit.session_slot_id)
            .await?
            .ok_or_else(|| {
                DomainError::not_found("SessionSlot", "id", visit.session_slot_id.to_string())
            })?;
        let now = Utc::now();
        if slot.cancellation_window_closed(now, self.ctx.booking.cancel_day_limit) {
            return Err(DomainError::ExpiredAmend(format!(
                "visit {} can no longer be cancelled",
                visit.reference
            )));
        }

        visit.cancel(request.outcome_status, request.text.clone());
        visit.modified_at = now;
        visits.update(&visit).await?;
        txn.commit().await?;

        metrics::counter!("visit_cancellations_total", "outcome" => request.outcome_status.as_str())
            .increment(1);
        info!(
            visit = %visit.reference,
            outcome = %request.outcome_status,
            "Visit cancelled"
        );
        record_event(
            self.ctx.collaborators.audit.as_ref(),
            Event::VisitCancelled(VisitCancelledEvent {
                booking_reference: visit.reference.clone(),
                prisoner_id: visit.prisoner_id.clone(),
                outcome_status: request.outcome_status,
                actioned_by: request.actioned_by,
                application_method: request.application_method,
                timestamp: now,
            }),
        )
        .await;
        Ok(visit)
    }

    pub async fn get_visit(&self, reference: &str) -> DomainResult<Visit> {
        SeaOrmVisitRepository::new(&self.ctx.db)
            .find_by_reference(reference)
            .await?
            .ok_or_else(|| DomainError::not_found("Visit", "reference", reference))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::dto::{ChangeApplicationRequest, ContactDto, SupportDto, VisitorDto};
    use crate::application::services::test_support::{
        booking_request, create_request, future_date, Harness, PRISONER,
    };
    use crate::config::BookingConfig;
    use crate::domain::{OutcomeStatus, VisitNoteType, VisitRestriction};
    use chrono::Duration;

    fn cancel_request() -> CancelVisitRequest {
        CancelVisitRequest {
            outcome_status: OutcomeStatus::VisitorCancelled,
            text: Some("visitor unwell".into()),
            actioned_by: "staff-1".into(),
            application_method: Default::default(),
        }
    }

    #[tokio::test]
    async fn finalize_books_and_links() {
        let h = Harness::new().await;
        h.template("TPL-1", 2, 1);
        let mut request =
            create_request("TPL-1", future_date(3), VisitRestriction::Open, UserType::Staff);
        request.support = vec![SupportDto {
            support_type: "WHEELCHAIR".into(),
            details: None,
        }];
        let app = h.booking.create_initial(request).await.unwrap();
        let mut events = h.subscribe();

        let visit = h.booking.finalize(&app.reference, booking_request()).await.unwrap();

        assert_eq!(visit.status, VisitStatus::Booked);
        assert_eq!(visit.session_slot_id, app.session_slot_id);
        assert_eq!(visit.visit_room, "Main Hall");
        assert_eq!(visit.support.as_deref(), Some("WHEELCHAIR"));
        let stored = h.booking.get_application(&app.reference).await.unwrap();
        assert!(stored.completed);
        assert_eq!(stored.visit_id, Some(visit.id));
        assert_eq!(events.try_recv().unwrap().event.event_type(), "visit_booked");
    }

    #[tokio::test]
    async fn second_finalize_returns_same_visit() {
        let h = Harness::new().await;
        h.template("TPL-1", 2, 1);
        let app = h
            .booking
            .create_initial(create_request(
                "TPL-1",
                future_date(3),
                VisitRestriction::Open,
                UserType::Staff,
            ))
            .await
            .unwrap();

        let first = h.booking.finalize(&app.reference, booking_request()).await.unwrap();
        let mut events = h.subscribe();
        let second = h.booking.finalize(&app.reference, booking_request()).await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.reference, second.reference);
        assert!(events.try_recv().is_none());
    }

    #[tokio::test]
    async fn finalize_unknown_application_is_not_found() {
        let h = Harness::new().await;
        let err = h
            .booking
            .finalize("zz-zz-zz-zz", booking_request())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "Application", .. }));
    }

    #[tokio::test]
    async fn failed_finalize_leaves_application_open() {
        let h = Harness::new().await;
        h.template("TPL-1", 2, 1);
        let app = h
            .booking
            .create_initial(create_request(
                "TPL-1",
                future_date(3),
                VisitRestriction::Open,
                UserType::Public,
            ))
            .await
            .unwrap();
        h.prisoners.set_allowance(PRISONER, 0);

        let err = h.booking.finalize(&app.reference, booking_request()).await.unwrap_err();
        assert!(matches!(err, DomainError::ValidationAggregate(_)));
        assert!(!h.booking.is_completed(&app.reference).await.unwrap());
    }

    #[tokio::test]
    async fn change_application_updates_visit_in_place() {
        let h = Harness::new().await;
        h.template("TPL-1", 1, 1);
        let date = future_date(3);
        let app = h
            .booking
            .create_initial(create_request("TPL-1", date, VisitRestriction::Open, UserType::Staff))
            .await
            .unwrap();
        let visit = h.booking.finalize(&app.reference, booking_request()).await.unwrap();

        let mut request = create_request("TPL-1", date, VisitRestriction::Open, UserType::Staff);
        request.contact = Some(ContactDto {
            name: "John Smith".into(),
            telephone: Some("07700900000".into()),
            email: None,
        });
        request.visitors = vec![
            VisitorDto {
                nomis_person_id: 111,
                visit_contact: true,
            },
            VisitorDto {
                nomis_person_id: 222,
                visit_contact: false,
            },
        ];
        let change = h
            .booking
            .create_for_existing_booking(&visit.reference, request)
            .await
            .unwrap();
        let mut events = h.subscribe();

        let updated = h.booking.finalize(&change.reference, booking_request()).await.unwrap();

        assert_eq!(updated.id, visit.id);
        assert_eq!(updated.reference, visit.reference);
        assert_eq!(updated.contact.as_ref().unwrap().name, "John Smith");
        let stored = h.booking.get_visit(&visit.reference).await.unwrap();
        assert_eq!(stored.visitors.len(), 2);
        assert_eq!(events.try_recv().unwrap().event.event_type(), "visit_updated");
    }

    #[tokio::test]
    async fn staff_with_expired_hold_competes_with_live_reservations() {
        let h = Harness::new().await;
        h.template("TPL-1", 1, 1);
        let date = future_date(3);
        let stale = h
            .booking
            .create_initial(create_request("TPL-1", date, VisitRestriction::Open, UserType::Staff))
            .await
            .unwrap();
        h.backdate(&stale.reference, Duration::minutes(30)).await;
        h.booking
            .create_initial(create_request("TPL-1", date, VisitRestriction::Open, UserType::Staff))
            .await
            .unwrap();

        let err = h.booking.finalize(&stale.reference, booking_request()).await.unwrap_err();
        assert!(matches!(err, DomainError::OverCapacity { .. }));
        assert!(!h.booking.is_completed(&stale.reference).await.unwrap());
    }

    #[tokio::test]
    async fn cancel_sets_outcome_and_note() {
        let h = Harness::new().await;
        h.template("TPL-1", 2, 1);
        let app = h
            .booking
            .create_initial(create_request(
                "TPL-1",
                future_date(3),
                VisitRestriction::Open,
                UserType::Staff,
            ))
            .await
            .unwrap();
        let visit = h.booking.finalize(&app.reference, booking_request()).await.unwrap();

        let cancelled = h.booking.cancel(&visit.reference, cancel_request()).await.unwrap();
        assert_eq!(cancelled.status, VisitStatus::Cancelled);
        assert_eq!(cancelled.outcome_status, Some(OutcomeStatus::VisitorCancelled));

        let stored = h.booking.get_visit(&visit.reference).await.unwrap();
        assert_eq!(stored.status, VisitStatus::Cancelled);
        assert_eq!(stored.notes.len(), 1);
        assert_eq!(stored.notes[0].note_type, VisitNoteType::StatusChangedReason);

        // a second cancel is a no-op
        let again = h.booking.cancel(&visit.reference, cancel_request()).await.unwrap();
        assert_eq!(again.notes.len(), 1);
    }

    #[tokio::test]
    async fn cancel_unknown_visit_is_not_found() {
        let h = Harness::new().await;
        assert!(matches!(
            h.booking.cancel("zz-zz-zz-zz", cancel_request()).await,
            Err(DomainError::NotFound { entity: "Visit", .. })
        ));
    }

    #[tokio::test]
    async fn past_slot_rejects_cancel_and_change() {
        let h = Harness::new().await;
        h.template("TPL-1", 2, 1);
        let date = future_date(3);
        let app = h
            .booking
            .create_initial(create_request("TPL-1", date, VisitRestriction::Open, UserType::Staff))
            .await
            .unwrap();
        let visit = h.booking.finalize(&app.reference, booking_request()).await.unwrap();
        let change = h
            .booking
            .create_for_existing_booking(
                &visit.reference,
                create_request("TPL-1", date, VisitRestriction::Open, UserType::Staff),
            )
            .await
            .unwrap();

        h.move_slot_to_past(visit.session_slot_id).await;

        assert!(matches!(
            h.booking.cancel(&visit.reference, cancel_request()).await,
            Err(DomainError::ExpiredAmend(_))
        ));
        assert!(matches!(
            h.booking
                .change(&change.reference, ChangeApplicationRequest::default())
                .await,
            Err(DomainError::ExpiredAmend(_))
        ));
        assert!(matches!(
            h.booking.finalize(&change.reference, booking_request()).await,
            Err(DomainError::ExpiredAmend(_))
        ));
    }

    #[tokio::test]
    async fn cancel_day_limit_closes_window_early() {
        let h = Harness::with_config(BookingConfig {
            cancel_day_limit: 5,
            ..Default::default()
        })
        .await;
        h.template("TPL-1", 2, 1);
        let app = h
            .booking
            .create_initial(create_request(
                "TPL-1",
                future_date(2),
                VisitRestriction::Open,
                UserType::Staff,
            ))
            .await
            .unwrap();
        let visit = h.booking.finalize(&app.reference, booking_request()).await.unwrap();

        assert!(matches!(
            h.booking.cancel(&visit.reference, cancel_request()).await,
            Err(DomainError::ExpiredAmend(_))
        ));
    }
}
