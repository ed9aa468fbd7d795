//! Application services

mod application;
mod application_expiry;
mod booking;
mod capacity;
mod session_slot;
mod validation;
mod visit;

#[cfg(test)]
pub(crate) mod test_support;

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tracing::warn;

use crate::config::BookingConfig;
use crate::domain::events::Event;
use crate::domain::ports::{AuditSink, PrisonDirectory, PrisonerService, SessionTemplateProvider};

pub use application::{ApplicationLifecycle, ApplicationService};
pub use application_expiry::{start_application_expiry_task, ExpiryReclaimer};
pub use booking::BookingOrchestrator;
pub use capacity::CapacityService;
pub use session_slot::SessionSlotService;
pub use validation::{AdmissionCheck, AdmissionValidator, ValidationEvent};
pub use visit::VisitService;

/// Systems the booking core reads from or reports to
#[derive(Clone)]
pub struct Collaborators {
    pub templates: Arc<dyn SessionTemplateProvider>,
    pub prisons: Arc<dyn PrisonDirectory>,
    pub prisoners: Arc<dyn PrisonerService>,
    pub audit: Arc<dyn AuditSink>,
}

/// Dependencies shared by the application and visit services.
#[derive(Clone)]
pub struct ServiceContext {
    pub db: DatabaseConnection,
    pub collaborators: Collaborators,
    pub slots: Arc<SessionSlotService>,
    pub validator: AdmissionValidator,
    pub booking: BookingConfig,
}

impl ServiceContext {
    pub fn new(db: DatabaseConnection, collaborators: Collaborators, booking: BookingConfig) -> Self {
        let slots = Arc::new(SessionSlotService::new(
            db.clone(),
            collaborators.prisons.clone(),
        ));
        let capacity = CapacityService::new(
            collaborators.templates.clone(),
            booking.expired_applications_validity_minutes,
        );
        let validator = AdmissionValidator::new(collaborators.prisoners.clone(), capacity);
        Self {
            db,
            collaborators,
            slots,
            validator,
            booking,
        }
    }
}

/// Hand an event to the audit sink. Failures never reach the caller.
pub(crate) async fn record_event(audit: &dyn AuditSink, event: Event) {
    let event_type = event.event_type();
    let reference = event.reference().to_string();
    if let Err(e) = audit.record_event(event).await {
        warn!(event_type, %reference, error = %e, "Failed to record audit event");
    }
}
