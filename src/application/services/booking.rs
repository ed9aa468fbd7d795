//! Single entry point for the booking operations

use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::application::dto::{
    BookingRequest, CancelVisitRequest, ChangeApplicationRequest, CreateApplicationRequest,
};
use crate::application::services::{
    ApplicationLifecycle, ApplicationService, Collaborators, ExpiryReclaimer, ServiceContext,
    VisitService,
};
use crate::config::BookingConfig;
use crate::domain::{Application, DomainResult, Visit};

/// Holds the application and visit services and exposes the caller-facing
/// booking operations.
///
/// ```ignore
/// let booking = BookingOrchestrator::new(db, collaborators, BookingConfig::default());
/// let app = booking.create_initial(request).await?;
/// let visit = booking.finalize(&app.reference, booking_request).await?;
/// ```
pub struct BookingOrchestrator {
    applications: Arc<ApplicationService>,
    visits: Arc<VisitService>,
}

impl BookingOrchestrator {
    pub fn new(db: DatabaseConnection, collaborators: Collaborators, booking: BookingConfig) -> Self {
        let ctx = ServiceContext::new(db, collaborators, booking);
        let applications = Arc::new(ApplicationService::new(ctx.clone()));
        let lifecycle: Arc<dyn ApplicationLifecycle> = applications.clone();
        let visits = Arc::new(VisitService::new(ctx, lifecycle));
        Self {
            applications,
            visits,
        }
    }

    pub fn applications(&self) -> &Arc<ApplicationService> {
        &self.applications
    }

    pub fn visits(&self) -> &Arc<VisitService> {
        &self.visits
    }

    /// Reclaimer for the background expiry task
    pub fn reclaimer(&self) -> Arc<ExpiryReclaimer> {
        self.applications.reclaimer()
    }

    pub async fn create_initial(&self, request: CreateApplicationRequest) -> DomainResult<Application> {
        self.applications.create_initial(request).await
    }

    pub async fn create_for_existing_booking(
        &self,
        booking_reference: &str,
        request: CreateApplicationRequest,
    ) -> DomainResult<Application> {
        self.applications
            .create_for_existing_booking(booking_reference, request)
            .await
    }

    pub async fn change(
        &self,
        application_reference: &str,
        request: ChangeApplicationRequest,
    ) -> DomainResult<Application> {
        self.applications.change(application_reference, request).await
    }

    pub async fn finalize(
        &self,
        application_reference: &str,
        request: BookingRequest,
    ) -> DomainResult<Visit> {
        self.visits.finalize(application_reference, request).await
    }

    pub async fn cancel(&self, visit_reference: &str, request: CancelVisitRequest) -> DomainResult<Visit> {
        self.visits.cancel(visit_reference, request).await
    }

    pub async fn find_expired(&self, validity_minutes: i64) -> DomainResult<Vec<String>> {
        self.applications.find_expired(validity_minutes).await
    }

    pub async fn reclaim(
        &self,
        references: &[String],
        validity_minutes: i64,
    ) -> DomainResult<Vec<String>> {
        self.applications.reclaim(references, validity_minutes).await
    }

    pub async fn get_application(&self, reference: &str) -> DomainResult<Application> {
        self.applications.get(reference).await
    }

    pub async fn is_completed(&self, reference: &str) -> DomainResult<bool> {
        self.applications.is_completed(reference).await
    }

    pub async fn get_visit(&self, reference: &str) -> DomainResult<Visit> {
        self.visits.get_visit(reference).await
    }
}
