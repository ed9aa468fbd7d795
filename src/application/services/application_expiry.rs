//! Reclaiming abandoned applications.
//!
//! An application nobody has touched within the validity window is deleted
//! with its children, releasing its place. The delete re-applies the expiry
//! predicate, so an application finalized in the meantime is left alone.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{DatabaseConnection, TransactionTrait};
use tokio::time::Duration;
use tracing::{debug, info, warn};

use crate::application::services::record_event;
use crate::domain::application::expiry_cutoff;
use crate::domain::events::{ApplicationReleasedEvent, Event};
use crate::domain::ports::AuditSink;
use crate::domain::DomainResult;
use crate::infrastructure::database::repositories::{
    SeaOrmApplicationRepository, SeaOrmVisitRepository,
};
use crate::shared::shutdown::ShutdownSignal;

pub struct ExpiryReclaimer {
    db: DatabaseConnection,
    audit: Arc<dyn AuditSink>,
    validity_minutes: i64,
}

impl ExpiryReclaimer {
    pub fn new(db: DatabaseConnection, audit: Arc<dyn AuditSink>, validity_minutes: i64) -> Self {
        Self {
            db,
            audit,
            validity_minutes,
        }
    }

    /// References of uncompleted applications untouched for `validity_minutes`.
    pub async fn find_expired(&self, validity_minutes: i64) -> DomainResult<Vec<String>> {
        SeaOrmApplicationRepository::new(&self.db)
            .find_expired_references(expiry_cutoff(validity_minutes, Utc::now()))
            .await
    }

    /// Delete the given applications that are still expired under
    /// `validity_minutes`. Returns the references actually deleted.
    ///
    /// Pass the window used by `find_expired` so the delete re-applies the
    /// same predicate the scan used.
    pub async fn reclaim(
        &self,
        references: &[String],
        validity_minutes: i64,
    ) -> DomainResult<Vec<String>> {
        let cutoff = expiry_cutoff(validity_minutes, Utc::now());
        let mut released = Vec::new();
        for reference in references {
            match self.reclaim_one(reference, cutoff).await {
                Ok(Some(event)) => {
                    released.push(reference.clone());
                    record_event(self.audit.as_ref(), Event::ApplicationReleased(event)).await;
                }
                Ok(None) => {}
                Err(e) => warn!(application = %reference, error = %e, "Failed to reclaim application"),
            }
        }
        if !released.is_empty() {
            metrics::counter!("visit_applications_reclaimed_total").increment(released.len() as u64);
            info!(count = released.len(), "Expired applications reclaimed");
        }
        Ok(released)
    }

    /// One sweep using the configured validity window.
    pub async fn reclaim_expired(&self) -> DomainResult<Vec<String>> {
        let expired = self.find_expired(self.validity_minutes).await?;
        if expired.is_empty() {
            return Ok(expired);
        }
        debug!(count = expired.len(), "Found expired applications");
        self.reclaim(&expired, self.validity_minutes).await
    }

    async fn reclaim_one(
        &self,
        reference: &str,
        cutoff: DateTime<Utc>,
    ) -> DomainResult<Option<ApplicationReleasedEvent>> {
        let txn = self.db.begin().await?;
        let applications = SeaOrmApplicationRepository::new(&txn);

        let Some(app) = applications.find_expired_by_reference(reference, cutoff).await? else {
            debug!(application = %reference, "No longer expired, skipping");
            return Ok(None);
        };
        let booking_reference = match app.visit_id {
            Some(id) => SeaOrmVisitRepository::new(&txn)
                .find_by_id(id)
                .await?
                .map(|v| v.reference),
            None => None,
        };

        applications.delete_children(app.id).await?;
        if applications.delete_if_expired(reference, cutoff).await? == 0 {
            // completed or touched since it was read; the rollback restores children
            debug!(application = %reference, "Lost race to delete, skipping");
            return Ok(None);
        }
        txn.commit().await?;

        debug!(application = %reference, "Application released");
        Ok(Some(ApplicationReleasedEvent {
            application_reference: app.reference,
            prisoner_id: app.prisoner_id,
            booking_reference,
            timestamp: Utc::now(),
        }))
    }
}

/// Start the application expiry background task.
///
/// Every `check_interval_secs` the task reclaims applications that have
/// outlived the validity window. Stops when `shutdown` fires.
pub fn start_application_expiry_task(
    reclaimer: Arc<ExpiryReclaimer>,
    shutdown: ShutdownSignal,
    check_interval_secs: u64,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            check_interval = check_interval_secs,
            validity_minutes = reclaimer.validity_minutes,
            "Application expiry task started"
        );

        let mut interval = tokio::time::interval(Duration::from_secs(check_interval_secs));

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = reclaimer.reclaim_expired().await {
                        warn!(error = %e, "Application expiry check error");
                    }
                }
                _ = shutdown.notified().wait() => {
                    info!("Application expiry task shutting down");
                    break;
                }
            }
        }

        info!("Application expiry task stopped");
    })
}
