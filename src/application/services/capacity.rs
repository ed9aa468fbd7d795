//! Capacity admission control
//!
//! Demand for a (slot, restriction) pool is the number of booked visits plus,
//! where asked for, live reservations. Both checks must run inside the
//! caller's transaction after the slot has been locked.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::ConnectionTrait;
use tracing::debug;

use crate::domain::application::expiry_cutoff;
use crate::domain::ports::SessionTemplateProvider;
use crate::domain::{DomainError, DomainResult, SessionSlot, VisitRestriction};
use crate::infrastructure::database::repositories::{
    SeaOrmApplicationRepository, SeaOrmVisitRepository,
};

#[derive(Clone)]
pub struct CapacityService {
    templates: Arc<dyn SessionTemplateProvider>,
    validity_minutes: i64,
}

impl CapacityService {
    pub fn new(templates: Arc<dyn SessionTemplateProvider>, validity_minutes: i64) -> Self {
        Self {
            templates,
            validity_minutes,
        }
    }

    /// Admission of a reservation: booked plus live reserved, not counting
    /// `exclude_application_id`.
    pub async fn check_for_reservation<C: ConnectionTrait>(
        &self,
        conn: &C,
        slot: &SessionSlot,
        restriction: VisitRestriction,
        exclude_application_id: Option<i32>,
    ) -> DomainResult<()> {
        let booked = SeaOrmVisitRepository::new(conn)
            .count_booked(slot.id, restriction)
            .await?;
        let reserved = SeaOrmApplicationRepository::new(conn)
            .count_live_reserved(
                slot.id,
                restriction,
                expiry_cutoff(self.validity_minutes, Utc::now()),
                exclude_application_id,
            )
            .await?;
        self.ensure_within(slot, restriction, booked + reserved).await
    }

    /// Admission of a booking: booked, plus live reserved when asked.
    pub async fn check_for_booking<C: ConnectionTrait>(
        &self,
        conn: &C,
        slot: &SessionSlot,
        restriction: VisitRestriction,
        include_reserved_applications: bool,
    ) -> DomainResult<()> {
        let mut demand = SeaOrmVisitRepository::new(conn)
            .count_booked(slot.id, restriction)
            .await?;
        if include_reserved_applications {
            demand += SeaOrmApplicationRepository::new(conn)
                .count_live_reserved(
                    slot.id,
                    restriction,
                    expiry_cutoff(self.validity_minutes, Utc::now()),
                    None,
                )
                .await?;
        }
        self.ensure_within(slot, restriction, demand).await
    }

    async fn ensure_within(
        &self,
        slot: &SessionSlot,
        restriction: VisitRestriction,
        demand: u64,
    ) -> DomainResult<()> {
        let Some(template_reference) = slot.session_template_reference.as_deref() else {
            debug!(slot = %slot.reference, "Slot has no template, admitting without capacity check");
            return Ok(());
        };
        let Some(template) = self.templates.get_template(template_reference).await? else {
            debug!(
                slot = %slot.reference,
                template = template_reference,
                "Template unknown, admitting without capacity check"
            );
            return Ok(());
        };

        let capacity = u64::from(template.capacity_for(restriction));
        debug!(
            slot = %slot.reference,
            %restriction,
            demand,
            capacity,
            "Capacity check"
        );
        if demand >= capacity {
            metrics::counter!("visit_over_capacity_total", "restriction" => restriction.as_str())
                .increment(1);
            return Err(DomainError::OverCapacity {
                slot: slot.reference.clone(),
                restriction,
                demand,
                capacity,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::{future_date, Harness};
    use chrono::Duration;

    #[tokio::test]
    async fn empty_pool_admits() {
        let h = Harness::new().await;
        let slot = h.slot("TPL-1", 1, 0, future_date(3)).await;
        h.capacity
            .check_for_reservation(&h.db, &slot, VisitRestriction::Open, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn zero_capacity_pool_rejects() {
        let h = Harness::new().await;
        let slot = h.slot("TPL-1", 1, 0, future_date(3)).await;
        let err = h
            .capacity
            .check_for_booking(&h.db, &slot, VisitRestriction::Closed, false)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::OverCapacity {
                demand: 0,
                capacity: 0,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn live_reservation_counts_but_is_excludable() {
        let h = Harness::new().await;
        let slot = h.slot("TPL-1", 1, 1, future_date(3)).await;
        let app = h.insert_application(&slot, VisitRestriction::Open).await;

        let err = h
            .capacity
            .check_for_reservation(&h.db, &slot, VisitRestriction::Open, None)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::OverCapacity { demand: 1, capacity: 1, .. }));

        h.capacity
            .check_for_reservation(&h.db, &slot, VisitRestriction::Open, Some(app.id))
            .await
            .unwrap();
        // the closed pool is independent
        h.capacity
            .check_for_reservation(&h.db, &slot, VisitRestriction::Closed, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn expired_reservation_releases_its_place() {
        let h = Harness::new().await;
        let slot = h.slot("TPL-1", 1, 1, future_date(3)).await;
        let app = h.insert_application(&slot, VisitRestriction::Open).await;
        h.backdate(&app.reference, Duration::minutes(30)).await;

        h.capacity
            .check_for_reservation(&h.db, &slot, VisitRestriction::Open, None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn booking_check_ignores_reservations_unless_asked() {
        let h = Harness::new().await;
        let slot = h.slot("TPL-1", 1, 1, future_date(3)).await;
        h.insert_application(&slot, VisitRestriction::Open).await;

        h.capacity
            .check_for_booking(&h.db, &slot, VisitRestriction::Open, false)
            .await
            .unwrap();
        assert!(h
            .capacity
            .check_for_booking(&h.db, &slot, VisitRestriction::Open, true)
            .await
            .is_err());
    }

    #[tokio::test]
    async fn slot_without_template_is_admitted() {
        let h = Harness::new().await;
        let date = future_date(2);
        let slot = h
            .slots
            .resolve_slot(
                None,
                date,
                date.and_hms_opt(14, 0, 0).unwrap().and_utc(),
                date.and_hms_opt(15, 0, 0).unwrap().and_utc(),
                h.prison_id,
            )
            .await
            .unwrap();
        h.capacity
            .check_for_booking(&h.db, &slot, VisitRestriction::Open, true)
            .await
            .unwrap();
    }
}
