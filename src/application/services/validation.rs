//! Admission validation
//!
//! Collects every rule a request breaks into one failure so callers can
//! report them together. Staff requests are only checked for capacity.

use std::sync::Arc;

use sea_orm::ConnectionTrait;
use tracing::debug;

use crate::application::services::capacity::CapacityService;
use crate::domain::ports::{PrisonerService, SessionTemplate};
use crate::domain::{DomainError, DomainResult, SessionSlot, UserType, Visit, VisitRestriction};
use crate::infrastructure::database::repositories::SeaOrmVisitRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationEvent {
    CreateReservation,
    Finalize,
}

/// Facts an admission decision is made on.
pub struct AdmissionCheck<'a> {
    pub prisoner_id: &'a str,
    pub user_type: UserType,
    pub slot: &'a SessionSlot,
    pub template: Option<&'a SessionTemplate>,
    pub restriction: VisitRestriction,
    pub existing_visit: Option<&'a Visit>,
    pub event: ValidationEvent,
    /// Whether the request competes for a place
    pub reserved: bool,
    pub allow_override: bool,
    /// Finalize only: count live reservations as well as bookings
    pub include_reserved: bool,
    /// Reservation only: application not to count against itself
    pub exclude_application_id: Option<i32>,
}

#[derive(Clone)]
pub struct AdmissionValidator {
    prisoners: Arc<dyn PrisonerService>,
    capacity: CapacityService,
}

impl AdmissionValidator {
    pub fn new(prisoners: Arc<dyn PrisonerService>, capacity: CapacityService) -> Self {
        Self {
            prisoners,
            capacity,
        }
    }

    pub async fn validate<C: ConnectionTrait>(
        &self,
        conn: &C,
        check: &AdmissionCheck<'_>,
    ) -> DomainResult<()> {
        let messages = match check.user_type {
            UserType::Staff => Vec::new(),
            UserType::Public => self.public_rule_messages(conn, check).await?,
        };

        let capacity = if check.allow_override || !check.reserved {
            Ok(())
        } else {
            match check.event {
                ValidationEvent::CreateReservation => {
                    self.capacity
                        .check_for_reservation(
                            conn,
                            check.slot,
                            check.restriction,
                            check.exclude_application_id,
                        )
                        .await
                }
                ValidationEvent::Finalize => {
                    self.capacity
                        .check_for_booking(
                            conn,
                            check.slot,
                            check.restriction,
                            check.include_reserved,
                        )
                        .await
                }
            }
        };

        match capacity {
            Ok(()) if messages.is_empty() => Ok(()),
            Ok(()) => Err(DomainError::ValidationAggregate(messages)),
            Err(over @ DomainError::OverCapacity { .. }) if messages.is_empty() => Err(over),
            Err(over @ DomainError::OverCapacity { .. }) => {
                let mut messages = messages;
                messages.push(over.to_string());
                Err(DomainError::ValidationAggregate(messages))
            }
            Err(other) => Err(other),
        }
    }

    async fn public_rule_messages<C: ConnectionTrait>(
        &self,
        conn: &C,
        check: &AdmissionCheck<'_>,
    ) -> DomainResult<Vec<String>> {
        let mut messages = Vec::new();
        let prisoner_id = check.prisoner_id;

        match self.prisoners.get_prisoner(prisoner_id).await? {
            None => messages.push(format!("prisoner {} not found", prisoner_id)),
            Some(prisoner) => {
                if let Some(template) = check.template {
                    if prisoner.prison_code != template.prison_code {
                        messages.push(format!(
                            "prisoner {} is not located at prison {}",
                            prisoner_id, template.prison_code
                        ));
                    }
                    let housing = self.prisoners.get_housing_levels(prisoner_id).await?;
                    let available = self
                        .prisoners
                        .is_session_available_to_prisoner(template, &prisoner, housing.as_ref())
                        .await?;
                    if !available {
                        messages.push(format!(
                            "session {} is not available to prisoner {}",
                            template.reference, prisoner_id
                        ));
                    }
                }
            }
        }

        if check.event == ValidationEvent::Finalize {
            let visits = SeaOrmVisitRepository::new(conn);

            let others: Vec<String> = self
                .prisoners
                .get_non_associations(prisoner_id)
                .await?
                .into_iter()
                .map(|n| n.other_prisoner_id)
                .collect();
            for other in visits
                .find_prisoners_booked_on_date(&others, check.slot.prison_id, check.slot.slot_date)
                .await?
            {
                messages.push(format!(
                    "prisoner {} has a non-association with {} who is booked on {}",
                    prisoner_id, other, check.slot.slot_date
                ));
            }

            let exclude = check.existing_visit.map(|v| v.id);
            for reference in visits
                .find_booked_references_in_slot(prisoner_id, check.slot.id, exclude)
                .await?
            {
                messages.push(format!(
                    "prisoner {} is already booked into this slot by visit {}",
                    prisoner_id, reference
                ));
            }

            if check.existing_visit.is_none() {
                let allowance = self.prisoners.get_remaining_allowance(prisoner_id).await?;
                if allowance <= 0 {
                    messages.push(format!(
                        "prisoner {} has no visit allowance remaining",
                        prisoner_id
                    ));
                }
            }
        }

        if !messages.is_empty() {
            debug!(prisoner_id, ?messages, "Public admission rules failed");
        }
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::services::test_support::{future_date, Harness, PRISONER};

    fn check<'a>(
        slot: &'a SessionSlot,
        template: &'a SessionTemplate,
        user_type: UserType,
        event: ValidationEvent,
    ) -> AdmissionCheck<'a> {
        AdmissionCheck {
            prisoner_id: PRISONER,
            user_type,
            slot,
            template: Some(template),
            restriction: VisitRestriction::Open,
            existing_visit: None,
            event,
            reserved: true,
            allow_override: false,
            include_reserved: false,
            exclude_application_id: None,
        }
    }

    #[tokio::test]
    async fn staff_skip_public_rules() {
        let h = Harness::new().await;
        let template = h.template("TPL-1", 1, 1);
        let slot = h.slot("TPL-1", 1, 1, future_date(3)).await;
        h.prisoners.set_allowance(PRISONER, 0);

        h.validator
            .validate(&h.db, &check(&slot, &template, UserType::Staff, ValidationEvent::Finalize))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn capacity_only_failure_is_over_capacity() {
        let h = Harness::new().await;
        let template = h.template("TPL-1", 0, 1);
        let slot = h.slot("TPL-1", 0, 1, future_date(3)).await;

        let err = h
            .validator
            .validate(
                &h.db,
                &check(&slot, &template, UserType::Public, ValidationEvent::CreateReservation),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::OverCapacity { .. }));
    }

    #[tokio::test]
    async fn override_and_unreserved_skip_capacity() {
        let h = Harness::new().await;
        let template = h.template("TPL-1", 0, 0);
        let slot = h.slot("TPL-1", 0, 0, future_date(3)).await;

        let mut c = check(&slot, &template, UserType::Staff, ValidationEvent::CreateReservation);
        c.allow_override = true;
        h.validator.validate(&h.db, &c).await.unwrap();

        c.allow_override = false;
        c.reserved = false;
        h.validator.validate(&h.db, &c).await.unwrap();
    }

    #[tokio::test]
    async fn public_failures_are_aggregated_with_capacity() {
        let h = Harness::new().await;
        let template = h.template("TPL-1", 0, 1);
        let slot = h.slot("TPL-1", 0, 1, future_date(3)).await;
        h.prisoners.restrict_session("TPL-1", PRISONER);
        h.prisoners.set_allowance(PRISONER, 0);

        let err = h
            .validator
            .validate(&h.db, &check(&slot, &template, UserType::Public, ValidationEvent::Finalize))
            .await
            .unwrap_err();
        let messages = match err {
            DomainError::ValidationAggregate(messages) => messages,
            other => panic!("expected aggregate, got {other:?}"),
        };
        assert_eq!(messages.len(), 3);
        assert!(messages[0].contains("not available"));
        assert!(messages[1].contains("allowance"));
        assert!(messages[2].starts_with("Over capacity"));
    }

    #[tokio::test]
    async fn unknown_prisoner_reported() {
        let h = Harness::new().await;
        let template = h.template("TPL-1", 1, 1);
        let slot = h.slot("TPL-1", 1, 1, future_date(3)).await;

        let mut c = check(&slot, &template, UserType::Public, ValidationEvent::CreateReservation);
        c.prisoner_id = "Z9999ZZ";
        let err = h.validator.validate(&h.db, &c).await.unwrap_err();
        assert_eq!(err.messages(), vec!["prisoner Z9999ZZ not found".to_string()]);
    }

    #[tokio::test]
    async fn allowance_is_only_checked_when_booking() {
        let h = Harness::new().await;
        let template = h.template("TPL-1", 1, 1);
        let slot = h.slot("TPL-1", 1, 1, future_date(3)).await;
        h.prisoners.set_allowance(PRISONER, 0);

        h.validator
            .validate(
                &h.db,
                &check(&slot, &template, UserType::Public, ValidationEvent::CreateReservation),
            )
            .await
            .unwrap();
    }
}
