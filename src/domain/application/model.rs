//! Application (reservation) domain entity

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

use crate::domain::contact::{Contact, SupportRequest, Visitor};
use crate::domain::types::{ApplicationMethod, UserType, VisitRestriction, VisitType};
use crate::domain::visit::Visit;

/// A provisional hold on a session slot, prior to booking
#[derive(Debug, Clone)]
pub struct Application {
    pub id: i32,
    /// Opaque external reference (`xx-xx-xx-xx`)
    pub reference: String,
    pub prisoner_id: String,
    pub prison_id: i32,
    pub session_slot_id: i32,
    pub visit_type: VisitType,
    pub restriction: VisitRestriction,
    /// Counts toward slot capacity while not completed
    pub reserved_slot: bool,
    /// Set once promoted to a visit; the application is then immutable
    pub completed: bool,
    pub user_type: UserType,
    pub application_method: ApplicationMethod,
    pub created_by: String,
    /// Visit this application changes or produced
    pub visit_id: Option<i32>,
    pub contact: Option<Contact>,
    pub visitors: Vec<Visitor>,
    pub support: Vec<SupportRequest>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Application {
    /// Abandoned: never completed and untouched for longer than the validity window.
    pub fn is_expired(&self, validity_minutes: i64, now: DateTime<Utc>) -> bool {
        !self.completed && self.modified_at < expiry_cutoff(validity_minutes, now)
    }

    /// Whether this application holds a place in the slot's capacity pool.
    pub fn holds_capacity(&self) -> bool {
        self.reserved_slot && !self.completed
    }
}

/// Applications last modified before this instant are expired.
pub fn expiry_cutoff(validity_minutes: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::minutes(validity_minutes)
}

/// A new application must compete for capacity unless it re-confirms the
/// exact slot and restriction its visit already occupies.
pub fn requires_reservation(
    existing_visit: Option<&Visit>,
    session_slot_id: i32,
    restriction: VisitRestriction,
) -> bool {
    existing_visit.map_or(true, |visit| !visit.occupies(session_slot_id, restriction))
}

/// Generate an external reference such as `kd-qz-ab-mt`.
pub fn generate_reference() -> String {
    let mut rng = rand::thread_rng();
    (0..4)
        .map(|_| {
            (0..2)
                .map(|_| char::from(rng.gen_range(b'a'..=b'z')))
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("-")
}
