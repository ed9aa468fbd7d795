//! Visit (booking) domain entity

use chrono::{DateTime, Utc};

use crate::domain::contact::{Contact, Visitor};
use crate::domain::types::{
    OutcomeStatus, UserType, VisitNoteType, VisitRestriction, VisitStatus, VisitType,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VisitNote {
    pub note_type: VisitNoteType,
    pub text: String,
}

/// A confirmed visit
#[derive(Debug, Clone)]
pub struct Visit {
    pub id: i32,
    pub reference: String,
    pub prisoner_id: String,
    pub prison_id: i32,
    pub session_slot_id: i32,
    pub restriction: VisitRestriction,
    pub visit_type: VisitType,
    pub visit_room: String,
    pub status: VisitStatus,
    pub outcome_status: Option<OutcomeStatus>,
    pub user_type: UserType,
    pub contact: Option<Contact>,
    pub visitors: Vec<Visitor>,
    /// Single summary of the support requested
    pub support: Option<String>,
    pub notes: Vec<VisitNote>,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
}

impl Visit {
    pub fn is_booked(&self) -> bool {
        self.status == VisitStatus::Booked
    }

    /// Whether this visit currently holds a place in the given pool.
    pub fn occupies(&self, session_slot_id: i32, restriction: VisitRestriction) -> bool {
        self.is_booked()
            && self.session_slot_id == session_slot_id
            && self.restriction == restriction
    }

    pub fn cancel(&mut self, outcome: OutcomeStatus, reason: Option<String>) {
        self.status = VisitStatus::Cancelled;
        self.outcome_status = Some(outcome);
        if let Some(text) = reason.filter(|t| !t.trim().is_empty()) {
            self.notes.push(VisitNote {
                note_type: VisitNoteType::StatusChangedReason,
                text,
            });
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_visit() -> Visit {
        let now = Utc::now();
        Visit {
            id: 1,
            reference: "vv-ww-xx-yy".into(),
            prisoner_id: "A1234BC".into(),
            prison_id: 1,
            session_slot_id: 10,
            restriction: VisitRestriction::Open,
            visit_type: VisitType::Social,
            visit_room: "Visits Main Hall".into(),
            status: VisitStatus::Booked,
            outcome_status: None,
            user_type: UserType::Staff,
            contact: None,
            visitors: vec![],
            support: None,
            notes: vec![],
            created_at: now,
            modified_at: now,
        }
    }

    #[test]
    fn booked_visit_occupies_its_pool_only() {
        let visit = sample_visit();
        assert!(visit.occupies(10, VisitRestriction::Open));
        assert!(!visit.occupies(10, VisitRestriction::Closed));
        assert!(!visit.occupies(11, VisitRestriction::Open));
    }

    #[test]
    fn cancel_records_outcome_and_reason() {
        let mut visit = sample_visit();
        visit.cancel(OutcomeStatus::VisitorCancelled, Some("visitor unwell".into()));
        assert_eq!(visit.status, VisitStatus::Cancelled);
        assert_eq!(visit.outcome_status, Some(OutcomeStatus::VisitorCancelled));
        assert_eq!(visit.notes.len(), 1);
        assert_eq!(visit.notes[0].note_type, VisitNoteType::StatusChangedReason);
        assert!(!visit.occupies(10, VisitRestriction::Open));
    }

    #[test]
    fn blank_cancel_reason_adds_no_note() {
        let mut visit = sample_visit();
        visit.cancel(OutcomeStatus::AdministrativeError, Some("  ".into()));
        assert!(visit.notes.is_empty());
    }
}
