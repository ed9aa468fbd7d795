//! Booking lifecycle events
//!
//! Defines all event types recorded through the audit sink.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::types::{
    ApplicationMethod, OutcomeStatus, UserType, VisitRestriction,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    /// A fresh application took a place in a slot
    ApplicationReserved(ApplicationEvent),
    /// An application was opened against an existing visit
    ApplicationChanging(ApplicationEvent),
    /// An open application had its details replaced
    ApplicationChanged(ApplicationEvent),
    /// An expired application was deleted and its place released
    ApplicationReleased(ApplicationReleasedEvent),
    VisitBooked(VisitEvent),
    VisitUpdated(VisitEvent),
    VisitCancelled(VisitCancelledEvent),
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::ApplicationReserved(_) => "application_reserved",
            Event::ApplicationChanging(_) => "application_changing",
            Event::ApplicationChanged(_) => "application_changed",
            Event::ApplicationReleased(_) => "application_released",
            Event::VisitBooked(_) => "visit_booked",
            Event::VisitUpdated(_) => "visit_updated",
            Event::VisitCancelled(_) => "visit_cancelled",
        }
    }

    /// Reference of the application or visit the event is about
    pub fn reference(&self) -> &str {
        match self {
            Event::ApplicationReserved(e)
            | Event::ApplicationChanging(e)
            | Event::ApplicationChanged(e) => &e.application_reference,
            Event::ApplicationReleased(e) => &e.application_reference,
            Event::VisitBooked(e) | Event::VisitUpdated(e) => &e.booking_reference,
            Event::VisitCancelled(e) => &e.booking_reference,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationEvent {
    pub application_reference: String,
    pub booking_reference: Option<String>,
    pub prisoner_id: String,
    pub session_slot_reference: String,
    pub restriction: VisitRestriction,
    pub reserved_slot: bool,
    pub user_type: UserType,
    pub actioned_by: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationReleasedEvent {
    pub application_reference: String,
    pub prisoner_id: String,
    pub booking_reference: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitEvent {
    pub booking_reference: String,
    pub application_reference: String,
    pub prisoner_id: String,
    pub session_slot_reference: String,
    pub restriction: VisitRestriction,
    pub actioned_by: String,
    pub application_method: ApplicationMethod,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VisitCancelledEvent {
    pub booking_reference: String,
    pub prisoner_id: String,
    pub outcome_status: OutcomeStatus,
    pub actioned_by: String,
    pub application_method: ApplicationMethod,
    pub timestamp: DateTime<Utc>,
}

/// Envelope carried on the event bus
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

impl EventMessage {
    pub fn new(event: Event) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            event,
        }
    }
}
