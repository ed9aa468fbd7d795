pub mod application;
pub mod contact;
pub mod events;
pub mod ports;
pub mod session_slot;
pub mod types;
pub mod visit;

// Re-export commonly used types
pub use application::Application;
pub use contact::{Contact, SupportRequest, Visitor};
pub use session_slot::SessionSlot;
pub use types::{
    ApplicationMethod, OutcomeStatus, UserType, VisitNoteType, VisitRestriction, VisitStatus,
    VisitType,
};
pub use visit::{Visit, VisitNote};

// Re-export DomainError from shared for convenience
pub use crate::shared::errors::{DomainError, DomainResult};
