//! Domain ports (hexagonal architecture boundaries)
//!
//! Ports define the interfaces between the booking core and the systems it
//! depends on. In-memory adapters live in `infrastructure::collaborators`.

pub mod outbound;

pub use outbound::{
    AuditSink, HousingLevels, NonAssociation, Prison, PrisonDirectory, PrisonerDetails,
    PrisonerService, SessionTemplate, SessionTemplateProvider,
};
