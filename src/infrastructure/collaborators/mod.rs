//! Adapters for the collaborators the booking core reads from

pub mod memory;

pub use memory::{InMemoryPrisonDirectory, InMemoryPrisonerService, InMemorySessionTemplates};
