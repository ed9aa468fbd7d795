//! Infrastructure layer - external concerns

pub mod collaborators;
pub mod database;

pub use collaborators::{InMemoryPrisonDirectory, InMemoryPrisonerService, InMemorySessionTemplates};
pub use database::{connect_and_migrate, init_database, DatabaseConfig};
