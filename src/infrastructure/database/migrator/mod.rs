//! Database migrations module

pub use sea_orm_migration::prelude::*;

mod m20250101_000001_create_session_slot;
mod m20250101_000002_create_visit;
mod m20250101_000003_create_application;
mod m20250101_000004_create_support_type;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250101_000001_create_session_slot::Migration),
            Box::new(m20250101_000002_create_visit::Migration),
            Box::new(m20250101_000003_create_application::Migration),
            Box::new(m20250101_000004_create_support_type::Migration),
        ]
    }
}
