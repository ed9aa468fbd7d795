//! # Visit Scheduler
//!
//! Booking core for prison visits: provisional reservations against session
//! slot capacity, promotion to confirmed visits, cancellation, and reclaiming
//! reservations that were never completed.
//!
//! ## Architecture
//!
//! The project follows Clean Architecture principles:
//!
//! - **domain**: Core business entities, types and collaborator ports
//! - **application**: Request DTOs, booking services and the event bus
//! - **infrastructure**: SeaORM persistence and in-memory collaborators
//! - **shared**: Errors and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod shared;

pub use config::{default_config_path, AppConfig, BookingConfig};

// Re-export database types for easy access
pub use infrastructure::{connect_and_migrate, init_database, DatabaseConfig};

pub use application::events::{create_event_bus, Event, EventBus, SharedEventBus};
pub use application::services::{BookingOrchestrator, Collaborators};
