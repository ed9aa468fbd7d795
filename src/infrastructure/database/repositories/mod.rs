//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories. Each borrows a connection so the same
//! code runs against the pool or inside an open transaction.

pub mod application_repository;
pub mod session_slot_repository;
pub mod support_type_repository;
pub mod visit_repository;

pub use application_repository::SeaOrmApplicationRepository;
pub use session_slot_repository::{NewSessionSlot, SeaOrmSessionSlotRepository};
pub use support_type_repository::SeaOrmSupportTypeRepository;
pub use visit_repository::SeaOrmVisitRepository;
