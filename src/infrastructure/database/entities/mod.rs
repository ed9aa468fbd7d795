//! Database entities module

pub mod application;
pub mod application_contact;
pub mod application_support;
pub mod application_visitor;
pub mod session_slot;
pub mod support_type;
pub mod visit;
pub mod visit_contact;
pub mod visit_note;
pub mod visit_support;
pub mod visit_visitor;

pub use application::Entity as Application;
pub use session_slot::Entity as SessionSlot;
pub use support_type::Entity as SupportType;
pub use visit::Entity as Visit;
