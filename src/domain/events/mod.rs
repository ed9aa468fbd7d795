//! Domain events
//!
//! Facts about the booking lifecycle. The `EventBus` that carries them lives
//! in `application::events`.

pub mod types;

pub use types::{
    ApplicationEvent, ApplicationReleasedEvent, Event, EventMessage, VisitCancelledEvent,
    VisitEvent,
};
