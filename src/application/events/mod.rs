//! Application events (pub/sub)
//!
//! Event types are defined in `domain::events`. The `EventBus`
//! implementation (broadcast channel) lives here in the application layer.

pub mod event_bus;

pub use crate::domain::events::{Event, EventMessage};

pub use event_bus::{create_event_bus, EventBus, EventSubscriber, SharedEventBus};
