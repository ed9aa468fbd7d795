pub mod dto;
pub mod events;
pub mod services;

// Re-export key types for convenience
pub use dto::{BookingRequest, CancelVisitRequest, ChangeApplicationRequest, CreateApplicationRequest};
pub use events::{create_event_bus, EventBus, EventSubscriber, SharedEventBus};
pub use services::{
    start_application_expiry_task, ApplicationLifecycle, ApplicationService, BookingOrchestrator,
    Collaborators, ExpiryReclaimer, VisitService,
};
