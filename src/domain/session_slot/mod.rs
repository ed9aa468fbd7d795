//! Session slot aggregate

pub mod model;

pub use model::SessionSlot;
