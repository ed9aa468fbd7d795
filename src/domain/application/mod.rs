//! Application aggregate
//!
//! An application is the reservation half of the booking lifecycle: it holds
//! a place in a session slot until it is booked or reclaimed.

pub mod model;

pub use model::{expiry_cutoff, generate_reference, requires_reservation, Application};
