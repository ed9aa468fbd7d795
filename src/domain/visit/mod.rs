//! Visit aggregate

pub mod model;

pub use model::{Visit, VisitNote};
