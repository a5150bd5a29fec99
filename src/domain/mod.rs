//! Domain layer: entities, value objects and domain events.
pub mod aggregates;
pub mod events;
pub mod value_objects;

pub use aggregates::*;
