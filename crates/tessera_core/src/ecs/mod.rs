//! # Entity Component System
//!
//! Entities, components, families, processors and the engine that ties
//! them together.
//!
//! ## Design Philosophy
//!
//! - Component records live in fixed-capacity pools, active ones packed first
//! - Entity IDs are table indices with generation counters
//! - Families are bitmask predicates, evaluated fresh on every query
//! - Structural removals during a tick are deferred to the tick boundary

mod component;
mod engine;
mod entity;
mod family;
mod listener;
mod processor;
mod query;

pub use component::{Component, Handle, MAX_COMPONENT_TYPES};
pub use engine::Engine;
pub use entity::{Entity, EntityId, EntityInit};
pub use family::{ComponentSet, Family};
pub use listener::{shared, EntityListener, SharedListener};
pub use processor::{AsAny, Processor};
pub use query::EntityArray;
