//! # Tessera Core
//!
//! In-process Entity Component System (ECS) runtime for real-time
//! simulations:
//! - Components are plain data in fixed-capacity, per-type record pools
//! - Active records stay packed at the front of each pool
//! - Processors run once per tick in priority order
//! - Families query the live entity population declaratively
//!
//! ## Architecture Rules
//!
//! 1. **No pool growth** - Capacity is fixed when a pool is created
//! 2. **O(1) structural changes** - Allocate, free, activate and deactivate are position swaps
//! 3. **Tick-consistent removal** - Entities removed mid-tick stay visible until the tick ends
//!
//! ## Example
//!
//! ```rust,ignore
//! use tessera_core::{Engine, Family};
//!
//! let mut engine = Engine::new();
//! let ship = engine.create_entity();
//! engine.add_entity(ship)?;
//! engine.add_component::<Position>(ship)?;
//! engine.activate_entity(ship)?;
//!
//! let movers = engine.get_entities_for(&Family::new().filter::<Position>());
//! ```

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![deny(clippy::perf)]

pub mod config;
pub mod ecs;
pub mod error;
pub mod memory;

pub use config::{EngineConfig, DEFAULT_POOL_CAPACITY};
pub use ecs::{
    shared, AsAny, Component, ComponentSet, Engine, Entity, EntityArray, EntityId, EntityInit,
    EntityListener, Family, Handle, Processor, SharedListener, MAX_COMPONENT_TYPES,
};
pub use error::{EcsError, EcsResult};
pub use memory::{PoolStats, RecordPool, SlotId};
