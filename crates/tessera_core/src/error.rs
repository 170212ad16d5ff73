//! # Engine Error Types
//!
//! Every fallible operation in the runtime returns [`EcsResult`]. A failed
//! call leaves pools, entities and registries exactly as they were.

use thiserror::Error;

use crate::ecs::EntityId;
use crate::memory::SlotId;

/// Errors that can occur in the ECS runtime.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EcsError {
    /// The pool has no free storage left.
    #[error("pool for component `{component}` is exhausted (capacity {capacity})")]
    PoolExhausted {
        /// Component type name.
        component: &'static str,
        /// Fixed capacity of the pool.
        capacity: usize,
    },

    /// The slot id is not currently allocated in the pool.
    #[error("unknown slot {slot} in pool for component `{component}`")]
    UnknownSlot {
        /// Component type name.
        component: &'static str,
        /// The offending slot id.
        slot: SlotId,
    },

    /// The entity does not own a component of this type.
    #[error("{entity} has no component `{component}`")]
    ComponentNotFound {
        /// The entity queried.
        entity: EntityId,
        /// Component type name.
        component: &'static str,
    },

    /// The entity already owns a component of this type.
    #[error("{entity} already owns a component `{component}`")]
    DuplicateComponent {
        /// The entity.
        entity: EntityId,
        /// Component type name.
        component: &'static str,
    },

    /// The entity is already linked to the engine.
    #[error("{0} is already linked to the engine")]
    EntityAlreadyLinked(EntityId),

    /// The entity is not linked to the engine.
    #[error("{0} is not linked to the engine")]
    EntityNotLinked(EntityId),

    /// The entity id is stale or was never issued by this engine.
    #[error("{0} does not exist")]
    EntityNotFound(EntityId),

    /// A processor of this concrete type is already registered.
    #[error("processor `{0}` is already registered")]
    DuplicateProcessor(&'static str),

    /// No processor of this concrete type is registered.
    #[error("processor `{0}` is not registered")]
    ProcessorNotFound(&'static str),

    /// The listener is already registered (under any family).
    #[error("entity listener is already registered")]
    DuplicateListener,

    /// The listener is not registered.
    #[error("entity listener is not registered")]
    ListenerNotFound,

    /// Indexed access past the end of a query result.
    #[error("query index {index} out of range (len {len})")]
    QueryIndexOutOfRange {
        /// Requested index.
        index: usize,
        /// Length of the query result.
        len: usize,
    },

    /// `run_tick` was called from inside a running tick.
    #[error("a tick is already in progress")]
    TickInProgress,

    /// A pool for this component type already exists.
    #[error("pool for component `{0}` already exists")]
    PoolAlreadyExists(&'static str),

    /// Two distinct component types declare the same tag.
    #[error("component id {id} is used by both `{existing}` and `{requested}`")]
    ComponentIdConflict {
        /// The shared tag.
        id: u8,
        /// Name of the type that first claimed the tag.
        existing: &'static str,
        /// Name of the type that collided with it.
        requested: &'static str,
    },

    /// An entity owns a slot under a tag that has no pool. Indicates a
    /// corrupted engine.
    #[error("no pool registered for component id {0}")]
    MissingPool(u8),

    /// A pool capacity of zero was requested.
    #[error("pool capacity must be greater than zero (component `{0}`)")]
    InvalidCapacity(&'static str),

    /// Invalid configuration file.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for ECS operations.
pub type EcsResult<T> = Result<T, EcsError>;
