//! # Entity Management
//!
//! Entities are lightweight identifiers plus a small record kept by the
//! engine:
//! - Activation and link flags
//! - The slot each owned component occupies in its pool
//! - A bitmask of owned component tags for fast family matching

use std::collections::BTreeMap;
use std::fmt;

use super::component::{component_bit, Component};
use super::engine::Engine;
use crate::error::EcsResult;
use crate::memory::SlotId;

/// Unique identifier for an entity.
///
/// The ID is split into two parts:
/// - Lower 32 bits: Index into the engine's entity table
/// - Upper 32 bits: Generation counter for detecting stale references
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct EntityId(u64);

impl EntityId {
    /// Creates a new entity ID from index and generation.
    ///
    /// # Arguments
    ///
    /// * `index` - The index into the entity table (0 to 2^32-1)
    /// * `generation` - The generation counter (0 to 2^32-1)
    #[inline]
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self(((generation as u64) << 32) | (index as u64))
    }

    /// Returns the index portion of the entity ID.
    #[inline]
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0 as u32
    }

    /// Returns the generation portion of the entity ID.
    #[inline]
    #[must_use]
    pub const fn generation(self) -> u32 {
        (self.0 >> 32) as u32
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "entity {}v{}", self.index(), self.generation())
    }
}

/// Hook run once when an entity is first linked to an engine.
///
/// It runs after linkage, so it may attach components, and before any
/// listener is notified. Closures of the matching shape implement it.
///
/// # Example
///
/// ```rust,ignore
/// let ship = engine.create_entity_with(|engine: &mut Engine, ship| {
///     engine.add_component::<Hull>(ship)?;
///     engine.add_component::<Thruster>(ship)
/// });
/// engine.add_entity(ship)?;
/// ```
pub trait EntityInit: Send + 'static {
    /// Initializes the freshly linked `entity`.
    ///
    /// # Errors
    ///
    /// Any error is returned from [`Engine::add_entity`]; the entity stays
    /// linked.
    fn init(self: Box<Self>, engine: &mut Engine, entity: EntityId) -> EcsResult<()>;
}

impl<F> EntityInit for F
where
    F: FnOnce(&mut Engine, EntityId) -> EcsResult<()> + Send + 'static,
{
    fn init(self: Box<Self>, engine: &mut Engine, entity: EntityId) -> EcsResult<()> {
        (*self)(engine, entity)
    }
}

/// Engine-side record of one entity.
///
/// Obtained read-only through [`Engine::entity`]; all mutation goes through
/// the engine so pool state and entity state never diverge.
pub struct Entity {
    id: EntityId,
    pub(crate) linked: bool,
    pub(crate) active: bool,
    /// Bitmask of owned component tags.
    pub(crate) component_mask: u64,
    /// Component tag -> slot in that tag's pool.
    pub(crate) slots: BTreeMap<u8, SlotId>,
    pub(crate) init: Option<Box<dyn EntityInit>>,
    /// Position in the engine's live list while linked.
    pub(crate) live_index: usize,
    pub(crate) pending_removal: bool,
    pub(crate) pending_destroy: bool,
}

impl Entity {
    pub(crate) fn new(id: EntityId, init: Option<Box<dyn EntityInit>>) -> Self {
        Self {
            id,
            linked: false,
            active: false,
            component_mask: 0,
            slots: BTreeMap::new(),
            init,
            live_index: 0,
            pending_removal: false,
            pending_destroy: false,
        }
    }

    /// The entity's id.
    #[inline]
    #[must_use]
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Whether the entity is active (visible to family queries).
    #[inline]
    #[must_use]
    pub const fn is_active(&self) -> bool {
        self.active
    }

    /// Whether the entity is linked to the engine.
    #[inline]
    #[must_use]
    pub const fn is_linked(&self) -> bool {
        self.linked
    }

    /// Bitmask of owned component tags.
    #[inline]
    #[must_use]
    pub const fn component_mask(&self) -> u64 {
        self.component_mask
    }

    /// Number of owned components.
    #[inline]
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.slots.len()
    }

    /// Checks if this entity owns a component of type `C`.
    #[inline]
    #[must_use]
    pub fn has_component<C: Component>(&self) -> bool {
        self.component_mask & component_bit::<C>() != 0
    }

    /// Slot of the owned component of type `C`, if any.
    #[inline]
    #[must_use]
    pub fn slot_of<C: Component>(&self) -> Option<SlotId> {
        self.slots.get(&C::ID).copied()
    }

    pub(crate) fn attach(&mut self, tag: u8, slot: SlotId) {
        self.slots.insert(tag, slot);
        self.component_mask |= 1u64 << tag;
    }

    pub(crate) fn detach(&mut self, tag: u8) {
        self.slots.remove(&tag);
        self.component_mask &= !(1u64 << tag);
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("linked", &self.linked)
            .field("active", &self.active)
            .field("component_mask", &format_args!("{:#x}", self.component_mask))
            .finish_non_exhaustive()
    }
}
