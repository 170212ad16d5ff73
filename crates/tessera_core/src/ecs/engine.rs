//! # Engine
//!
//! The engine owns everything: one record pool per component type, the
//! entity table, processor and listener registrations, and the tick
//! scheduler.
//!
//! ## Tick protocol
//!
//! While [`Engine::run_tick`] is running processors, entity removals are
//! only queued. The queue is flushed in request order once every processor
//! has run, so a query issued late in a tick still sees entities removed
//! earlier in the same tick.
//!
//! ## Activation binding
//!
//! For every linked entity, each owned component's slot is active exactly
//! when the entity is active. All entity operations below preserve this.

use std::any::TypeId;
use std::sync::Arc;

use super::component::{component_bit, Component, Handle, MAX_COMPONENT_TYPES};
use super::entity::{Entity, EntityId, EntityInit};
use super::family::Family;
use super::listener::{ListenerEntry, SharedListener};
use super::processor::{Processor, ProcessorEntry};
use super::query::EntityArray;
use crate::config::EngineConfig;
use crate::error::{EcsError, EcsResult};
use crate::memory::{ErasedPool, PoolStats, RecordPool, SlotId};

/// A pool registration.
struct PoolEntry {
    type_id: TypeId,
    pool: Box<dyn ErasedPool>,
}

/// Table index of a component type.
#[inline]
fn tag_index<C: Component>() -> usize {
    // Referencing the bit forces the compile-time tag range check.
    let _ = component_bit::<C>();
    usize::from(C::ID)
}

/// The ECS engine.
///
/// Single-threaded: the engine may be moved between threads but is never
/// shared. No operation blocks.
///
/// # Example
///
/// ```rust,ignore
/// let mut engine = Engine::new();
///
/// let ship = engine.create_entity();
/// engine.add_entity(ship)?;
/// engine.add_component::<Position>(ship)?;
/// engine.activate_entity(ship)?;
///
/// engine.add_processor(Integrate, 10)?;
/// engine.activate_processor::<Integrate>()?;
/// engine.run_tick(16)?;
/// ```
pub struct Engine {
    config: EngineConfig,
    /// Pools indexed by component tag.
    pools: Vec<Option<PoolEntry>>,
    /// Entity table indexed by `EntityId::index`; `None` for retired slots.
    entities: Vec<Option<Entity>>,
    /// Current generation of every table index.
    generations: Vec<u32>,
    /// Retired table indices available for reuse.
    free_indices: Vec<u32>,
    /// Linked entities.
    live: Vec<EntityId>,
    /// Sorted by `(priority, sequence)`.
    processors: Vec<ProcessorEntry>,
    /// Sorted by `(priority, sequence)`.
    listeners: Vec<ListenerEntry>,
    next_sequence: u64,
    ticking: bool,
    /// Removals requested during the current tick, in request order.
    pending_removals: Vec<EntityId>,
    tick_count: u64,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// Creates an engine with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: EngineConfig::default(),
            pools: (0..MAX_COMPONENT_TYPES).map(|_| None).collect(),
            entities: Vec::new(),
            generations: Vec::new(),
            free_indices: Vec::new(),
            live: Vec::new(),
            processors: Vec::new(),
            listeners: Vec::new(),
            next_sequence: 0,
            ticking: false,
            pending_removals: Vec::new(),
            tick_count: 0,
        }
    }

    /// Creates an engine with the given configuration.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidConfig`] if the configuration is invalid.
    pub fn with_config(config: EngineConfig) -> EcsResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            ..Self::new()
        })
    }

    /// The engine's configuration.
    #[inline]
    #[must_use]
    pub const fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether processors are currently running.
    #[inline]
    #[must_use]
    pub const fn is_ticking(&self) -> bool {
        self.ticking
    }

    /// Number of ticks started so far.
    #[inline]
    #[must_use]
    pub const fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // =========================================================================
    // Entities
    // =========================================================================

    /// Creates a standalone, unlinked, inactive entity.
    ///
    /// # Panics
    ///
    /// Panics if the entity table would exceed `u32::MAX` entries.
    pub fn create_entity(&mut self) -> EntityId {
        self.allocate_entity(None)
    }

    /// Creates a standalone entity whose `init` hook runs when it is first
    /// linked.
    ///
    /// # Panics
    ///
    /// Panics if the entity table would exceed `u32::MAX` entries.
    pub fn create_entity_with(&mut self, init: impl EntityInit) -> EntityId {
        self.allocate_entity(Some(Box::new(init)))
    }

    fn allocate_entity(&mut self, init: Option<Box<dyn EntityInit>>) -> EntityId {
        let index = if let Some(index) = self.free_indices.pop() {
            index
        } else {
            let index = u32::try_from(self.entities.len())
                .unwrap_or_else(|_| panic!("entity table exceeds u32::MAX entries"));
            self.entities.push(None);
            self.generations.push(0);
            index
        };

        let id = EntityId::new(index, self.generations[index as usize]);
        self.entities[index as usize] = Some(Entity::new(id, init));
        id
    }

    /// Read-only view of an entity.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] for stale or unknown ids.
    pub fn entity(&self, id: EntityId) -> EcsResult<&Entity> {
        self.entities
            .get(id.index() as usize)
            .and_then(Option::as_ref)
            .filter(|entity| entity.id() == id)
            .ok_or(EcsError::EntityNotFound(id))
    }

    fn entity_mut(&mut self, id: EntityId) -> EcsResult<&mut Entity> {
        self.entities
            .get_mut(id.index() as usize)
            .and_then(Option::as_mut)
            .filter(|entity| entity.id() == id)
            .ok_or(EcsError::EntityNotFound(id))
    }

    fn linked_entity(&self, id: EntityId) -> EcsResult<&Entity> {
        let entity = self.entity(id)?;
        if entity.linked {
            Ok(entity)
        } else {
            Err(EcsError::EntityNotLinked(id))
        }
    }

    /// Checks if `id` refers to a linked entity.
    #[must_use]
    pub fn is_linked(&self, id: EntityId) -> bool {
        self.entity(id).is_ok_and(Entity::is_linked)
    }

    /// Checks if `id` refers to an active entity.
    #[must_use]
    pub fn is_entity_active(&self, id: EntityId) -> bool {
        self.entity(id).is_ok_and(Entity::is_active)
    }

    /// Linked entities, in no particular order.
    #[inline]
    #[must_use]
    pub fn live_entities(&self) -> &[EntityId] {
        &self.live
    }

    /// Number of linked entities.
    #[inline]
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.live.len()
    }

    /// Links an entity to the engine.
    ///
    /// Runs the entity's init hook (first link only), then notifies every
    /// listener whose family matches the entity, active or not.
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityAlreadyLinked`] if the entity is linked
    /// - [`EcsError::EntityNotFound`] for stale ids
    /// - any error returned by the init hook; the entity is unlinked again,
    ///   components attached to it are torn down and no listener is
    ///   notified. The hook is consumed and does not run on a later link.
    pub fn add_entity(&mut self, id: EntityId) -> EcsResult<()> {
        let live_index = self.live.len();
        let entity = self.entity_mut(id)?;
        if entity.linked {
            return Err(EcsError::EntityAlreadyLinked(id));
        }

        entity.linked = true;
        entity.live_index = live_index;
        let init = entity.init.take();
        self.live.push(id);
        tracing::debug!("Linked {id}");

        if let Some(init) = init {
            if let Err(err) = init.init(self, id) {
                if self.is_linked(id) {
                    self.detach_entity(id)?;
                }
                tracing::debug!("Init hook of {id} failed: {err}");
                return Err(err);
            }
        }

        self.notify(id, true);
        Ok(())
    }

    /// Unlinks an entity, tearing down every component it owns.
    ///
    /// Outside a tick this happens immediately. During a tick the removal
    /// is queued and applied, in request order, after the last processor.
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityNotLinked`] if the entity is not linked
    /// - [`EcsError::EntityNotFound`] for stale ids
    pub fn remove_entity(&mut self, id: EntityId) -> EcsResult<()> {
        let ticking = self.ticking;
        let entity = self.entity_mut(id)?;
        if !entity.linked {
            return Err(EcsError::EntityNotLinked(id));
        }

        if ticking {
            if !entity.pending_removal {
                entity.pending_removal = true;
                self.pending_removals.push(id);
                tracing::trace!("Queued removal of {id}");
            }
            return Ok(());
        }

        self.unlink(id)
    }

    /// Removes an entity if linked and retires its id for good.
    ///
    /// During a tick a linked entity is retired when the removal queue is
    /// flushed.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] for stale ids.
    pub fn destroy_entity(&mut self, id: EntityId) -> EcsResult<()> {
        let entity = self.entity_mut(id)?;
        if entity.linked {
            entity.pending_destroy = true;
            self.remove_entity(id)
        } else {
            self.retire(id);
            Ok(())
        }
    }

    fn unlink(&mut self, id: EntityId) -> EcsResult<()> {
        self.notify(id, false);
        self.detach_entity(id)
    }

    /// Tears down components and drops the entity from the live list,
    /// without notifying listeners.
    fn detach_entity(&mut self, id: EntityId) -> EcsResult<()> {
        self.remove_all_components(id)?;

        let entity = self.entity_mut(id)?;
        entity.linked = false;
        entity.pending_removal = false;
        let live_index = entity.live_index;
        let destroy = entity.pending_destroy;

        self.live.swap_remove(live_index);
        let moved = self.live.get(live_index).copied();
        if let Some(moved) = moved {
            self.entity_mut(moved)?.live_index = live_index;
        }
        tracing::debug!("Unlinked {id}");

        if destroy {
            self.retire(id);
        }
        Ok(())
    }

    fn retire(&mut self, id: EntityId) {
        let index = id.index() as usize;
        self.entities[index] = None;
        self.generations[index] = self.generations[index].wrapping_add(1);
        self.free_indices.push(id.index());
    }

    /// Activates an entity and every component slot it owns.
    /// Activating an active entity is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] for stale ids.
    pub fn activate_entity(&mut self, id: EntityId) -> EcsResult<()> {
        self.set_entity_active(id, true)
    }

    /// Deactivates an entity and every component slot it owns.
    /// Deactivating an inactive entity is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] for stale ids.
    pub fn deactivate_entity(&mut self, id: EntityId) -> EcsResult<()> {
        self.set_entity_active(id, false)
    }

    fn set_entity_active(&mut self, id: EntityId, active: bool) -> EcsResult<()> {
        let entity = self.entity(id)?;
        if entity.active == active {
            return Ok(());
        }

        let slots: Vec<(u8, SlotId)> = entity.slots.iter().map(|(&t, &s)| (t, s)).collect();
        for (tag, slot) in slots {
            let pool = self.erased_pool_mut(tag)?;
            if active {
                pool.activate(slot)?;
            } else {
                pool.deactivate(slot)?;
            }
        }

        self.entity_mut(id)?.active = active;
        Ok(())
    }

    /// Entities matching `family`, active ones only.
    ///
    /// The result is a snapshot; later changes do not affect it.
    #[must_use]
    pub fn get_entities_for(&self, family: &Family) -> EntityArray {
        let matching = self
            .live
            .iter()
            .copied()
            .filter(|&id| self.entity(id).is_ok_and(|entity| family.matches(entity)))
            .collect();
        EntityArray::from_vec(matching)
    }

    // =========================================================================
    // Components
    // =========================================================================

    /// Attaches a default `C` to a linked entity.
    ///
    /// Runs `C::init` and activates the slot if the entity is active.
    ///
    /// # Errors
    ///
    /// - [`EcsError::EntityNotLinked`] if the entity is not linked
    /// - [`EcsError::DuplicateComponent`] if it already owns a `C`
    /// - [`EcsError::PoolExhausted`] if `C`'s pool is full
    /// - [`EcsError::ComponentIdConflict`] if another type claimed `C::ID`
    pub fn add_component<C: Component>(&mut self, id: EntityId) -> EcsResult<Handle<C>> {
        self.add_component_with(id, C::default())
    }

    /// Attaches `value` to a linked entity.
    ///
    /// # Errors
    ///
    /// Same as [`Engine::add_component`].
    pub fn add_component_with<C: Component>(
        &mut self,
        id: EntityId,
        value: C,
    ) -> EcsResult<Handle<C>> {
        let active = self.linked_entity(id)?.active;
        if self.has_component::<C>(id) {
            return Err(EcsError::DuplicateComponent {
                entity: id,
                component: C::NAME,
            });
        }

        let pool = self.pool_or_create::<C>()?;
        let slot = pool.allocate()?;
        let record = pool.get_mut(slot)?;
        *record = value;
        record.init(id);
        if active {
            pool.activate(slot)?;
        }

        self.entity_mut(id)?.attach(C::ID, slot);
        Ok(Handle::new(slot))
    }

    /// Detaches the entity's `C`: runs `C::shutdown`, then frees the slot.
    ///
    /// # Errors
    ///
    /// - [`EcsError::ComponentNotFound`] if the entity owns no `C`
    /// - [`EcsError::EntityNotFound`] for stale ids
    pub fn remove_component<C: Component>(&mut self, id: EntityId) -> EcsResult<()> {
        let slot = self.owned_slot::<C>(id)?;
        self.erased_pool_mut(C::ID)?.release(slot, id)?;
        self.entity_mut(id)?.detach(C::ID);
        Ok(())
    }

    /// Detaches every component the entity owns.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] for stale ids.
    pub fn remove_all_components(&mut self, id: EntityId) -> EcsResult<()> {
        let slots: Vec<(u8, SlotId)> = self
            .entity(id)?
            .slots
            .iter()
            .map(|(&t, &s)| (t, s))
            .collect();

        for (tag, slot) in slots {
            self.erased_pool_mut(tag)?.release(slot, id)?;
            self.entity_mut(id)?.detach(tag);
        }
        Ok(())
    }

    /// Checks if the entity owns a `C`. Unknown ids own nothing.
    ///
    /// A record of another type sharing `C::ID` does not count.
    #[must_use]
    pub fn has_component<C: Component>(&self, id: EntityId) -> bool {
        self.owned_slot::<C>(id).is_ok()
    }

    /// The entity's `C`.
    ///
    /// # Errors
    ///
    /// - [`EcsError::ComponentNotFound`] if the entity owns no `C`
    /// - [`EcsError::EntityNotFound`] for stale ids
    pub fn get_component<C: Component>(&self, id: EntityId) -> EcsResult<&C> {
        let slot = self.owned_slot::<C>(id)?;
        self.typed_pool::<C>()?.get(slot)
    }

    /// The entity's `C`, mutably.
    ///
    /// # Errors
    ///
    /// Same as [`Engine::get_component`].
    pub fn get_component_mut<C: Component>(&mut self, id: EntityId) -> EcsResult<&mut C> {
        let slot = self.owned_slot::<C>(id)?;
        self.typed_pool_mut::<C>()?.get_mut(slot)
    }

    /// Stable handle to the entity's `C`.
    ///
    /// # Errors
    ///
    /// Same as [`Engine::get_component`].
    pub fn component_handle<C: Component>(&self, id: EntityId) -> EcsResult<Handle<C>> {
        self.owned_slot::<C>(id).map(Handle::new)
    }

    /// Resolves a handle to its record.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownSlot`] once the record has been freed.
    pub fn resolve<C: Component>(&self, handle: Handle<C>) -> EcsResult<&C> {
        self.pool::<C>()
            .ok_or(EcsError::UnknownSlot {
                component: C::NAME,
                slot: handle.slot(),
            })?
            .get(handle.slot())
    }

    /// Resolves a handle to its record, mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownSlot`] once the record has been freed.
    pub fn resolve_mut<C: Component>(&mut self, handle: Handle<C>) -> EcsResult<&mut C> {
        self.pool_mut::<C>()
            .ok_or(EcsError::UnknownSlot {
                component: C::NAME,
                slot: handle.slot(),
            })?
            .get_mut(handle.slot())
    }

    fn owned_slot<C: Component>(&self, id: EntityId) -> EcsResult<SlotId> {
        self.entity(id)?
            .slot_of::<C>()
            .filter(|_| self.pool_holds::<C>())
            .ok_or(EcsError::ComponentNotFound {
                entity: id,
                component: C::NAME,
            })
    }

    // =========================================================================
    // Pools
    // =========================================================================

    /// Creates `C`'s pool up front with an explicit capacity.
    ///
    /// # Errors
    ///
    /// - [`EcsError::PoolAlreadyExists`] if the pool exists
    /// - [`EcsError::ComponentIdConflict`] if another type claimed `C::ID`
    /// - [`EcsError::InvalidCapacity`] if `capacity` is zero
    pub fn reserve_pool<C: Component>(&mut self, capacity: usize) -> EcsResult<()> {
        match &self.pools[tag_index::<C>()] {
            Some(entry) if entry.type_id == TypeId::of::<C>() => {
                Err(EcsError::PoolAlreadyExists(C::NAME))
            }
            Some(entry) => Err(EcsError::ComponentIdConflict {
                id: C::ID,
                existing: entry.pool.component_name(),
                requested: C::NAME,
            }),
            None => self.install_pool::<C>(capacity),
        }
    }

    /// `C`'s pool, if it has been created.
    #[must_use]
    pub fn pool<C: Component>(&self) -> Option<&RecordPool<C>> {
        self.pools[tag_index::<C>()]
            .as_ref()?
            .pool
            .as_any()
            .downcast_ref()
    }

    /// `C`'s pool, mutably.
    ///
    /// Only record contents should be changed through this; structural
    /// changes belong to entity operations.
    pub fn pool_mut<C: Component>(&mut self) -> Option<&mut RecordPool<C>> {
        self.pools[tag_index::<C>()]
            .as_mut()?
            .pool
            .as_any_mut()
            .downcast_mut()
    }

    /// Occupancy of `C`'s pool, if it has been created.
    #[must_use]
    pub fn pool_stats<C: Component>(&self) -> Option<PoolStats> {
        self.pool::<C>().map(RecordPool::stats)
    }

    /// Occupancy of every created pool, by component name.
    #[must_use]
    pub fn all_pool_stats(&self) -> Vec<(&'static str, PoolStats)> {
        self.pools
            .iter()
            .flatten()
            .map(|entry| (entry.pool.component_name(), entry.pool.stats()))
            .collect()
    }

    /// The contiguous run of active `C` records.
    #[must_use]
    pub fn active_components<C: Component>(&self) -> &[C] {
        match self.pool::<C>() {
            Some(pool) => pool.active(),
            None => &[],
        }
    }

    /// The contiguous run of active `C` records, mutably.
    pub fn active_components_mut<C: Component>(&mut self) -> &mut [C] {
        match self.pool_mut::<C>() {
            Some(pool) => pool.active_mut(),
            None => &mut [],
        }
    }

    /// Whether the pool under `C::ID` stores `C` records.
    fn pool_holds<C: Component>(&self) -> bool {
        self.pools[tag_index::<C>()]
            .as_ref()
            .is_some_and(|entry| entry.type_id == TypeId::of::<C>())
    }

    fn install_pool<C: Component>(&mut self, capacity: usize) -> EcsResult<()> {
        let pool = RecordPool::<C>::new(capacity)?;
        self.pools[tag_index::<C>()] = Some(PoolEntry {
            type_id: TypeId::of::<C>(),
            pool: Box::new(pool),
        });
        tracing::debug!("Created pool for {} (capacity {})", C::NAME, capacity);
        Ok(())
    }

    fn pool_or_create<C: Component>(&mut self) -> EcsResult<&mut RecordPool<C>> {
        if self.pools[tag_index::<C>()].is_none() {
            let capacity = self.config.capacity_for(C::NAME);
            self.install_pool::<C>(capacity)?;
        }
        self.typed_pool_mut::<C>()
    }

    fn typed_pool<C: Component>(&self) -> EcsResult<&RecordPool<C>> {
        let entry = self.pools[tag_index::<C>()]
            .as_ref()
            .ok_or(EcsError::UnknownSlot {
                component: C::NAME,
                slot: SlotId::new(0),
            })?;
        let conflict = EcsError::ComponentIdConflict {
            id: C::ID,
            existing: entry.pool.component_name(),
            requested: C::NAME,
        };
        entry.pool.as_any().downcast_ref().ok_or(conflict)
    }

    fn typed_pool_mut<C: Component>(&mut self) -> EcsResult<&mut RecordPool<C>> {
        let entry = self.pools[tag_index::<C>()]
            .as_mut()
            .ok_or(EcsError::UnknownSlot {
                component: C::NAME,
                slot: SlotId::new(0),
            })?;
        let conflict = EcsError::ComponentIdConflict {
            id: C::ID,
            existing: entry.pool.component_name(),
            requested: C::NAME,
        };
        entry.pool.as_any_mut().downcast_mut().ok_or(conflict)
    }

    fn erased_pool_mut(&mut self, tag: u8) -> EcsResult<&mut dyn ErasedPool> {
        match self.pools.get_mut(usize::from(tag)) {
            Some(Some(entry)) => Ok(entry.pool.as_mut()),
            _ => Err(EcsError::MissingPool(tag)),
        }
    }

    // =========================================================================
    // Processors
    // =========================================================================

    /// Registers a processor. It starts inactive.
    ///
    /// Lower priorities run first; equal priorities run in registration
    /// order. A processor registered during a tick first runs next tick.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateProcessor`] if a `P` is registered.
    pub fn add_processor<P: Processor>(&mut self, processor: P, priority: u32) -> EcsResult<()> {
        if self.processor_position::<P>().is_ok() {
            return Err(EcsError::DuplicateProcessor(std::any::type_name::<P>()));
        }

        let sequence = self.next_sequence();
        let entry = ProcessorEntry::new(processor, priority, sequence);
        let at = self
            .processors
            .partition_point(|e| (e.priority, e.sequence) < (priority, sequence));
        tracing::debug!("Registered processor {} (priority {})", entry.name, priority);
        self.processors.insert(at, entry);
        Ok(())
    }

    /// The registered `P`.
    ///
    /// A processor cannot look itself up while it is running.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ProcessorNotFound`] if no `P` is registered.
    pub fn get_processor<P: Processor>(&self) -> EcsResult<&P> {
        let position = self.processor_position::<P>()?;
        self.processors[position]
            .downcast_ref()
            .ok_or(EcsError::ProcessorNotFound(std::any::type_name::<P>()))
    }

    /// The registered `P`, mutably.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ProcessorNotFound`] if no `P` is registered.
    pub fn get_processor_mut<P: Processor>(&mut self) -> EcsResult<&mut P> {
        let position = self.processor_position::<P>()?;
        self.processors[position]
            .downcast_mut()
            .ok_or(EcsError::ProcessorNotFound(std::any::type_name::<P>()))
    }

    /// Unregisters `P`. Removing a processor during a tick keeps it from
    /// running later in that tick.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ProcessorNotFound`] if no `P` is registered.
    pub fn remove_processor<P: Processor>(&mut self) -> EcsResult<()> {
        let position = self.processor_position::<P>()?;
        let entry = self.processors.remove(position);
        tracing::debug!("Removed processor {}", entry.name);
        Ok(())
    }

    /// Lets `P` run on ticks.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ProcessorNotFound`] if no `P` is registered.
    pub fn activate_processor<P: Processor>(&mut self) -> EcsResult<()> {
        let position = self.processor_position::<P>()?;
        self.processors[position].active = true;
        Ok(())
    }

    /// Stops `P` from running on ticks.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ProcessorNotFound`] if no `P` is registered.
    pub fn deactivate_processor<P: Processor>(&mut self) -> EcsResult<()> {
        let position = self.processor_position::<P>()?;
        self.processors[position].active = false;
        Ok(())
    }

    /// Whether `P` runs on ticks.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ProcessorNotFound`] if no `P` is registered.
    pub fn is_processor_active<P: Processor>(&self) -> EcsResult<bool> {
        let position = self.processor_position::<P>()?;
        Ok(self.processors[position].active)
    }

    /// Number of registered processors.
    #[inline]
    #[must_use]
    pub fn processor_count(&self) -> usize {
        self.processors.len()
    }

    fn processor_position<P: Processor>(&self) -> EcsResult<usize> {
        let type_id = TypeId::of::<P>();
        self.processors
            .iter()
            .position(|entry| entry.type_id == type_id)
            .ok_or(EcsError::ProcessorNotFound(std::any::type_name::<P>()))
    }

    fn next_sequence(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Registers a listener for entities matching `family`.
    ///
    /// Lower priorities are notified first; equal priorities in
    /// registration order.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateListener`] if the listener is registered
    /// under any family.
    pub fn add_listener(
        &mut self,
        listener: SharedListener,
        family: Family,
        priority: u32,
    ) -> EcsResult<()> {
        if self.listeners.iter().any(|entry| entry.is(&listener)) {
            return Err(EcsError::DuplicateListener);
        }

        let sequence = self.next_sequence();
        let at = self
            .listeners
            .partition_point(|e| (e.priority, e.sequence) < (priority, sequence));
        self.listeners.insert(
            at,
            ListenerEntry {
                priority,
                sequence,
                family,
                listener,
            },
        );
        tracing::debug!("Registered entity listener (priority {priority})");
        Ok(())
    }

    /// Unregisters a listener.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::ListenerNotFound`] if it is not registered.
    pub fn remove_listener(&mut self, listener: &SharedListener) -> EcsResult<()> {
        let position = self
            .listeners
            .iter()
            .position(|entry| entry.is(listener))
            .ok_or(EcsError::ListenerNotFound)?;
        self.listeners.remove(position);
        Ok(())
    }

    /// Number of registered listeners.
    #[inline]
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn notify(&self, id: EntityId, added: bool) {
        let Ok(entity) = self.entity(id) else {
            return;
        };

        let targets: Vec<SharedListener> = self
            .listeners
            .iter()
            .filter(|entry| entry.family.matches_with(entity, false))
            .map(|entry| Arc::clone(&entry.listener))
            .collect();

        for listener in targets {
            let mut listener = listener.lock();
            if added {
                listener.entity_added(self, id);
            } else {
                listener.entity_removed(self, id);
            }
        }
    }

    // =========================================================================
    // Tick
    // =========================================================================

    /// Runs every active processor once, in priority order, then applies
    /// the removals requested during the pass.
    ///
    /// # Errors
    ///
    /// - [`EcsError::TickInProgress`] if called from inside a tick
    /// - the first error returned by a processor; the remaining processors
    ///   still run and queued removals are still applied
    pub fn run_tick(&mut self, delay: u32) -> EcsResult<()> {
        if self.ticking {
            return Err(EcsError::TickInProgress);
        }

        self.ticking = true;
        self.tick_count += 1;
        tracing::trace!("Tick {} started (delay {delay})", self.tick_count);

        let schedule: Vec<u64> = self.processors.iter().map(|e| e.sequence).collect();
        let mut outcome = Ok(());

        for sequence in schedule {
            let Some(position) = self.scheduled_position(sequence) else {
                continue;
            };
            let entry = &mut self.processors[position];
            if !entry.active {
                continue;
            }
            let Some(mut processor) = entry.processor.take() else {
                continue;
            };

            let result = processor.run_tick(self, delay);

            // Looked up again: the processor may have changed the registry.
            if let Some(position) = self.scheduled_position(sequence) {
                self.processors[position].processor = Some(processor);
            }

            if let Err(err) = result {
                tracing::debug!("Processor failed during tick {}: {err}", self.tick_count);
                if outcome.is_ok() {
                    outcome = Err(err);
                }
            }
        }

        self.ticking = false;
        let flushed = self.flush_removals();
        tracing::trace!("Tick {} finished", self.tick_count);

        outcome.and(flushed)
    }

    fn scheduled_position(&self, sequence: u64) -> Option<usize> {
        self.processors
            .iter()
            .position(|entry| entry.sequence == sequence)
    }

    fn flush_removals(&mut self) -> EcsResult<()> {
        let queue = std::mem::take(&mut self.pending_removals);
        if !queue.is_empty() {
            tracing::debug!("Applying {} deferred removals", queue.len());
        }

        let mut outcome = Ok(());
        for id in queue {
            let pending = self.entity(id).is_ok_and(|e| e.linked && e.pending_removal);
            if !pending {
                continue;
            }
            if let Err(err) = self.unlink(id) {
                if outcome.is_ok() {
                    outcome = Err(err);
                }
            }
        }
        outcome
    }
}
