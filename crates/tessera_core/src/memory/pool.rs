//! # Record Pool
//!
//! Fixed-capacity, per-component-type storage that keeps records packed:
//!
//! ```text
//! [ active ... | allocated, inactive ... | free ... ]
//! 0          active                  allocated   capacity
//! ```
//!
//! Every structural operation is a bounded number of position swaps, so
//! allocate/free/activate/deactivate are all O(1) regardless of pool size.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use crate::ecs::{Component, EntityId};
use crate::error::{EcsError, EcsResult};

/// Identifier of a record slot in a pool.
///
/// Ids are handed out in increasing order and never reused, even after the
/// slot is freed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct SlotId(u64);

impl SlotId {
    /// Creates a slot id from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Occupancy counters of a pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Total number of record slots.
    pub capacity: usize,
    /// Slots currently allocated.
    pub allocated: usize,
    /// Allocated slots currently active.
    pub active: usize,
}

/// A fixed-capacity pool of component records.
///
/// Positions `[0, active)` hold exactly the active slots and positions
/// `[0, allocated)` hold exactly the allocated slots. Records are moved
/// between positions by raw swap; no hook runs on relocation.
///
/// # Thread Safety
///
/// This pool is NOT synchronized. It is owned and mutated by one engine.
///
/// # Example
///
/// ```rust,ignore
/// let mut pool: RecordPool<Health> = RecordPool::new(100)?;
///
/// let id = pool.allocate()?;
/// pool.activate(id)?;
/// assert_eq!(pool.active().len(), 1);
///
/// pool.free(id)?;
/// ```
pub struct RecordPool<C: Component> {
    /// Record storage, pre-allocated at full capacity.
    records: Box<[C]>,
    /// Position -> slot id, meaningful for `[0, allocated)`.
    position_ids: Box<[SlotId]>,
    /// Slot id -> position, one entry per allocated slot.
    id_positions: HashMap<SlotId, usize>,
    /// Number of active slots.
    active: usize,
    /// Number of allocated slots.
    allocated: usize,
    /// Next id to hand out.
    next_id: u64,
}

impl<C: Component> RecordPool<C> {
    /// Creates a new pool with the specified capacity.
    ///
    /// All record memory is pre-allocated upfront.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::InvalidCapacity`] if `capacity` is zero.
    pub fn new(capacity: usize) -> EcsResult<Self> {
        if capacity == 0 {
            return Err(EcsError::InvalidCapacity(C::NAME));
        }

        Ok(Self {
            records: vec![C::default(); capacity].into_boxed_slice(),
            position_ids: vec![SlotId(0); capacity].into_boxed_slice(),
            id_positions: HashMap::with_capacity(capacity),
            active: 0,
            allocated: 0,
            next_id: 0,
        })
    }

    /// Returns the total capacity.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.records.len()
    }

    /// Returns the number of allocated slots.
    #[inline]
    #[must_use]
    pub const fn allocated_count(&self) -> usize {
        self.allocated
    }

    /// Returns the number of active slots.
    #[inline]
    #[must_use]
    pub const fn active_count(&self) -> usize {
        self.active
    }

    /// Returns the number of free slots.
    #[inline]
    #[must_use]
    pub fn free_count(&self) -> usize {
        self.capacity() - self.allocated
    }

    /// Returns the occupancy counters.
    #[must_use]
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.capacity(),
            allocated: self.allocated,
            active: self.active,
        }
    }

    /// Allocates an inactive slot holding `C::default()`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::PoolExhausted`] if every slot is allocated.
    pub fn allocate(&mut self) -> EcsResult<SlotId> {
        if self.allocated == self.capacity() {
            return Err(EcsError::PoolExhausted {
                component: C::NAME,
                capacity: self.capacity(),
            });
        }

        let position = self.allocated;
        let id = SlotId(self.next_id);
        self.next_id += 1;

        self.records[position] = C::default();
        self.position_ids[position] = id;
        self.id_positions.insert(id, position);
        self.allocated += 1;

        Ok(id)
    }

    /// Frees an allocated slot, deactivating it first if needed.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownSlot`] if `id` is not allocated.
    pub fn free(&mut self, id: SlotId) -> EcsResult<()> {
        self.deactivate(id)?;

        let position = self.position(id)?;
        let last = self.allocated - 1;
        self.swap_positions(position, last);
        self.allocated = last;
        self.id_positions.remove(&id);

        Ok(())
    }

    /// Activates an allocated slot. Activating an active slot is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownSlot`] if `id` is not allocated.
    pub fn activate(&mut self, id: SlotId) -> EcsResult<()> {
        let position = self.position(id)?;
        if position < self.active {
            return Ok(());
        }

        self.swap_positions(position, self.active);
        self.active += 1;

        Ok(())
    }

    /// Deactivates an allocated slot. Deactivating an inactive slot is a no-op.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownSlot`] if `id` is not allocated.
    pub fn deactivate(&mut self, id: SlotId) -> EcsResult<()> {
        let position = self.position(id)?;
        if position >= self.active {
            return Ok(());
        }

        self.active -= 1;
        self.swap_positions(position, self.active);

        Ok(())
    }

    /// Gets a reference to an allocated record.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownSlot`] if `id` is not allocated.
    #[inline]
    pub fn get(&self, id: SlotId) -> EcsResult<&C> {
        let position = self.position(id)?;
        Ok(&self.records[position])
    }

    /// Gets a mutable reference to an allocated record.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownSlot`] if `id` is not allocated.
    #[inline]
    pub fn get_mut(&mut self, id: SlotId) -> EcsResult<&mut C> {
        let position = self.position(id)?;
        Ok(&mut self.records[position])
    }

    /// Checks if `id` is allocated.
    #[inline]
    #[must_use]
    pub fn is_allocated(&self, id: SlotId) -> bool {
        self.id_positions.contains_key(&id)
    }

    /// Checks if `id` is allocated and active.
    #[inline]
    #[must_use]
    pub fn is_active(&self, id: SlotId) -> bool {
        self.position_of(id).is_some_and(|position| position < self.active)
    }

    /// Current position of an allocated slot.
    ///
    /// Positions change on every structural operation; use them only for
    /// inspection.
    #[inline]
    #[must_use]
    pub fn position_of(&self, id: SlotId) -> Option<usize> {
        self.id_positions.get(&id).copied()
    }

    /// The contiguous run of active records.
    #[inline]
    #[must_use]
    pub fn active(&self) -> &[C] {
        &self.records[..self.active]
    }

    /// The contiguous run of active records, mutably.
    #[inline]
    pub fn active_mut(&mut self) -> &mut [C] {
        &mut self.records[..self.active]
    }

    /// Raw bytes of the active run.
    #[inline]
    #[must_use]
    pub fn active_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(self.active())
    }

    /// Slot ids of the active records, in the same order as [`Self::active`].
    #[inline]
    #[must_use]
    pub fn active_ids(&self) -> &[SlotId] {
        &self.position_ids[..self.active]
    }

    /// Slot ids of all allocated records in position order.
    #[inline]
    #[must_use]
    pub fn allocated_ids(&self) -> &[SlotId] {
        &self.position_ids[..self.allocated]
    }

    /// Iterates over active records with their slot ids.
    pub fn iter_active(&self) -> impl Iterator<Item = (SlotId, &C)> {
        self.active_ids().iter().copied().zip(self.active())
    }

    fn position(&self, id: SlotId) -> EcsResult<usize> {
        self.position_of(id).ok_or(EcsError::UnknownSlot {
            component: C::NAME,
            slot: id,
        })
    }

    /// Exchanges two positions, relocating the records by raw copy.
    fn swap_positions(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }

        self.records.swap(a, b);
        self.position_ids.swap(a, b);
        self.id_positions.insert(self.position_ids[a], a);
        self.id_positions.insert(self.position_ids[b], b);
    }
}

impl<C: Component> fmt::Debug for RecordPool<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordPool")
            .field("component", &C::NAME)
            .field("capacity", &self.capacity())
            .field("allocated", &self.allocated)
            .field("active", &self.active)
            .finish()
    }
}

/// Type-erased view of a pool, so the engine can keep pools of different
/// component types side by side.
pub(crate) trait ErasedPool: Send {
    fn component_name(&self) -> &'static str;

    fn activate(&mut self, id: SlotId) -> EcsResult<()>;

    fn deactivate(&mut self, id: SlotId) -> EcsResult<()>;

    /// Runs the record's shutdown hook, then frees the slot.
    fn release(&mut self, id: SlotId, owner: EntityId) -> EcsResult<()>;

    fn stats(&self) -> PoolStats;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<C: Component> ErasedPool for RecordPool<C> {
    fn component_name(&self) -> &'static str {
        C::NAME
    }

    fn activate(&mut self, id: SlotId) -> EcsResult<()> {
        RecordPool::activate(self, id)
    }

    fn deactivate(&mut self, id: SlotId) -> EcsResult<()> {
        RecordPool::deactivate(self, id)
    }

    fn release(&mut self, id: SlotId, owner: EntityId) -> EcsResult<()> {
        self.get_mut(id)?.shutdown(owner);
        self.free(id)
    }

    fn stats(&self) -> PoolStats {
        RecordPool::stats(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
