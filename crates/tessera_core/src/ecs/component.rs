//! # Component System
//!
//! Components are plain data records owned by entities and stored in the
//! engine's per-type [`RecordPool`](crate::memory::RecordPool)s.
//! They must be `Pod` so the pool can relocate them by raw copy without
//! running any construction or destruction logic.

use std::fmt;
use std::marker::PhantomData;

use bytemuck::{Pod, Zeroable};

use super::entity::EntityId;
use crate::memory::SlotId;

/// Number of distinct component tags an engine can tell apart.
pub const MAX_COMPONENT_TYPES: usize = 64;

/// Marker trait for ECS components.
///
/// Components must be:
/// - `Copy` + `Pod`: relocatable byte-for-byte, no embedded self-references
/// - `Zeroable` + `Default`: pools pre-allocate every record up front
///
/// A component that needs an external resource stores a handle or index to
/// it, never the resource itself.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(Clone, Copy, Default, Pod, Zeroable)]
/// #[repr(C)]
/// struct Health {
///     current: u32,
///     max: u32,
/// }
///
/// impl Component for Health {
///     const ID: u8 = 0;
///     const NAME: &'static str = "Health";
/// }
/// ```
pub trait Component: Copy + Pod + Zeroable + Default + Send + Sync + 'static {
    /// Unique tag for this component type (0-63).
    ///
    /// Used as the pool registry key and as the bit in entity masks.
    /// Tags of 64 or more fail to compile where the type is used.
    const ID: u8;

    /// Stable human-readable name, used in errors, logs and configuration.
    const NAME: &'static str;

    /// Called once after the record is assigned to `owner`.
    fn init(&mut self, _owner: EntityId) {}

    /// Called once before the record's slot is freed.
    fn shutdown(&mut self, _owner: EntityId) {}
}

struct TagCheck<C>(PhantomData<C>);

impl<C: Component> TagCheck<C> {
    const BIT: u64 = {
        assert!(
            (C::ID as usize) < MAX_COMPONENT_TYPES,
            "component ID must be in 0..64"
        );
        1u64 << C::ID
    };
}

/// Mask bit of a component type.
#[inline]
pub(crate) fn component_bit<C: Component>() -> u64 {
    TagCheck::<C>::BIT
}

/// Typed handle to one component record.
///
/// The handle is the record's slot id, which never changes and is never
/// reused while the pool lives. Resolve it with
/// [`Engine::resolve`](crate::Engine::resolve) at the point of use; the
/// returned reference cannot outlive the next structural change.
pub struct Handle<C: Component> {
    slot: SlotId,
    _marker: PhantomData<fn() -> C>,
}

impl<C: Component> Handle<C> {
    pub(crate) const fn new(slot: SlotId) -> Self {
        Self {
            slot,
            _marker: PhantomData,
        }
    }

    /// The underlying slot id.
    #[inline]
    #[must_use]
    pub const fn slot(self) -> SlotId {
        self.slot
    }
}

impl<C: Component> Clone for Handle<C> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<C: Component> Copy for Handle<C> {}

impl<C: Component> PartialEq for Handle<C> {
    fn eq(&self, other: &Self) -> bool {
        self.slot == other.slot
    }
}

impl<C: Component> Eq for Handle<C> {}

impl<C: Component> fmt::Debug for Handle<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle<{}>({})", C::NAME, self.slot)
    }
}
