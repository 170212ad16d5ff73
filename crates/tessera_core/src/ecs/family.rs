//! # Families
//!
//! A family is a declarative predicate over the components an entity owns:
//! - `required`: every listed type must be owned
//! - `excluded`: no listed type may be owned
//! - `one_of`: for each group, at least one member must be owned
//!
//! Families hold bitmasks only, so building and matching never allocate
//! beyond the group list. They are evaluated fresh on every query.

use super::component::{component_bit, Component};
use super::entity::Entity;

/// A set of component types, written as a tuple: `(A, B)`, `(A, B, C)`, ...
///
/// Implemented for tuples of one to six component types.
pub trait ComponentSet {
    /// Union of the members' mask bits.
    fn mask() -> u64;
}

macro_rules! impl_component_set {
    ($($member:ident),+) => {
        impl<$($member: Component),+> ComponentSet for ($($member,)+) {
            #[inline]
            fn mask() -> u64 {
                0 $(| component_bit::<$member>())+
            }
        }
    };
}

impl_component_set!(A);
impl_component_set!(A, B);
impl_component_set!(A, B, C);
impl_component_set!(A, B, C, D);
impl_component_set!(A, B, C, D, E);
impl_component_set!(A, B, C, D, E, F);

/// Query predicate over owned component types.
///
/// # Example
///
/// ```rust,ignore
/// // Movers that are not frozen and are either rendered or audible.
/// let family = Family::new()
///     .filter::<Position>()
///     .filter::<Velocity>()
///     .exclude::<Frozen>()
///     .one::<(Sprite, Emitter)>();
///
/// for entity in &engine.get_entities_for(&family) {
///     // ...
/// }
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Family {
    required: u64,
    excluded: u64,
    one_of: Vec<u64>,
}

impl Family {
    /// Creates an empty family, which matches every entity.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            required: 0,
            excluded: 0,
            one_of: Vec::new(),
        }
    }

    /// Requires entities to own a `C`.
    #[must_use]
    pub fn filter<C: Component>(mut self) -> Self {
        self.required |= component_bit::<C>();
        self
    }

    /// Requires entities to own every type in `S`.
    #[must_use]
    pub fn filter_all<S: ComponentSet>(mut self) -> Self {
        self.required |= S::mask();
        self
    }

    /// Rejects entities owning a `C`.
    #[must_use]
    pub fn exclude<C: Component>(mut self) -> Self {
        self.excluded |= component_bit::<C>();
        self
    }

    /// Rejects entities owning any type in `S`.
    #[must_use]
    pub fn exclude_any<S: ComponentSet>(mut self) -> Self {
        self.excluded |= S::mask();
        self
    }

    /// Requires entities to own at least one type in `S`.
    ///
    /// Each call adds an independent group; all groups must be satisfied.
    #[must_use]
    pub fn one<S: ComponentSet>(mut self) -> Self {
        self.one_of.push(S::mask());
        self
    }

    /// True when the family has no constraint at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.required == 0 && self.excluded == 0 && self.one_of.is_empty()
    }

    /// Tests an active entity against the family.
    ///
    /// Inactive entities never match.
    #[inline]
    #[must_use]
    pub fn matches(&self, entity: &Entity) -> bool {
        self.matches_with(entity, true)
    }

    /// Tests an entity against the family.
    ///
    /// With `exclude_inactive` false, only component ownership is checked;
    /// listener notification uses this form.
    #[must_use]
    pub fn matches_with(&self, entity: &Entity, exclude_inactive: bool) -> bool {
        if exclude_inactive && !entity.is_active() {
            return false;
        }
        self.matches_mask(entity.component_mask())
    }

    /// Tests a bare component mask against the family.
    #[must_use]
    pub fn matches_mask(&self, owned: u64) -> bool {
        owned & self.required == self.required
            && owned & self.excluded == 0
            && self.one_of.iter().all(|group| owned & group != 0)
    }
}
