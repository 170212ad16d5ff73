//! # Query Results
//!
//! [`EntityArray`] is the immutable snapshot returned by a family query.
//! It owns its ids, so later structural changes in the engine never alter
//! a result already handed out.

use std::ops::Deref;

use super::entity::EntityId;
use crate::error::{EcsError, EcsResult};

/// Point-in-time sequence of entities matching a family.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityArray {
    entities: Box<[EntityId]>,
}

impl EntityArray {
    pub(crate) fn from_vec(entities: Vec<EntityId>) -> Self {
        Self {
            entities: entities.into_boxed_slice(),
        }
    }

    /// Number of entities in the snapshot.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// True when no entity matched.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::QueryIndexOutOfRange`] if `index >= len()`.
    pub fn get(&self, index: usize) -> EcsResult<EntityId> {
        self.entities
            .get(index)
            .copied()
            .ok_or(EcsError::QueryIndexOutOfRange {
                index,
                len: self.entities.len(),
            })
    }

    /// Checks if `entity` is part of the snapshot.
    #[must_use]
    pub fn contains(&self, entity: EntityId) -> bool {
        self.entities.contains(&entity)
    }

    /// Iterates over the entities.
    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, EntityId>> {
        self.entities.iter().copied()
    }

    /// The entities as a slice.
    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[EntityId] {
        &self.entities
    }
}

impl Deref for EntityArray {
    type Target = [EntityId];

    fn deref(&self) -> &[EntityId] {
        &self.entities
    }
}

impl<'a> IntoIterator for &'a EntityArray {
    type Item = EntityId;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, EntityId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl IntoIterator for EntityArray {
    type Item = EntityId;
    type IntoIter = std::vec::IntoIter<EntityId>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_vec().into_iter()
    }
}
