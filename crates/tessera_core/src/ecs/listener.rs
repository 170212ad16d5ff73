//! # Entity Listeners
//!
//! Listeners observe entities linking to and unlinking from the engine.
//! They are notified synchronously, in priority order, for every entity
//! matching the family they were registered with (active or not).

use std::sync::Arc;

use parking_lot::Mutex;

use super::engine::Engine;
use super::entity::EntityId;
use super::family::Family;

/// Observer of entity linkage.
pub trait EntityListener: Send {
    /// Called after `entity` is linked and initialized.
    fn entity_added(&mut self, engine: &Engine, entity: EntityId);

    /// Called before `entity`'s components are torn down.
    fn entity_removed(&mut self, engine: &Engine, entity: EntityId);
}

/// Shared handle to a listener.
///
/// The allocation's address is the listener's identity: registering a
/// clone of an already registered handle is rejected.
///
/// The engine locks the mutex for every callback, and the lock is not
/// reentrant. Holding a guard on a registered listener while calling
/// [`Engine::add_entity`], [`Engine::remove_entity`] or
/// [`Engine::destroy_entity`] deadlocks once that listener is notified.
pub type SharedListener = Arc<Mutex<dyn EntityListener>>;

/// Wraps a listener in a [`SharedListener`]-compatible handle.
///
/// Keep the returned `Arc` to inspect the listener later; pass a clone to
/// [`Engine::add_listener`].
#[must_use]
pub fn shared<L: EntityListener + 'static>(listener: L) -> Arc<Mutex<L>> {
    Arc::new(Mutex::new(listener))
}

/// A listener registration.
pub(crate) struct ListenerEntry {
    pub(crate) priority: u32,
    pub(crate) sequence: u64,
    pub(crate) family: Family,
    pub(crate) listener: SharedListener,
}

impl ListenerEntry {
    pub(crate) fn is(&self, listener: &SharedListener) -> bool {
        identity(&self.listener) == identity(listener)
    }
}

fn identity(listener: &SharedListener) -> *const () {
    Arc::as_ptr(listener).cast::<()>()
}
