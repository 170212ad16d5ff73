//! # Processors
//!
//! A processor is a unit of per-tick logic. The engine owns one instance per
//! concrete processor type and calls it once per tick, in priority order,
//! while it is toggled active.

use std::any::{Any, TypeId};

use super::engine::Engine;
use crate::error::EcsResult;

/// Upcast helper so registered processors can be downcast to their type.
pub trait AsAny: Any {
    /// `self` as `&dyn Any`.
    fn as_any(&self) -> &dyn Any;

    /// `self` as `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Per-tick logic unit.
///
/// # Example
///
/// ```rust,ignore
/// struct Integrate;
///
/// impl Processor for Integrate {
///     fn run_tick(&mut self, engine: &mut Engine, delay: u32) -> EcsResult<()> {
///         let movers = engine.get_entities_for(&Family::new().filter::<Position>().filter::<Velocity>());
///         for entity in &movers {
///             let velocity = *engine.get_component::<Velocity>(entity)?;
///             engine.get_component_mut::<Position>(entity)?.advance(velocity, delay);
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Processor: AsAny + Send {
    /// Runs one tick. `delay` is the caller-supplied time step.
    ///
    /// The processor may add entities, components and processors, and may
    /// request entity removal; removals take effect after the whole pass.
    ///
    /// # Errors
    ///
    /// The first error of a pass is returned from [`Engine::run_tick`]
    /// once every other active processor has run.
    fn run_tick(&mut self, engine: &mut Engine, delay: u32) -> EcsResult<()>;

    /// Name used in logs. Defaults to the type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// A processor registration.
pub(crate) struct ProcessorEntry {
    pub(crate) type_id: TypeId,
    pub(crate) name: &'static str,
    pub(crate) priority: u32,
    pub(crate) sequence: u64,
    pub(crate) active: bool,
    /// `None` while the processor is running.
    pub(crate) processor: Option<Box<dyn Processor>>,
}

impl ProcessorEntry {
    pub(crate) fn new<P: Processor>(processor: P, priority: u32, sequence: u64) -> Self {
        Self {
            type_id: TypeId::of::<P>(),
            name: processor.name(),
            priority,
            sequence,
            active: false,
            processor: Some(Box::new(processor)),
        }
    }

    pub(crate) fn downcast_ref<P: Processor>(&self) -> Option<&P> {
        let processor: &dyn Processor = self.processor.as_deref()?;
        AsAny::as_any(processor).downcast_ref()
    }

    pub(crate) fn downcast_mut<P: Processor>(&mut self) -> Option<&mut P> {
        let processor: &mut dyn Processor = self.processor.as_deref_mut()?;
        AsAny::as_any_mut(processor).downcast_mut()
    }
}
