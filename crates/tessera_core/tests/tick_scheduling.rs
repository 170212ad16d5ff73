//! Integration tests for processor scheduling and deferred removal.

#![allow(missing_docs)]

use bytemuck::{Pod, Zeroable};
use tessera_core::{Component, EcsError, EcsResult, Engine, EntityId, Family, Processor};

#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Counter {
    value: u32,
}

impl Component for Counter {
    const ID: u8 = 0;
    const NAME: &'static str = "Counter";
}

#[allow(dead_code)]
#[derive(Clone, Copy, Debug, Default, Pod, Zeroable)]
#[repr(C)]
struct Doomed {
    marker: u32,
}

impl Component for Doomed {
    const ID: u8 = 1;
    const NAME: &'static str = "Doomed";
}

fn for_each_counter(engine: &mut Engine, f: impl Fn(u32) -> u32) -> EcsResult<()> {
    for entity in &engine.get_entities_for(&Family::new().filter::<Counter>()) {
        let counter = engine.get_component_mut::<Counter>(entity)?;
        counter.value = f(counter.value);
    }
    Ok(())
}

struct TimesTen;

impl Processor for TimesTen {
    fn run_tick(&mut self, engine: &mut Engine, _delay: u32) -> EcsResult<()> {
        for_each_counter(engine, |v| v * 10)
    }
}

struct PlusOne;

impl Processor for PlusOne {
    fn run_tick(&mut self, engine: &mut Engine, _delay: u32) -> EcsResult<()> {
        for_each_counter(engine, |v| v + 1)
    }
}

fn counter_engine(times_priority: u32, plus_priority: u32) -> (Engine, EntityId) {
    let mut engine = Engine::new();
    let id = engine.create_entity();
    engine.add_entity(id).unwrap();
    engine.add_component_with(id, Counter { value: 1 }).unwrap();
    engine.activate_entity(id).unwrap();

    engine.add_processor(TimesTen, times_priority).unwrap();
    engine.add_processor(PlusOne, plus_priority).unwrap();
    engine.activate_processor::<TimesTen>().unwrap();
    engine.activate_processor::<PlusOne>().unwrap();
    (engine, id)
}

#[test]
fn test_lower_priority_runs_first() {
    let (mut engine, id) = counter_engine(1, 2);
    engine.run_tick(16).unwrap();
    assert_eq!(engine.get_component::<Counter>(id).unwrap().value, 11);

    let (mut engine, id) = counter_engine(2, 1);
    engine.run_tick(16).unwrap();
    assert_eq!(engine.get_component::<Counter>(id).unwrap().value, 20);
}

#[test]
fn test_equal_priority_keeps_registration_order() {
    let (mut engine, id) = counter_engine(3, 3);
    engine.run_tick(16).unwrap();
    assert_eq!(engine.get_component::<Counter>(id).unwrap().value, 11);
}

#[test]
fn test_inactive_processors_are_skipped() {
    let (mut engine, id) = counter_engine(1, 2);
    engine.deactivate_processor::<TimesTen>().unwrap();
    assert_eq!(engine.is_processor_active::<TimesTen>(), Ok(false));

    engine.run_tick(16).unwrap();
    assert_eq!(engine.get_component::<Counter>(id).unwrap().value, 2);
    assert_eq!(engine.tick_count(), 1);
}

#[test]
fn test_processor_registry() {
    let mut engine = Engine::new();
    engine.add_processor(PlusOne, 0).unwrap();
    assert!(matches!(
        engine.add_processor(PlusOne, 5),
        Err(EcsError::DuplicateProcessor(_))
    ));
    assert_eq!(engine.processor_count(), 1);
    assert_eq!(engine.is_processor_active::<PlusOne>(), Ok(false));

    engine.remove_processor::<PlusOne>().unwrap();
    assert!(matches!(
        engine.remove_processor::<PlusOne>(),
        Err(EcsError::ProcessorNotFound(_))
    ));
    assert!(matches!(
        engine.activate_processor::<TimesTen>(),
        Err(EcsError::ProcessorNotFound(_))
    ));
}

#[derive(Default)]
struct Delays {
    seen: Vec<u32>,
}

impl Processor for Delays {
    fn run_tick(&mut self, _engine: &mut Engine, delay: u32) -> EcsResult<()> {
        self.seen.push(delay);
        Ok(())
    }
}

#[test]
fn test_processor_state_is_reachable() {
    let mut engine = Engine::new();
    engine.add_processor(Delays::default(), 0).unwrap();
    engine.activate_processor::<Delays>().unwrap();

    engine.run_tick(16).unwrap();
    engine.run_tick(33).unwrap();
    assert_eq!(engine.get_processor::<Delays>().unwrap().seen, vec![16, 33]);

    engine.get_processor_mut::<Delays>().unwrap().seen.clear();
    engine.run_tick(0).unwrap();
    assert_eq!(engine.get_processor::<Delays>().unwrap().seen, vec![0]);
}

/// Requests removal of every doomed entity.
struct Reaper;

impl Processor for Reaper {
    fn run_tick(&mut self, engine: &mut Engine, _delay: u32) -> EcsResult<()> {
        for entity in &engine.get_entities_for(&Family::new().filter::<Doomed>()) {
            engine.remove_entity(entity)?;
            // Repeated requests are harmless.
            engine.remove_entity(entity)?;
        }
        Ok(())
    }
}

/// Counts doomed entities it can still see.
#[derive(Default)]
struct Witness {
    seen: Vec<usize>,
}

impl Processor for Witness {
    fn run_tick(&mut self, engine: &mut Engine, _delay: u32) -> EcsResult<()> {
        let doomed = engine.get_entities_for(&Family::new().filter::<Doomed>());
        for entity in &doomed {
            // Still fully intact mid-tick.
            assert!(engine.is_linked(entity));
            assert!(engine.has_component::<Doomed>(entity));
        }
        self.seen.push(doomed.len());
        Ok(())
    }
}

#[test]
fn test_removal_is_deferred_to_end_of_tick() {
    let mut engine = Engine::new();
    let doomed: Vec<EntityId> = (0..3)
        .map(|_| {
            let id = engine.create_entity();
            engine.add_entity(id).unwrap();
            engine.add_component::<Doomed>(id).unwrap();
            engine.activate_entity(id).unwrap();
            id
        })
        .collect();

    engine.add_processor(Reaper, 1).unwrap();
    engine.add_processor(Witness::default(), 2).unwrap();
    engine.activate_processor::<Reaper>().unwrap();
    engine.activate_processor::<Witness>().unwrap();

    engine.run_tick(16).unwrap();
    assert_eq!(engine.get_processor::<Witness>().unwrap().seen, vec![3]);
    for &id in &doomed {
        assert!(!engine.is_linked(id));
    }
    assert_eq!(engine.pool_stats::<Doomed>().unwrap().allocated, 0);

    engine.run_tick(16).unwrap();
    assert_eq!(engine.get_processor::<Witness>().unwrap().seen, vec![3, 0]);
}

/// Destroys the first counter entity it sees.
struct Destroyer;

impl Processor for Destroyer {
    fn run_tick(&mut self, engine: &mut Engine, _delay: u32) -> EcsResult<()> {
        if let Ok(entity) = engine.get_entities_for(&Family::new()).get(0) {
            engine.destroy_entity(entity)?;
            assert!(engine.entity(entity).is_ok());
        }
        Ok(())
    }
}

#[test]
fn test_destroy_during_tick_retires_after_flush() {
    let mut engine = Engine::new();
    let id = engine.create_entity();
    engine.add_entity(id).unwrap();
    engine.activate_entity(id).unwrap();
    engine.add_processor(Destroyer, 0).unwrap();
    engine.activate_processor::<Destroyer>().unwrap();

    engine.run_tick(1).unwrap();
    assert_eq!(engine.entity(id).unwrap_err(), EcsError::EntityNotFound(id));
    assert_eq!(engine.entity_count(), 0);
}

struct Failing;

impl Processor for Failing {
    fn run_tick(&mut self, engine: &mut Engine, _delay: u32) -> EcsResult<()> {
        let doomed = engine.get_entities_for(&Family::new().filter::<Doomed>());
        for entity in &doomed {
            engine.remove_entity(entity)?;
        }
        Err(EcsError::ProcessorNotFound("downstream"))
    }
}

#[test]
fn test_processor_error_finishes_pass_and_flushes() {
    let mut engine = Engine::new();
    let id = engine.create_entity();
    engine.add_entity(id).unwrap();
    engine.add_component::<Doomed>(id).unwrap();
    engine.activate_entity(id).unwrap();

    engine.add_processor(Failing, 0).unwrap();
    engine.add_processor(Delays::default(), 1).unwrap();
    engine.activate_processor::<Failing>().unwrap();
    engine.activate_processor::<Delays>().unwrap();

    assert_eq!(
        engine.run_tick(5),
        Err(EcsError::ProcessorNotFound("downstream"))
    );
    assert!(!engine.is_ticking());
    assert!(!engine.is_linked(id));
    // Later processors still ran in the failing tick.
    assert_eq!(engine.get_processor::<Delays>().unwrap().seen, vec![5]);

    // The failing processor stays registered and fails again.
    assert!(engine.run_tick(6).is_err());
    assert_eq!(engine.get_processor::<Delays>().unwrap().seen, vec![5, 6]);

    engine.deactivate_processor::<Failing>().unwrap();
    engine.run_tick(7).unwrap();
    assert_eq!(engine.get_processor::<Delays>().unwrap().seen, vec![5, 6, 7]);
}

/// Registers `Delays` and unregisters `PlusOne` mid-tick.
struct Rewire;

impl Processor for Rewire {
    fn run_tick(&mut self, engine: &mut Engine, _delay: u32) -> EcsResult<()> {
        if engine.get_processor::<Delays>().is_err() {
            engine.add_processor(Delays::default(), 0)?;
            engine.activate_processor::<Delays>()?;
        }
        if engine.get_processor::<PlusOne>().is_ok() {
            engine.remove_processor::<PlusOne>()?;
        }
        Ok(())
    }
}

#[test]
fn test_registry_changes_during_tick() {
    let (mut engine, id) = counter_engine(10, 20);
    engine.add_processor(Rewire, 15).unwrap();
    engine.activate_processor::<Rewire>().unwrap();

    engine.run_tick(7).unwrap();
    // TimesTen ran, PlusOne was removed before its turn.
    assert_eq!(engine.get_component::<Counter>(id).unwrap().value, 10);
    // Delays was added mid-tick and did not run yet.
    assert!(engine.get_processor::<Delays>().unwrap().seen.is_empty());
    assert_eq!(engine.processor_count(), 3);

    engine.run_tick(8).unwrap();
    assert_eq!(engine.get_processor::<Delays>().unwrap().seen, vec![8]);
    assert_eq!(engine.get_component::<Counter>(id).unwrap().value, 100);
}
