//! Integration tests for record pool compaction invariants.

#![allow(missing_docs)]

use std::collections::BTreeSet;

use bytemuck::{Pod, Zeroable};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tessera_core::{Component, EcsError, RecordPool, SlotId};

#[allow(dead_code)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
#[repr(C)]
struct Particle {
    x: f32,
    y: f32,
    life: f32,
    tag: u32,
}

impl Component for Particle {
    const ID: u8 = 0;
    const NAME: &'static str = "Particle";
}

/// Checks the position layout against the expected allocated/active sets.
fn assert_layout(
    pool: &RecordPool<Particle>,
    allocated: &BTreeSet<SlotId>,
    active: &BTreeSet<SlotId>,
) {
    assert_eq!(pool.allocated_count(), allocated.len());
    assert_eq!(pool.active_count(), active.len());
    assert!(pool.active_count() <= pool.allocated_count());
    assert!(pool.allocated_count() <= pool.capacity());

    let in_positions: BTreeSet<SlotId> = pool.allocated_ids().iter().copied().collect();
    assert_eq!(&in_positions, allocated);

    let in_active_prefix: BTreeSet<SlotId> = pool.active_ids().iter().copied().collect();
    assert_eq!(&in_active_prefix, active);

    for (position, &id) in pool.allocated_ids().iter().enumerate() {
        assert_eq!(pool.position_of(id), Some(position));
        assert_eq!(pool.is_active(id), position < pool.active_count());
    }
}

#[test]
fn test_capacity_is_hard_limit() {
    for capacity in [1, 2, 7, 100] {
        let mut pool: RecordPool<Particle> = RecordPool::new(capacity).unwrap();

        let ids: Vec<SlotId> = (0..capacity).map(|_| pool.allocate().unwrap()).collect();
        assert_eq!(
            pool.allocate(),
            Err(EcsError::PoolExhausted {
                component: "Particle",
                capacity
            })
        );
        assert_eq!(pool.free_count(), 0);

        pool.free(ids[capacity / 2]).unwrap();
        assert!(pool.allocate().is_ok());
        assert!(pool.allocate().is_err());
    }
}

#[test]
fn test_records_follow_their_ids() {
    let mut pool: RecordPool<Particle> = RecordPool::new(8).unwrap();
    let ids: Vec<SlotId> = (0..8).map(|_| pool.allocate().unwrap()).collect();

    for (i, &id) in ids.iter().enumerate() {
        pool.get_mut(id).unwrap().tag = i as u32;
    }

    // Shuffle positions through activation churn.
    for &id in ids.iter().rev().step_by(2) {
        pool.activate(id).unwrap();
    }
    pool.deactivate(ids[7]).unwrap();
    pool.free(ids[3]).unwrap();
    pool.activate(ids[0]).unwrap();

    for (i, &id) in ids.iter().enumerate() {
        if i == 3 {
            assert!(pool.get(id).is_err());
        } else {
            assert_eq!(pool.get(id).unwrap().tag, i as u32);
        }
    }

    let active_tags: BTreeSet<u32> = pool.active().iter().map(|p| p.tag).collect();
    assert_eq!(active_tags, BTreeSet::from([0, 1, 5]));
}

#[test]
fn test_random_interleaving_keeps_invariants() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x7e55e4a);
    let mut pool: RecordPool<Particle> = RecordPool::new(32).unwrap();
    let mut allocated = BTreeSet::new();
    let mut active = BTreeSet::new();
    let mut retired = Vec::new();

    for _ in 0..5_000 {
        let known: Vec<SlotId> = allocated.iter().copied().collect();
        let pick = |rng: &mut ChaCha8Rng| known[rng.gen_range(0..known.len())];

        match rng.gen_range(0..5) {
            0 => match pool.allocate() {
                Ok(id) => {
                    assert!(allocated.insert(id));
                }
                Err(err) => {
                    assert_eq!(allocated.len(), pool.capacity());
                    assert!(matches!(err, EcsError::PoolExhausted { .. }));
                }
            },
            1 if !known.is_empty() => {
                let id = pick(&mut rng);
                pool.free(id).unwrap();
                allocated.remove(&id);
                active.remove(&id);
                retired.push(id);
            }
            2 | 3 if !known.is_empty() => {
                let id = pick(&mut rng);
                pool.activate(id).unwrap();
                active.insert(id);
            }
            4 if !known.is_empty() => {
                let id = pick(&mut rng);
                pool.deactivate(id).unwrap();
                active.remove(&id);
            }
            _ => {}
        }

        assert_layout(&pool, &allocated, &active);
    }

    for id in retired {
        assert!(!pool.is_allocated(id));
        assert!(matches!(pool.activate(id), Err(EcsError::UnknownSlot { .. })));
    }
}

#[test]
fn test_rejected_calls_leave_pool_untouched() {
    let mut pool: RecordPool<Particle> = RecordPool::new(2).unwrap();
    let a = pool.allocate().unwrap();
    let b = pool.allocate().unwrap();
    pool.activate(b).unwrap();
    let before = (pool.stats(), pool.allocated_ids().to_vec());

    let _ = pool.allocate();
    let _ = pool.free(SlotId::new(1_000));
    let _ = pool.activate(SlotId::new(1_000));
    let _ = pool.deactivate(SlotId::new(1_000));

    assert_eq!((pool.stats(), pool.allocated_ids().to_vec()), before);
    assert!(pool.is_active(b));
    assert!(!pool.is_active(a));
}
