//! # Memory Management
//!
//! Pre-allocated record pools, one per component type.
//!
//! ## Design Philosophy
//!
//! All record memory is allocated once when a pool is created. Afterwards:
//! - No growth path, exceeding capacity is an error
//! - Structural changes are O(1) position swaps
//! - Active records stay contiguous for cache-friendly iteration

mod pool;

pub(crate) use pool::ErasedPool;
pub use pool::{PoolStats, RecordPool, SlotId};
