//! Core deterministic primitives.
//!
//! Everything in here is independent of game rules: randomness, hashing,
//! timers and instance pooling.

pub mod rng;
pub mod hash;
pub mod timer;
pub mod pool;

// Re-export core types
pub use rng::{DeterministicRng, RandomSource};
pub use hash::{compute_state_hash, StateHash, StateHasher};
pub use timer::{Millis, Timer, TimerHandle};
pub use pool::{ObjectPool, PoolKey, Poolable};
