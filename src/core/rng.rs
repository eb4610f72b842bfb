//! Deterministic Random Number Generator
//!
//! Uses Xorshift128+ algorithm for fast, high-quality, deterministic randomness.
//! Given the same seed, produces identical deals on all platforms.

use serde::{Serialize, Deserialize};
use sha2::{Sha256, Digest};

/// Source of uniformly distributed bounded indices.
///
/// Deck shuffling only needs this one operation, so alternative generators
/// (test harnesses, recorded streams) can drive a shuffle as well.
pub trait RandomSource {
    /// Draw a uniformly distributed index in `[0, bound)`.
    ///
    /// `bound == 0` returns 0.
    fn next_below(&mut self, bound: usize) -> usize;
}

/// Deterministic PRNG using Xorshift128+ algorithm.
///
/// # Example
///
/// ```
/// use memory_match::core::rng::DeterministicRng;
///
/// let mut a = DeterministicRng::new(12345);
/// let mut b = DeterministicRng::new(12345);
/// assert_eq!(a.next_u64(), b.next_u64());
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeterministicRng {
    state: [u64; 2],
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(0)
    }
}

impl DeterministicRng {
    /// Create a new RNG from a 64-bit seed.
    ///
    /// Uses SplitMix64 to initialize the internal state, ensuring
    /// good distribution even from weak seeds.
    pub fn new(seed: u64) -> Self {
        let mut s = seed;
        let state0 = splitmix64(&mut s);
        let state1 = splitmix64(&mut s);

        // Xorshift never leaves the all-zero state
        let state = if state0 == 0 && state1 == 0 {
            [1, 1]
        } else {
            [state0, state1]
        };

        Self { state }
    }

    /// Generate the next 64-bit random value.
    #[inline]
    pub fn next_u64(&mut self) -> u64 {
        let s0 = self.state[0];
        let mut s1 = self.state[1];
        let result = s0.wrapping_add(s1);

        s1 ^= s0;
        self.state[0] = s0.rotate_left(24) ^ s1 ^ (s1 << 16);
        self.state[1] = s1.rotate_left(37);

        result
    }

    /// Generate a random integer in range [0, bound) without modulo bias.
    ///
    /// Draws below `threshold` are rejected so every residue class has the
    /// same number of preimages.
    #[inline]
    pub fn next_bounded(&mut self, bound: u64) -> u64 {
        if bound == 0 {
            return 0;
        }
        let threshold = bound.wrapping_neg() % bound;
        loop {
            let r = self.next_u64();
            if r >= threshold {
                return r % bound;
            }
        }
    }

    /// Shuffle a slice in place using Fisher-Yates algorithm.
    pub fn shuffle<T>(&mut self, slice: &mut [T]) {
        shuffle(self, slice);
    }

    /// Get current state (for checkpointing/replay).
    pub fn state(&self) -> [u64; 2] {
        self.state
    }

    /// Restore from saved state.
    pub fn set_state(&mut self, state: [u64; 2]) {
        self.state = state;
    }
}

impl RandomSource for DeterministicRng {
    #[inline]
    fn next_below(&mut self, bound: usize) -> usize {
        self.next_bounded(bound as u64) as usize
    }
}

/// Shuffle a slice in place with any [`RandomSource`].
///
/// Walks from the last index down to 1, swapping each position with a
/// uniformly drawn index in `[0, i]`.
pub fn shuffle<T, R>(rng: &mut R, slice: &mut [T])
where
    R: RandomSource + ?Sized,
{
    let len = slice.len();
    for i in (1..len).rev() {
        let j = rng.next_below(i + 1);
        slice.swap(i, j);
    }
}

/// SplitMix64 for seed initialization.
/// Produces well-distributed values from sequential seeds.
#[inline]
fn splitmix64(state: &mut u64) -> u64 {
    *state = state.wrapping_add(0x9E3779B97F4A7C15);
    let mut z = *state;
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58476D1CE4E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D049BB133111EB);
    z ^ (z >> 31)
}

/// Derive a deal seed from a session identifier.
///
/// The same session id always yields the same seed, so a session id alone
/// is enough to reproduce its first deal.
pub fn derive_session_seed(session_id: &[u8; 16]) -> u64 {
    let mut hasher = Sha256::new();

    // Domain separator
    hasher.update(b"MEMORY_MATCH_SEED_V1");
    hasher.update(session_id);

    let hash = hasher.finalize();
    let mut seed = [0u8; 8];
    seed.copy_from_slice(&hash[0..8]);
    u64::from_le_bytes(seed)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rng_determinism() {
        let mut rng1 = DeterministicRng::new(12345);
        let mut rng2 = DeterministicRng::new(12345);

        for _ in 0..1000 {
            assert_eq!(rng1.next_u64(), rng2.next_u64());
        }
    }

    #[test]
    fn test_next_bounded_range() {
        let mut rng = DeterministicRng::new(1234);

        for bound in 1..50u64 {
            for _ in 0..100 {
                assert!(rng.next_bounded(bound) < bound);
            }
        }

        assert_eq!(rng.next_bounded(0), 0);
        assert_eq!(rng.next_bounded(1), 0);
    }

    #[test]
    fn test_next_below_covers_every_value() {
        let mut rng = DeterministicRng::new(42);
        let mut seen = [false; 6];

        for _ in 0..600 {
            seen[rng.next_below(6)] = true;
        }

        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn test_shuffle_determinism() {
        let mut rng1 = DeterministicRng::new(1111);
        let mut rng2 = DeterministicRng::new(1111);

        let mut arr1 = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];
        let mut arr2 = [1, 2, 3, 4, 5, 6, 7, 8, 9, 10];

        rng1.shuffle(&mut arr1);
        rng2.shuffle(&mut arr2);

        assert_eq!(arr1, arr2);
    }

    #[test]
    fn test_shuffle_is_permutation() {
        let mut rng = DeterministicRng::new(9);
        let mut arr: Vec<u32> = (0..32).collect();

        rng.shuffle(&mut arr);
        let mut sorted = arr.clone();
        sorted.sort_unstable();

        assert_eq!(sorted, (0..32).collect::<Vec<_>>());
    }

    #[test]
    fn test_shuffle_trivial_slices() {
        let mut rng = DeterministicRng::new(3);

        let mut empty: [u8; 0] = [];
        rng.shuffle(&mut empty);

        let mut single = [7];
        rng.shuffle(&mut single);
        assert_eq!(single, [7]);
    }

    #[test]
    fn test_session_seed_derivation() {
        let seed1 = derive_session_seed(&[1; 16]);
        let seed2 = derive_session_seed(&[1; 16]);
        let seed3 = derive_session_seed(&[2; 16]);

        assert_eq!(seed1, seed2);
        assert_ne!(seed1, seed3);
    }

    #[test]
    fn test_state_checkpoint() {
        let mut rng = DeterministicRng::new(5555);

        for _ in 0..50 {
            rng.next_u64();
        }

        let saved_state = rng.state();
        let next_values: Vec<u64> = (0..10).map(|_| rng.next_u64()).collect();

        rng.set_state(saved_state);

        for expected in next_values {
            assert_eq!(rng.next_u64(), expected);
        }
    }
}
