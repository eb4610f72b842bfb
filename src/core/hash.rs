//! State Hashing for Verification
//!
//! Provides deterministic hashing of session state for:
//! - Save/restore integrity checks
//! - Replay validation

use sha2::{Sha256, Digest};

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Deterministic hasher for session state.
///
/// Wraps SHA-256 with typed little-endian helpers.
/// Order of updates is critical for determinism.
pub struct StateHasher {
    hasher: Sha256,
}

impl StateHasher {
    /// Create a new hasher with domain separator.
    pub fn new(domain: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(domain);
        Self { hasher }
    }

    /// Create hasher for session state.
    pub fn for_session_state() -> Self {
        Self::new(b"MEMORY_MATCH_STATE_V1")
    }

    /// Update with raw bytes.
    #[inline]
    pub fn update_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u16 value (little-endian).
    #[inline]
    pub fn update_u16(&mut self, value: u16) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a u32 value (little-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a u64 value (little-endian).
    #[inline]
    pub fn update_u64(&mut self, value: u64) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with a boolean.
    #[inline]
    pub fn update_bool(&mut self, value: bool) {
        self.update_u8(value as u8);
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Compute state hash for session verification.
///
/// Called by `SessionStateMachine::compute_hash()`. The closure appends the
/// board and counters after the seed header.
pub fn compute_state_hash<F>(rng_seed: u64, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::for_session_state();
    hasher.update_u64(rng_seed);
    add_state(&mut hasher);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hasher_determinism() {
        let mut h1 = StateHasher::for_session_state();
        let mut h2 = StateHasher::for_session_state();

        h1.update_u32(42);
        h1.update_bool(true);
        h2.update_u32(42);
        h2.update_bool(true);

        assert_eq!(h1.finalize(), h2.finalize());
    }

    #[test]
    fn test_domain_separation() {
        let mut h1 = StateHasher::new(b"A");
        let mut h2 = StateHasher::new(b"B");
        h1.update_u8(1);
        h2.update_u8(1);

        assert_ne!(h1.finalize(), h2.finalize());
    }

    #[test]
    fn test_update_order_matters() {
        let a = compute_state_hash(1, |h| {
            h.update_u16(1);
            h.update_u16(2);
        });
        let b = compute_state_hash(1, |h| {
            h.update_u16(2);
            h.update_u16(1);
        });

        assert_ne!(a, b);
    }

    #[test]
    fn test_seed_is_part_of_hash() {
        let a = compute_state_hash(1, |h| h.update_bytes(b"board"));
        let b = compute_state_hash(2, |h| h.update_bytes(b"board"));

        assert_ne!(a, b);
    }
}
