//! State Hashing for Verification
//!
//! Deterministic SHA-256 digests of match state. Two sessions that resolve
//! the same moves from the same state must produce the same digest.

use sha2::{Digest, Sha256};

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Deterministic hasher for game state.
///
/// Order of updates is part of the digest; callers feed fields in a fixed order.
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

    /// Create hasher for match state.
    pub fn for_match_state() -> Self {
        Self::new(b"RPS_ARENA_STATE_V1")
    }

    /// Update with a u8 value.
    #[inline]
    pub fn update_u8(&mut self, value: u8) {
        self.hasher.update([value]);
    }

    /// Update with a u32 value (big-endian).
    #[inline]
    pub fn update_u32(&mut self, value: u32) {
        self.hasher.update(value.to_be_bytes());
    }

    /// Update with an i32 value (big-endian).
    #[inline]
    pub fn update_i32(&mut self, value: i32) {
        self.hasher.update(value.to_be_bytes());
    }

    /// Finalize and return the hash.
    pub fn finalize(self) -> StateHash {
        self.hasher.finalize().into()
    }
}

/// Compute state hash for match verification.
///
/// Called by `MatchState::compute_hash()`; the closure adds state fields
/// after the round counter.
pub fn compute_state_hash<F>(round: u32, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::for_match_state();
    hasher.update_u32(round);
    add_state(&mut hasher);
    hasher.finalize()
}

/// Short hex prefix of a hash for log lines.
pub fn short_hex(hash: &StateHash) -> String {
    hex::encode(&hash[..4])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_state_hash() {
        let hash = compute_state_hash(3, |hasher| {
            hasher.update_i32(90);
            hasher.update_u8(1);
        });

        let hash2 = compute_state_hash(3, |hasher| {
            hasher.update_i32(90);
            hasher.update_u8(1);
        });
        assert_eq!(hash, hash2);

        let hash3 = compute_state_hash(4, |hasher| {
            hasher.update_i32(90);
            hasher.update_u8(1);
        });
        assert_ne!(hash, hash3);
    }

    #[test]
    fn test_update_order_matters() {
        let a = compute_state_hash(0, |h| {
            h.update_u32(1);
            h.update_u32(2);
        });
        let b = compute_state_hash(0, |h| {
            h.update_u32(2);
            h.update_u32(1);
        });
        assert_ne!(a, b);
    }

    #[test]
    fn test_short_hex() {
        let hash = [0xab; 32];
        assert_eq!(short_hex(&hash), "abababab");
    }
}
