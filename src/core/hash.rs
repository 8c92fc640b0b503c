//! Replica State Digests
//!
//! Provides deterministic hashing of the mirrored world for:
//! - Desync diagnostics between client and server
//! - Test assertions that two replicas hold identical state

use sha2::{Sha256, Digest};
use super::geometry::{Rectangle, Vector2};

/// Hash output type (256 bits / 32 bytes)
pub type StateHash = [u8; 32];

/// Deterministic hasher for replica state.
///
/// Wraps SHA-256 with helpers for geometry types.
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

    /// Create hasher for realm state.
    pub fn for_realm() -> Self {
        Self::new(b"REALM_REPLICA_STATE_V1")
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

    /// Update with an i32 value (little-endian).
    #[inline]
    pub fn update_i32(&mut self, value: i32) {
        self.hasher.update(value.to_le_bytes());
    }

    /// Update with an f64 by bit pattern.
    #[inline]
    pub fn update_f64(&mut self, value: f64) {
        self.update_u64(value.to_bits());
    }

    /// Update with a Vector2.
    #[inline]
    pub fn update_vec2(&mut self, value: Vector2) {
        self.update_f64(value.x);
        self.update_f64(value.y);
    }

    /// Update with a Rectangle.
    #[inline]
    pub fn update_rect(&mut self, value: &Rectangle) {
        self.update_f64(value.left);
        self.update_f64(value.top);
        self.update_f64(value.width);
        self.update_f64(value.height);
    }

    /// Update with a length-prefixed string.
    #[inline]
    pub fn update_str(&mut self, value: &str) {
        self.update_u32(value.len() as u32);
        self.hasher.update(value.as_bytes());
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

/// Compute a realm digest.
///
/// This function is called by `Realm::compute_hash()`.
/// The closure adds realm-specific data after the realm id.
pub fn compute_state_hash<F>(realm_id: u32, add_state: F) -> StateHash
where
    F: FnOnce(&mut StateHasher),
{
    let mut hasher = StateHasher::for_realm();
    hasher.update_u32(realm_id);
    add_state(&mut hasher);
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_determinism() {
        let a = compute_state_hash(7, |h| {
            h.update_vec2(Vector2::new(1.0, 2.0));
            h.update_str("forest");
        });
        let b = compute_state_hash(7, |h| {
            h.update_vec2(Vector2::new(1.0, 2.0));
            h.update_str("forest");
        });
        assert_eq!(a, b);
    }

    #[test]
    fn test_hash_sensitive_to_order_and_realm() {
        let a = compute_state_hash(7, |h| {
            h.update_u32(1);
            h.update_u32(2);
        });
        let b = compute_state_hash(7, |h| {
            h.update_u32(2);
            h.update_u32(1);
        });
        let c = compute_state_hash(8, |h| {
            h.update_u32(1);
            h.update_u32(2);
        });
        assert_ne!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_string_length_prefix() {
        let a = compute_state_hash(1, |h| {
            h.update_str("ab");
            h.update_str("c");
        });
        let b = compute_state_hash(1, |h| {
            h.update_str("a");
            h.update_str("bc");
        });
        assert_ne!(a, b);
    }
}
