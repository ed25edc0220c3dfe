//! Core deterministic primitives.
//!
//! Hashing used to fingerprint match state between rounds.

pub mod hash;

pub use hash::{compute_state_hash, StateHash, StateHasher};
