//! Deterministic randomness
//!
//! Every generator draws from a `Pcg32` seeded here. Components derive their
//! own seed from the engine seed and a string key through SHA-256, so adding
//! or reordering components never shifts another component's stream.

use rand::SeedableRng;
use rand_pcg::Pcg32;
use sha2::{Digest, Sha256};

/// Create a PCG32 generator from a 64-bit seed
pub fn create_rng(seed: u64) -> Pcg32 {
    Pcg32::seed_from_u64(seed)
}

/// Derive an independent seed for the component named `key`
pub fn derive_component_seed(base_seed: u64, key: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(base_seed.to_le_bytes());
    hasher.update(key.as_bytes());
    let hash = hasher.finalize();

    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&hash[..8]);
    u64::from_le_bytes(bytes)
}

/// Create the generator for the component named `key`
pub fn component_rng(base_seed: u64, key: &str) -> Pcg32 {
    create_rng(derive_component_seed(base_seed, key))
}

/// Draw a fresh engine seed from system entropy
pub fn entropy_seed() -> u64 {
    rand::random()
}
