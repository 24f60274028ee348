//! Deterministic random sources for resampling and permutation.
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Derives a per-component seed from the base seed and a label, so parallel
/// workers draw independent streams that do not depend on scheduling.
///
/// `DefaultHasher` is only stable within one Rust release: a seeded run
/// reproduces exactly on the same toolchain, not across compiler upgrades.
pub fn seed_for<L: Hash>(base_seed: u64, label: L) -> u64 {
    let mut hasher = DefaultHasher::new();
    base_seed.hash(&mut hasher);
    label.hash(&mut hasher);
    hasher.finish()
}

/// A generator for `label`. `None` draws from OS entropy.
pub fn rng_for<L: Hash>(base_seed: Option<u64>, label: L) -> ChaCha8Rng {
    match base_seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed_for(seed, label)),
        None => ChaCha8Rng::from_entropy(),
    }
}
