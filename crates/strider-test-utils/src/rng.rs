//! Deterministic RNG utilities for reproducible tests.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Create a deterministic `ChaCha8Rng` from a seed.
///
/// All test randomization should go through this to ensure reproducibility.
pub fn seeded_rng(seed: u64) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed)
}

/// Deterministic offsets in `[-amplitude, amplitude]`, e.g. for jittering joint poses.
pub fn jitter(count: usize, amplitude: f64, seed: u64) -> Vec<f64> {
    use rand::Rng;
    let mut rng = seeded_rng(seed);
    (0..count)
        .map(|_| rng.gen_range(-amplitude..=amplitude))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_rng_is_deterministic() {
        use rand::Rng;
        let v1: f64 = seeded_rng(42).r#gen();
        let v2: f64 = seeded_rng(42).r#gen();
        assert!((v1 - v2).abs() < f64::EPSILON);
    }

    #[test]
    fn jitter_stays_in_bounds() {
        let values = jitter(50, 0.25, 7);
        assert_eq!(values.len(), 50);
        assert!(values.iter().all(|v| v.abs() <= 0.25));
        assert_eq!(values, jitter(50, 0.25, 7));
    }
}
