//! Deterministic seeded random draws (C10).
//!
//! Everywhere randomness is needed — arbitration tie-breaks, injection
//! destination selection — it is drawn from the single [`Rng`] created at
//! startup from the user's `seed:` option, so that a run is
//! bit-deterministic given the same seed, traffic inputs, and options. A
//! fixed, named `StdRng` is used instead of `thread_rng()` so draws are
//! reproducible instead of process-random.

use rand::rngs::StdRng;
use rand::{Rng as _, SeedableRng};

/// A seeded, deterministic source of randomness.
#[derive(Debug, Clone)]
pub struct Rng {
    inner: StdRng,
}

impl Rng {
    /// Builds an `Rng` from the user-supplied `seed:` option.
    pub fn from_seed(seed: u64) -> Rng {
        Rng {
            inner: StdRng::seed_from_u64(seed),
        }
    }

    /// Draws a uniform integer in the half-open range `[0, bound)`. Used
    /// consistently for every tie-break and index pick in the arbitration
    /// stages, rather than mixing inclusive and exclusive bounds.
    pub fn uniform_below(&mut self, bound: usize) -> usize {
        assert!(bound > 0, "uniform_below called with empty range");
        self.inner.gen_range(0, bound)
    }

    /// Draws a uniform f64 in `[0.0, 1.0)`, used by the hotspot-percentage
    /// and self-similar traffic shaper collaborators.
    pub fn uniform_unit(&mut self) -> f64 {
        self.inner.gen_range(0.0, 1.0)
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_sequence() {
        let mut a = Rng::from_seed(42);
        let mut b = Rng::from_seed(42);
        for _ in 0..100 {
            assert_eq!(a.uniform_below(17), b.uniform_below(17));
        }
    }

    #[test]
    fn different_seed_usually_diverges() {
        let mut a = Rng::from_seed(1);
        let mut b = Rng::from_seed(2);
        let draws_a: Vec<usize> = (0..32).map(|_| a.uniform_below(1_000_000)).collect();
        let draws_b: Vec<usize> = (0..32).map(|_| b.uniform_below(1_000_000)).collect();
        assert_ne!(draws_a, draws_b);
    }

    #[test]
    fn uniform_below_is_half_open() {
        let mut rng = Rng::from_seed(7);
        for _ in 0..1000 {
            let draw = rng.uniform_below(3);
            assert!(draw < 3);
        }
    }
}
