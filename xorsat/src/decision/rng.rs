//! Deterministic random number generation for branching.
//!
//! The floating point linear congruential generator that MiniSat derived
//! solvers use for their random decisions. It is cheap, has no external
//! state, and makes runs exactly reproducible for a fixed seed.

/// The default seed, used when the configured seed is 0.
const DEFAULT_SEED: f64 = 91648253.0;

/// Decision RNG.
pub struct SolverRng {
    seed: f64,
}

impl Default for SolverRng {
    fn default() -> SolverRng {
        SolverRng { seed: DEFAULT_SEED }
    }
}

impl SolverRng {
    /// Reset the generator. A seed of 0 selects the built-in default, as the
    /// generator state must never be zero.
    pub fn set_seed(&mut self, seed: u64) {
        self.seed = if seed == 0 {
            DEFAULT_SEED
        } else {
            seed as f64
        };
    }

    /// Returns a random float 0 <= x < 1.
    pub fn drand(&mut self) -> f64 {
        self.seed *= 1389796.0;
        let q = (self.seed / 2147483647.0) as i64;
        self.seed -= (q as f64) * 2147483647.0;
        self.seed / 2147483647.0
    }

    /// Returns a random integer 0 <= x < size.
    pub fn irand(&mut self, size: usize) -> usize {
        (self.drand() * (size as f64)) as usize
    }

    /// Returns true with probability p.
    pub fn chance(&mut self, p: f64) -> bool {
        p > 0.0 && self.drand() < p
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deterministic_for_fixed_seed() {
        let mut a = SolverRng::default();
        let mut b = SolverRng::default();
        a.set_seed(12345);
        b.set_seed(12345);

        for _ in 0..100 {
            assert_eq!(a.drand().to_bits(), b.drand().to_bits());
        }
    }

    #[test]
    fn irand_in_range() {
        let mut rng = SolverRng::default();
        for _ in 0..1000 {
            assert!(rng.irand(7) < 7);
        }
    }

    #[test]
    fn zero_seed_falls_back_to_default() {
        let mut a = SolverRng::default();
        let mut b = SolverRng::default();
        b.set_seed(0);
        assert_eq!(a.drand().to_bits(), b.drand().to_bits());
    }
}
