// src/rng.rs
//
// Pseudo-random number source for the simulation methods.
//
// One RandomSource drives a whole run: Metropolis draws trial directions
// and acceptance uniforms from it, LLG draws the thermal-field normals.
// It is seeded explicitly so that two runs with identical configuration
// produce identical trajectories.
//
// Standard normals come from the polar (Marsaglia) variant of Box-Muller:
// each round trip produces a *pair* of independent deviates, and the spare
// is cached for the next call.

use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256StarStar;

#[derive(Debug, Clone)]
pub struct RandomSource {
    rng: Xoshiro256StarStar,
    spare_normal: Option<f64>,
}

impl RandomSource {
    pub fn from_seed(seed: u64) -> Self {
        Self {
            rng: Xoshiro256StarStar::seed_from_u64(seed),
            spare_normal: None,
        }
    }

    /// Uniform f64 in [0, 1).
    #[inline]
    pub fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Uniform f64 in [lo, hi).
    #[inline]
    pub fn uniform_range(&mut self, lo: f64, hi: f64) -> f64 {
        self.rng.gen_range(lo..hi)
    }

    /// Uniform integer in [0, n). `n` must be > 0.
    #[inline]
    pub fn below(&mut self, n: usize) -> usize {
        self.rng.gen_range(0..n)
    }

    /// Fisher-Yates shuffle of an index list (randomizes trial order
    /// within a Metropolis sweep).
    #[inline]
    pub fn shuffle(&mut self, indices: &mut [usize]) {
        indices.shuffle(&mut self.rng);
    }

    /// One standard-normal deviate. Pairs are generated by the polar
    /// Box-Muller method; the second member of each pair is cached.
    pub fn standard_normal(&mut self) -> f64 {
        if let Some(z) = self.spare_normal.take() {
            return z;
        }
        loop {
            let u = 2.0 * self.uniform() - 1.0;
            let v = 2.0 * self.uniform() - 1.0;
            let s = u * u + v * v;
            if s > 0.0 && s < 1.0 {
                let f = (-2.0 * s.ln() / s).sqrt();
                self.spare_normal = Some(v * f);
                return u * f;
            }
        }
    }

    /// A pair of independent standard normals (one polar round trip, unless
    /// a spare was cached).
    pub fn standard_normal_pair(&mut self) -> (f64, f64) {
        (self.standard_normal(), self.standard_normal())
    }

    /// Standard-normal 3-vector (thermal field draw).
    pub fn normal3(&mut self) -> [f64; 3] {
        [
            self.standard_normal(),
            self.standard_normal(),
            self.standard_normal(),
        ]
    }

    /// Uniformly distributed direction on the unit sphere (Marsaglia
    /// rejection in the disk; no trig calls).
    pub fn unit_sphere(&mut self) -> [f64; 3] {
        loop {
            let u = 2.0 * self.uniform() - 1.0;
            let v = 2.0 * self.uniform() - 1.0;
            let s = u * u + v * v;
            if s < 1.0 {
                let f = 2.0 * (1.0 - s).sqrt();
                return [u * f, v * f, 1.0 - 2.0 * s];
            }
        }
    }
}
