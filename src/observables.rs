// src/observables.rs
//
// Observable sampling at the measurement cadence.
//
// The driver owns the cadence; the samplers only accumulate. Topological
// charge uses the Berg-Luscher solid-angle formula over the lattice's
// oriented triangle cells:
//
//   q = (1/4pi) sum_t  2 atan2( S1 . (S2 x S3),
//                               1 + S1.S2 + S2.S3 + S3.S1 )

use std::sync::Arc;

use crate::hamiltonian::Hamiltonian;
use crate::lattice::{Lattice, TriangleCell};
use crate::vec3;

pub trait Measurement {
    fn measure(&mut self, spins: &[[f64; 3]], hamiltonian: &Hamiltonian);
}

/// Running mean/variance (Welford).
#[derive(Debug, Clone, Copy, Default)]
pub struct Accumulator {
    count: u64,
    mean: f64,
    m2: f64,
}

impl Accumulator {
    pub fn push(&mut self, x: f64) {
        self.count += 1;
        let d = x - self.mean;
        self.mean += d / self.count as f64;
        self.m2 += d * (x - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population variance; zero until two samples exist.
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / self.count as f64
        }
    }
}

/// Total-energy sampler.
#[derive(Default)]
pub struct EnergyObservable {
    pub samples: Accumulator,
}

impl Measurement for EnergyObservable {
    fn measure(&mut self, spins: &[[f64; 3]], hamiltonian: &Hamiltonian) {
        self.samples.push(hamiltonian.total_energy(spins));
    }
}

/// Magnetization sampler: accumulates |M| and keeps the last vector.
#[derive(Default)]
pub struct MagnetisationObservable {
    pub magnitude: Accumulator,
    pub last: [f64; 3],
}

impl Measurement for MagnetisationObservable {
    fn measure(&mut self, spins: &[[f64; 3]], _hamiltonian: &Hamiltonian) {
        let mut m = [0.0; 3];
        for s in spins {
            m = vec3::add(m, *s);
        }
        self.last = m;
        self.magnitude.push(vec3::norm(m));
    }
}

/// Discrete topological charge over oriented triangle cells.
pub fn topological_charge(cells: &[TriangleCell], spins: &[[f64; 3]]) -> f64 {
    let mut q = 0.0;
    for cell in cells {
        let Some([a, b, c]) = cell.sites() else { continue };
        let (s1, s2, s3) = (spins[a], spins[b], spins[c]);
        let numerator = vec3::dot(s1, vec3::cross(s2, s3));
        let denominator =
            1.0 + vec3::dot(s1, s2) + vec3::dot(s2, s3) + vec3::dot(s3, s1);
        q += 2.0 * numerator.atan2(denominator);
    }
    q / (4.0 * std::f64::consts::PI)
}

pub struct TopologicalChargeObservable {
    lattice: Arc<Lattice>,
    pub samples: Accumulator,
}

impl TopologicalChargeObservable {
    pub fn new(lattice: Arc<Lattice>) -> Self {
        Self {
            lattice,
            samples: Accumulator::default(),
        }
    }
}

impl Measurement for TopologicalChargeObservable {
    fn measure(&mut self, spins: &[[f64; 3]], _hamiltonian: &Hamiltonian) {
        self.samples
            .push(topological_charge(self.lattice.triangle_cells(), spins));
    }
}

/// Runs several samplers at the same cadence.
#[derive(Default)]
pub struct MeasurementSet {
    members: Vec<Box<dyn Measurement>>,
}

impl MeasurementSet {
    pub fn push(&mut self, member: Box<dyn Measurement>) {
        self.members.push(member);
    }
}

impl Measurement for MeasurementSet {
    fn measure(&mut self, spins: &[[f64; 3]], hamiltonian: &Hamiltonian) {
        for m in &mut self.members {
            m.measure(spins, hamiltonian);
        }
    }
}
