// src/energy/mod.rs
//
// Magnetic interaction terms. Each term exposes a per-site energy and the
// matching effective-field contribution B_i = -dE/dS_i (meV per moment).
//
// `site_energy(spins, i)` counts every interaction involving site i at
// full strength, which is exactly what a single-site trial move needs.
// Summing it over all sites therefore counts pair (cell) interactions
// twice (cell-size times); `site_sum_weight` corrects the total.
//
// The spin buffer is always an explicit parameter. The LLG corrector
// evaluates fields against its trial buffer by passing it here; no term
// holds a spin pointer.

pub mod anisotropy;
pub mod biquadratic;
pub mod dipolar;
pub mod dm;
pub mod exchange;
pub mod four_spin;
pub mod three_site;
pub mod tip;
pub mod zeeman;

use rayon::prelude::*;

pub use anisotropy::{HexagonalAnisotropy, UniaxialAnisotropy};
pub use biquadratic::BiquadraticEnergy;
pub use dipolar::DipolarEnergy;
pub use dm::{DmEnergy, DmKind};
pub use exchange::ExchangeEnergy;
pub use four_spin::FourSpinEnergy;
pub use three_site::ThreeSiteEnergy;
pub use tip::TipEnergy;
pub use zeeman::ZeemanEnergy;

use crate::vec3;

pub trait EnergyTerm: Send + Sync {
    /// Energy of every interaction involving `site`, in meV, evaluated on
    /// `spins`.
    fn site_energy(&self, spins: &[[f64; 3]], site: usize) -> f64;

    /// Effective-field contribution -dE/dS at `site`.
    fn field(&self, spins: &[[f64; 3]], site: usize) -> [f64; 3];

    /// Identifier for per-term energy queries and display.
    fn label(&self) -> &str;

    /// Multiplicity correction when summing `site_energy` over all sites:
    /// 0.5 for pair terms, 1/cell-size for cell terms, 1 for on-site terms.
    fn site_sum_weight(&self) -> f64 {
        1.0
    }

    /// Total energy of this term over the whole lattice.
    fn total_energy(&self, spins: &[[f64; 3]]) -> f64 {
        let sum: f64 = (0..spins.len())
            .into_par_iter()
            .map(|i| self.site_energy(spins, i))
            .sum();
        sum * self.site_sum_weight()
    }
}

/// Spatial modulation of a coupling constant:
/// factor(r) = 1 + amplitude * cos(q.r + phase).
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct Modulation {
    pub amplitude: f64,
    pub wave_vector: [f64; 3],
    #[serde(default)]
    pub phase: f64,
}

impl Modulation {
    pub fn factor(&self, r: [f64; 3]) -> f64 {
        1.0 + self.amplitude * (vec3::dot(self.wave_vector, r) + self.phase).cos()
    }
}
