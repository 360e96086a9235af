// src/energy/tip.rs
//
// Localized field from a magnetic tip modeled as a point dipole above the
// lattice:
//   B(r) = g * (3 (m . r_hat) r_hat - m) / |r|^3
//   E_i = -B(r_i) . S_i
// with m the tip moment direction (unit) and g the strength in
// meV * (lattice unit)^3. Sites closer than a short core cutoff see no
// field rather than a divergent one.

use std::sync::Arc;

use crate::energy::EnergyTerm;
use crate::lattice::Lattice;
use crate::vec3;

/// Sites inside this radius of the tip position are skipped.
const CORE_CUTOFF: f64 = 1e-3;

pub struct TipEnergy {
    lattice: Arc<Lattice>,
    position: [f64; 3],
    moment: [f64; 3],
    strength: f64,
}

impl TipEnergy {
    pub fn new(
        lattice: Arc<Lattice>,
        position: [f64; 3],
        moment: [f64; 3],
        strength: f64,
    ) -> Self {
        Self {
            lattice,
            position,
            moment: vec3::normalize_or(moment, [0.0, 0.0, 1.0]),
            strength,
        }
    }

    fn tip_field(&self, site: usize) -> [f64; 3] {
        let r = vec3::sub(self.lattice.coords()[site], self.position);
        let d2 = vec3::dot(r, r);
        if d2 < CORE_CUTOFF * CORE_CUTOFF {
            return [0.0; 3];
        }
        let d = d2.sqrt();
        let r_hat = vec3::scale(r, 1.0 / d);
        let proj = vec3::dot(self.moment, r_hat);
        let dip = vec3::sub(vec3::scale(r_hat, 3.0 * proj), self.moment);
        vec3::scale(dip, self.strength / (d2 * d))
    }
}

impl EnergyTerm for TipEnergy {
    fn site_energy(&self, spins: &[[f64; 3]], site: usize) -> f64 {
        -vec3::dot(self.tip_field(site), spins[site])
    }

    fn field(&self, _spins: &[[f64; 3]], site: usize) -> [f64; 3] {
        self.tip_field(site)
    }

    fn label(&self) -> &str {
        "tip"
    }
}
