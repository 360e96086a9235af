// src/energy/dipolar.rs
//
// All-pairs dipole-dipole interaction, no cutoff:
//   E_i = g * sum_{j != i} [ S_i . S_j - 3 (S_i . r_hat)(S_j . r_hat) ] / r^3
//   B_i = g * sum_{j != i} [ 3 (S_j . r_hat) r_hat - S_j ] / r^3
// with r the minimum-image displacement between i and j. O(N^2) per total
// evaluation; the prefactor g (meV * (lattice unit)^3) absorbs the moment
// and mu0 factors.

use std::sync::Arc;

use crate::energy::EnergyTerm;
use crate::lattice::Lattice;
use crate::vec3;

pub struct DipolarEnergy {
    lattice: Arc<Lattice>,
    strength: f64,
}

impl DipolarEnergy {
    pub fn new(lattice: Arc<Lattice>, strength: f64) -> Self {
        Self { lattice, strength }
    }
}

impl EnergyTerm for DipolarEnergy {
    fn site_energy(&self, spins: &[[f64; 3]], site: usize) -> f64 {
        let mut e = 0.0;
        for j in 0..spins.len() {
            if j == site {
                continue;
            }
            let r = self.lattice.displacement(site, j);
            let d2 = vec3::dot(r, r);
            let d = d2.sqrt();
            let r_hat = vec3::scale(r, 1.0 / d);
            let si_r = vec3::dot(spins[site], r_hat);
            let sj_r = vec3::dot(spins[j], r_hat);
            e += (vec3::dot(spins[site], spins[j]) - 3.0 * si_r * sj_r) / (d2 * d);
        }
        self.strength * e
    }

    fn field(&self, spins: &[[f64; 3]], site: usize) -> [f64; 3] {
        let mut b = [0.0; 3];
        for j in 0..spins.len() {
            if j == site {
                continue;
            }
            let r = self.lattice.displacement(site, j);
            let d2 = vec3::dot(r, r);
            let d = d2.sqrt();
            let r_hat = vec3::scale(r, 1.0 / d);
            let sj_r = vec3::dot(spins[j], r_hat);
            let contrib = vec3::sub(vec3::scale(r_hat, 3.0 * sj_r), spins[j]);
            b = vec3::add(b, vec3::scale(contrib, 1.0 / (d2 * d)));
        }
        vec3::scale(b, self.strength)
    }

    fn label(&self) -> &str {
        "dipolar"
    }

    fn site_sum_weight(&self) -> f64 {
        0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::{BoundaryKind, LatticeShape, LatticeSpec};

    fn pair() -> Arc<Lattice> {
        Arc::new(
            crate::lattice::shapes::build(&LatticeSpec {
                shape: LatticeShape::SimpleCubic,
                dims: vec![2, 1, 1],
                boundary: BoundaryKind::Open,
                coordinate_file: None,
                image_file: None,
            })
            .unwrap(),
        )
    }

    #[test]
    fn head_to_tail_beats_side_by_side() {
        // two dipoles one unit apart along x: aligned along the bond
        // E = g(1 - 3) = -2g; aligned perpendicular to it E = +g
        let dip = DipolarEnergy::new(pair(), 1.0);
        let head_to_tail = vec![[1.0, 0.0, 0.0]; 2];
        let side_by_side = vec![[0.0, 0.0, 1.0]; 2];
        assert!((dip.total_energy(&head_to_tail) - (-2.0)).abs() < 1e-12);
        assert!((dip.total_energy(&side_by_side) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn field_matches_energy_gradient() {
        let dip = DipolarEnergy::new(pair(), 1.0);
        let spins = vec![[1.0, 0.0, 0.0]; 2];
        let b = dip.field(&spins, 0);
        // B = 3 r_hat - S_j = 2 x_hat, energy -B.S = -2 = site energy
        assert!((b[0] - 2.0).abs() < 1e-12);
        assert!((dip.site_energy(&spins, 0) - (-vec3::dot(b, spins[0]))).abs() < 1e-12);
    }
}
