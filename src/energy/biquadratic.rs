// src/energy/biquadratic.rs
//
// Biquadratic exchange over the nearest-neighbor shell:
//   E_i = B * sum_{j in shell 1} (S_i . S_j)^2
//   B_i = -2 B * sum_j (S_i . S_j) S_j
// B < 0 favors collinear alignment (parallel or antiparallel equally).

use std::sync::Arc;

use crate::energy::EnergyTerm;
use crate::lattice::Lattice;
use crate::vec3;

pub struct BiquadraticEnergy {
    lattice: Arc<Lattice>,
    coupling: f64,
}

impl BiquadraticEnergy {
    pub fn new(lattice: Arc<Lattice>, coupling: f64) -> Self {
        Self { lattice, coupling }
    }
}

impl EnergyTerm for BiquadraticEnergy {
    fn site_energy(&self, spins: &[[f64; 3]], site: usize) -> f64 {
        let Some(shell) = self.lattice.shell(0) else { return 0.0 };
        let mut e = 0.0;
        for j in shell.neighbors(site) {
            let p = vec3::dot(spins[site], spins[j]);
            e += p * p;
        }
        self.coupling * e
    }

    fn field(&self, spins: &[[f64; 3]], site: usize) -> [f64; 3] {
        let Some(shell) = self.lattice.shell(0) else { return [0.0; 3] };
        let mut b = [0.0; 3];
        for j in shell.neighbors(site) {
            let p = vec3::dot(spins[site], spins[j]);
            b = vec3::add(b, vec3::scale(spins[j], -2.0 * self.coupling * p));
        }
        b
    }

    fn label(&self) -> &str {
        "biquadratic"
    }

    fn site_sum_weight(&self) -> f64 {
        0.5
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::{BoundaryKind, LatticeShape, LatticeSpec};

    #[test]
    fn collinear_states_are_degenerate() {
        let lat = Arc::new(
            crate::lattice::shapes::build(&LatticeSpec {
                shape: LatticeShape::SimpleCubic,
                dims: vec![2, 1, 1],
                boundary: BoundaryKind::Open,
                coordinate_file: None,
                image_file: None,
            })
            .unwrap(),
        );
        let bq = BiquadraticEnergy::new(lat, -1.0);
        let parallel = vec![[0.0, 0.0, 1.0], [0.0, 0.0, 1.0]];
        let anti = vec![[0.0, 0.0, 1.0], [0.0, 0.0, -1.0]];
        let cross = vec![[0.0, 0.0, 1.0], [1.0, 0.0, 0.0]];
        let e_par = bq.total_energy(&parallel);
        assert!((e_par - bq.total_energy(&anti)).abs() < 1e-12);
        assert!((e_par - (-1.0)).abs() < 1e-12);
        assert!(bq.total_energy(&cross).abs() < 1e-12);
    }
}
