// src/energy/zeeman.rs
//
// Uniform external field:
//   E_i = -H . S_i          B_i = H
// H carries the moment already (meV per unit spin).

use crate::energy::EnergyTerm;
use crate::vec3;

pub struct ZeemanEnergy {
    field: [f64; 3],
}

impl ZeemanEnergy {
    pub fn new(field: [f64; 3]) -> Self {
        Self { field }
    }
}

impl EnergyTerm for ZeemanEnergy {
    fn site_energy(&self, spins: &[[f64; 3]], site: usize) -> f64 {
        -vec3::dot(self.field, spins[site])
    }

    fn field(&self, _spins: &[[f64; 3]], _site: usize) -> [f64; 3] {
        self.field
    }

    fn label(&self) -> &str {
        "zeeman"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aligned_spin_minimizes_zeeman_energy() {
        let z = ZeemanEnergy::new([0.0, 0.0, 2.0]);
        let aligned = vec![[0.0, 0.0, 1.0]];
        let opposed = vec![[0.0, 0.0, -1.0]];
        assert!((z.site_energy(&aligned, 0) - (-2.0)).abs() < 1e-12);
        assert!((z.site_energy(&opposed, 0) - 2.0).abs() < 1e-12);
        assert_eq!(z.field(&aligned, 0), [0.0, 0.0, 2.0]);
    }
}
