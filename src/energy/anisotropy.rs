// src/energy/anisotropy.rs
//
// On-site magnetocrystalline anisotropy.
//
// Uniaxial, for each configured (K, e) pair:
//   E_i = -K (S_i . e)^2          B_i = 2 K (S_i . e) e
// K > 0 makes e an easy axis, K < 0 an easy plane.
//
// Hexagonal: three in-plane axes at 0, 60 and 120 degrees with one
// coefficient each, same quadratic form per axis.
//
// An optional spatial modulation scales K site by site.

use std::sync::Arc;

use crate::energy::{EnergyTerm, Modulation};
use crate::lattice::Lattice;
use crate::vec3;

pub struct UniaxialAnisotropy {
    lattice: Arc<Lattice>,
    /// (K in meV, unit axis) pairs, all applied at every site.
    axes: Vec<(f64, [f64; 3])>,
    modulation: Option<Modulation>,
}

impl UniaxialAnisotropy {
    pub fn new(lattice: Arc<Lattice>, axes: Vec<(f64, [f64; 3])>) -> Self {
        Self {
            lattice,
            axes,
            modulation: None,
        }
    }

    pub fn set_modulation(&mut self, modulation: Option<Modulation>) {
        self.modulation = modulation;
    }

    fn scale_at(&self, site: usize) -> f64 {
        match &self.modulation {
            None => 1.0,
            Some(m) => m.factor(self.lattice.coords()[site]),
        }
    }
}

impl EnergyTerm for UniaxialAnisotropy {
    fn site_energy(&self, spins: &[[f64; 3]], site: usize) -> f64 {
        let f = self.scale_at(site);
        let mut e = 0.0;
        for &(k, axis) in &self.axes {
            let p = vec3::dot(spins[site], axis);
            e -= f * k * p * p;
        }
        e
    }

    fn field(&self, spins: &[[f64; 3]], site: usize) -> [f64; 3] {
        let f = self.scale_at(site);
        let mut b = [0.0; 3];
        for &(k, axis) in &self.axes {
            let p = vec3::dot(spins[site], axis);
            b = vec3::add(b, vec3::scale(axis, 2.0 * f * k * p));
        }
        b
    }

    fn label(&self) -> &str {
        "anisotropy"
    }
}

/// Three in-plane axes at 0/60/120 degrees, one coefficient each.
pub struct HexagonalAnisotropy {
    inner: UniaxialAnisotropy,
}

impl HexagonalAnisotropy {
    pub fn new(lattice: Arc<Lattice>, coefficients: [f64; 3]) -> Self {
        let axes = [0.0_f64, 60.0, 120.0]
            .iter()
            .zip(coefficients.iter())
            .map(|(&deg, &k)| {
                let a = deg.to_radians();
                (k, [a.cos(), a.sin(), 0.0])
            })
            .collect();
        Self {
            inner: UniaxialAnisotropy::new(lattice, axes),
        }
    }
}

impl EnergyTerm for HexagonalAnisotropy {
    fn site_energy(&self, spins: &[[f64; 3]], site: usize) -> f64 {
        self.inner.site_energy(spins, site)
    }

    fn field(&self, spins: &[[f64; 3]], site: usize) -> [f64; 3] {
        self.inner.field(spins, site)
    }

    fn label(&self) -> &str {
        "hexagonal_anisotropy"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::{BoundaryKind, LatticeShape, LatticeSpec};

    fn single_site() -> Arc<Lattice> {
        Arc::new(
            crate::lattice::shapes::build(&LatticeSpec {
                shape: LatticeShape::SimpleCubic,
                dims: vec![1, 1, 1],
                boundary: BoundaryKind::Open,
                coordinate_file: None,
                image_file: None,
            })
            .unwrap(),
        )
    }

    #[test]
    fn easy_axis_minimum_along_axis() {
        let a = UniaxialAnisotropy::new(single_site(), vec![(0.5, [0.0, 0.0, 1.0])]);
        let along = vec![[0.0, 0.0, 1.0]];
        let across = vec![[1.0, 0.0, 0.0]];
        assert!((a.site_energy(&along, 0) - (-0.5)).abs() < 1e-12);
        assert!(a.site_energy(&across, 0).abs() < 1e-12);
        // field restores the spin toward the axis
        let tilted = vec![crate::vec3::normalize([1.0, 0.0, 1.0]).unwrap()];
        let b = a.field(&tilted, 0);
        assert!(b[2] > 0.0 && b[0].abs() < 1e-12);
    }

    #[test]
    fn hexagonal_term_is_in_plane() {
        let h = HexagonalAnisotropy::new(single_site(), [0.3, 0.3, 0.3]);
        let up = vec![[0.0, 0.0, 1.0]];
        assert!(h.site_energy(&up, 0).abs() < 1e-12);
        assert!(h.field(&up, 0).iter().all(|c| c.abs() < 1e-12));
        // equal coefficients: in-plane energy is isotropic,
        // sum of cos^2 over the three axes is 3/2
        let x = vec![[1.0, 0.0, 0.0]];
        assert!((h.site_energy(&x, 0) - (-0.45)).abs() < 1e-12);
    }
}
