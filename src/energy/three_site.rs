// src/energy/three_site.rs
//
// Three-site scalar-chirality interaction over the oriented triangle
// triples:
//   E_cell = K * S1 . (S2 x S3)
// The triples are stored counterclockwise, so the sign of the chirality
// is well defined across the lattice. The scalar triple product is cyclic
// in (1,2,3) and flips sign under swapping two spins, which makes the
// per-corner gradient the cross product of the other two spins in cyclic
// order.

use std::sync::Arc;

use crate::energy::EnergyTerm;
use crate::lattice::Lattice;
use crate::vec3;

pub struct ThreeSiteEnergy {
    lattice: Arc<Lattice>,
    coupling: f64,
    /// Valid triple indices per site.
    membership: Vec<Vec<usize>>,
}

impl ThreeSiteEnergy {
    pub fn new(lattice: Arc<Lattice>, coupling: f64) -> Self {
        let mut membership = vec![Vec::new(); lattice.len()];
        for (index, cell) in lattice.three_site_cells().iter().enumerate() {
            if let Some(triple) = cell.sites() {
                for &site in &triple {
                    membership[site].push(index);
                }
            }
        }
        Self {
            lattice,
            coupling,
            membership,
        }
    }
}

impl EnergyTerm for ThreeSiteEnergy {
    fn site_energy(&self, spins: &[[f64; 3]], site: usize) -> f64 {
        let cells = self.lattice.three_site_cells();
        let mut e = 0.0;
        for &index in &self.membership[site] {
            if let Some([a, b, c]) = cells[index].sites() {
                e += self.coupling * vec3::dot(spins[a], vec3::cross(spins[b], spins[c]));
            }
        }
        e
    }

    fn field(&self, spins: &[[f64; 3]], site: usize) -> [f64; 3] {
        let cells = self.lattice.three_site_cells();
        let mut field = [0.0; 3];
        for &index in &self.membership[site] {
            let Some([a, b, c]) = cells[index].sites() else { continue };
            // cyclic: dE/dS_a = K (S_b x S_c), etc.
            let grad = if site == a {
                vec3::cross(spins[b], spins[c])
            } else if site == b {
                vec3::cross(spins[c], spins[a])
            } else if site == c {
                vec3::cross(spins[a], spins[b])
            } else {
                continue;
            };
            field = vec3::add(field, vec3::scale(grad, -self.coupling));
        }
        field
    }

    fn label(&self) -> &str {
        "three_site"
    }

    fn site_sum_weight(&self) -> f64 {
        1.0 / 3.0
    }
}
