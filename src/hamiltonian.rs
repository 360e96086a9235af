// src/hamiltonian.rs
//
// Ordered list of interaction terms. Every query takes the spin buffer as
// an explicit parameter so the same Hamiltonian can be evaluated against
// the committed spin array and against an integrator's trial array without
// any retargeting of shared state.

use rayon::prelude::*;

use crate::energy::EnergyTerm;
use crate::error::SimError;
use crate::vec3;

pub struct Hamiltonian {
    terms: Vec<Box<dyn EnergyTerm>>,
}

impl Hamiltonian {
    pub fn new(terms: Vec<Box<dyn EnergyTerm>>) -> Self {
        Self { terms }
    }

    pub fn term_count(&self) -> usize {
        self.terms.len()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.terms.iter().map(|t| t.label()).collect()
    }

    /// Energy of every interaction involving `site`, summed over terms.
    /// This is the "before"/"after" half of a Metropolis trial.
    pub fn single_energy(&self, spins: &[[f64; 3]], site: usize) -> f64 {
        self.terms.iter().map(|t| t.site_energy(spins, site)).sum()
    }

    /// Effective field -dE/dS at `site`, summed over terms.
    pub fn effective_field(&self, spins: &[[f64; 3]], site: usize) -> [f64; 3] {
        let mut b = [0.0; 3];
        for t in &self.terms {
            b = vec3::add(b, t.field(spins, site));
        }
        b
    }

    /// Total energy over the whole lattice, pair multiplicity corrected.
    pub fn total_energy(&self, spins: &[[f64; 3]]) -> f64 {
        self.terms
            .par_iter()
            .map(|t| t.total_energy(spins))
            .sum()
    }

    /// Total energy of one term.
    pub fn part_energy(&self, spins: &[[f64; 3]], index: usize) -> Result<f64, SimError> {
        let term = self.term(index)?;
        Ok(term.total_energy(spins))
    }

    /// One term's local energy at one site (color-map style query).
    pub fn single_part_energy(
        &self,
        spins: &[[f64; 3]],
        index: usize,
        site: usize,
    ) -> Result<f64, SimError> {
        if site >= spins.len() {
            return Err(SimError::SiteOutOfRange {
                site,
                len: spins.len(),
            });
        }
        let term = self.term(index)?;
        Ok(term.site_energy(spins, site))
    }

    fn term(&self, index: usize) -> Result<&dyn EnergyTerm, SimError> {
        self.terms
            .get(index)
            .map(|t| t.as_ref())
            .ok_or(SimError::TermOutOfRange {
                index,
                count: self.terms.len(),
            })
    }
}
