// src/sim/converger.rs
//
// Direct-alignment relaxation: each active site's spin is overwritten with
// the normalized effective field at that site. Not a physical dynamics,
// just a fast descent heuristic toward a local energy minimum.
//
// Sites are visited in index order and each alignment sees the already
// aligned spins of earlier sites (Gauss-Seidel style), which speeds up
// the relaxation. The convergence metric is the max torque |S x B| taken
// before the overwrite. A degenerate (zero) field leaves the spin
// untouched and counts as a fallback event.

use crate::error::SimError;
use crate::hamiltonian::Hamiltonian;
use crate::rng::RandomSource;
use crate::sim::{SimulationMethod, StepReport, TemperatureField};
use crate::spin_field::SpinField;
use crate::vec3;

#[derive(Default)]
pub struct Converger {
    sites: Vec<usize>,
}

impl Converger {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SimulationMethod for Converger {
    fn step(
        &mut self,
        field: &mut SpinField,
        hamiltonian: &Hamiltonian,
        _rng: &mut RandomSource,
        _temperature: &TemperatureField,
        want_metric: bool,
    ) -> Result<StepReport, SimError> {
        self.sites.clear();
        self.sites.extend_from_slice(field.active_sites());
        self.sites.sort_unstable();

        let mut max_torque: f64 = 0.0;
        let mut fallback_events = 0;
        for &site in &self.sites {
            let b = hamiltonian.effective_field(field.spins(), site);
            if want_metric {
                let s = field.spin(site)?;
                max_torque = max_torque.max(vec3::norm(vec3::cross(s, b)));
            }
            match vec3::normalize(b) {
                Ok(aligned) => field.set_spin(site, aligned)?,
                Err(_) => fallback_events += 1,
            }
        }

        Ok(StepReport {
            metric: want_metric.then_some(max_torque),
            fallback_events,
        })
    }

    fn label(&self) -> &str {
        "converger"
    }
}
