// src/sim/metropolis.rs
//
// Metropolis Monte Carlo sweep.
//
// One step visits every active site once in a freshly shuffled order so
// each trial sees the outcome of the earlier trials of the same sweep.
// The reported metric is the acceptance fraction of the sweep.
//
// delta_e = E_before - E_after, so positive delta_e means the trial
// lowered the energy. Energy-raising trials survive with the Boltzmann
// probability exp(delta_e / (kB T_site)); a uniform draw above that
// factor restores the previous orientation.

use crate::error::SimError;
use crate::hamiltonian::Hamiltonian;
use crate::rng::RandomSource;
use crate::sim::{SimulationMethod, StepReport, TemperatureField, K_BOLTZMANN};
use crate::spin_field::SpinField;

#[derive(Default)]
pub struct Metropolis {
    /// Sweep order, reused across steps.
    order: Vec<usize>,
}

impl Metropolis {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SimulationMethod for Metropolis {
    fn step(
        &mut self,
        field: &mut SpinField,
        hamiltonian: &Hamiltonian,
        rng: &mut RandomSource,
        temperature: &TemperatureField,
        _want_metric: bool,
    ) -> Result<StepReport, SimError> {
        crate::sim::check_temperature_extent(field, temperature)?;
        self.order.clear();
        self.order.extend_from_slice(field.active_sites());
        rng.shuffle(&mut self.order);

        let trials = self.order.len();
        let mut rejected = 0usize;
        for &site in &self.order {
            let t = temperature.at(site);
            if t <= 0.0 {
                return Err(SimError::NonPositiveTemperature {
                    site,
                    temperature: t,
                });
            }
            let e_before = hamiltonian.single_energy(field.spins(), site);
            field.single_orientation(site, rng)?;
            let delta_e = e_before - hamiltonian.single_energy(field.spins(), site);
            if delta_e < 0.0 {
                let factor = (delta_e / (K_BOLTZMANN * t)).exp();
                if rng.uniform() > factor {
                    field.restore_single_orientation()?;
                    rejected += 1;
                }
            }
        }

        let accepted = if trials == 0 {
            1.0
        } else {
            (trials - rejected) as f64 / trials as f64
        };
        Ok(StepReport {
            metric: Some(accepted),
            fallback_events: 0,
        })
    }

    fn label(&self) -> &str {
        "metropolis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::ZeemanEnergy;
    use crate::lattice::{BoundaryKind, LatticeShape, LatticeSpec};
    use crate::spin_field::SpinModel;
    use std::sync::Arc;

    fn setup(sites: usize) -> (Arc<crate::lattice::Lattice>, SpinField, Hamiltonian) {
        let lat = Arc::new(
            crate::lattice::shapes::build(&LatticeSpec {
                shape: LatticeShape::SimpleCubic,
                dims: vec![sites, 1, 1],
                boundary: BoundaryKind::Open,
                coordinate_file: None,
                image_file: None,
            })
            .unwrap(),
        );
        let field = SpinField::new(SpinModel::Heisenberg, lat.len());
        let ham = Hamiltonian::new(vec![Box::new(ZeemanEnergy::new([0.0, 0.0, 1.0]))]);
        (lat, field, ham)
    }

    #[test]
    fn acceptance_fraction_stays_in_unit_interval() {
        let (_lat, mut field, ham) = setup(16);
        let mut rng = RandomSource::from_seed(9);
        let temp = TemperatureField::uniform(field.len(), 5.0);
        let mut m = Metropolis::new();
        for _ in 0..20 {
            let report = m.step(&mut field, &ham, &mut rng, &temp, true).unwrap();
            let a = report.metric.unwrap();
            assert!((0.0..=1.0).contains(&a), "acceptance out of range: {a}");
        }
    }

    #[test]
    fn zero_temperature_fails_fast() {
        let (_lat, mut field, ham) = setup(4);
        let mut rng = RandomSource::from_seed(1);
        let temp = TemperatureField::uniform(field.len(), 0.0);
        let mut m = Metropolis::new();
        assert!(matches!(
            m.step(&mut field, &ham, &mut rng, &temp, true),
            Err(SimError::NonPositiveTemperature { .. })
        ));
    }

    #[test]
    fn short_temperature_field_is_a_typed_error() {
        let (_lat, mut field, ham) = setup(4);
        let mut rng = RandomSource::from_seed(1);
        let temp = TemperatureField::uniform(2, 5.0);
        let mut m = Metropolis::new();
        assert!(matches!(
            m.step(&mut field, &ham, &mut rng, &temp, false),
            Err(SimError::TemperatureFieldLength { sites: 4, got: 2 })
        ));
    }

    #[test]
    fn cold_sweep_rejects_most_uphill_moves() {
        // strong field, tiny temperature: spins aligned with the field
        // should mostly stay aligned
        let (_lat, mut field, ham) = setup(32);
        field.set_ferromagnet([0.0, 0.0, 1.0]).unwrap();
        let mut rng = RandomSource::from_seed(77);
        let temp = TemperatureField::uniform(field.len(), 0.001);
        let mut m = Metropolis::new();
        for _ in 0..10 {
            m.step(&mut field, &ham, &mut rng, &temp, false).unwrap();
        }
        let mz = field.magnetisation()[2];
        assert!(mz > 28.0, "cold ferromagnet melted: mz = {mz}");
    }

    #[test]
    fn inactive_sites_are_never_touched() {
        let (_lat, mut field, ham) = setup(8);
        field.set_ferromagnet([0.0, 0.0, 1.0]).unwrap();
        for i in 0..4 {
            field.set_inactive_site(i).unwrap();
        }
        let mut rng = RandomSource::from_seed(2);
        let temp = TemperatureField::uniform(field.len(), 500.0);
        let mut m = Metropolis::new();
        for _ in 0..5 {
            m.step(&mut field, &ham, &mut rng, &temp, false).unwrap();
        }
        for i in 0..4 {
            assert_eq!(field.spin(i).unwrap(), [0.0, 0.0, 1.0], "site {i} moved");
        }
    }
}
