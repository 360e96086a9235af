// src/sim/llg.rs
//
// Stochastic Landau-Lifshitz-Gilbert integration, semi-implicit
// predictor/corrector scheme.
//
// Per active site i, with committed spin s and reduced gyromagnetic ratio
// gamma' = gamma / (1 + alpha^2):
//
//   a   = dt * B(s) + sqrt(dt) * sigma_i * xi          (xi ~ N(0,1)^3)
//   u_p = -(gamma'/4) * (a + alpha * s x a)            predictor
//   s*  = R(u_p) s                                     trial spin
//   a'  = dt * B(s*) + sqrt(dt) * sigma_i * xi         (same xi)
//   u_c = -(gamma'/2) * (a' + alpha * s* x a')         corrector
//   s'  = R(u_c) s                                     committed from the
//                                                      ORIGINAL spin
//
// R(u) is the norm-preserving Cayley rotation
//   R(u) v = [ (1 - |u|^2) v + 2 v x u + 2 (u.v) u ] / (1 + |u|^2).
//
// The 1/4-vs-1/2 prefactor asymmetry between the stages is part of the
// discretization being replicated; do not symmetrize it.
//
// Thermal field: sigma_i = sqrt(2 alpha kB T_i / (gamma mu)), one normal
// 3-vector per active site per step, shared by both stages.
//
// Corrector fields are evaluated against the trial buffer passed
// explicitly to the Hamiltonian; nothing is retargeted. Inactive sites are
// copied through unchanged. All scratch buffers live on the struct and are
// reused across steps.

use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::prelude::*;

use crate::error::SimError;
use crate::hamiltonian::Hamiltonian;
use crate::rng::RandomSource;
use crate::sim::{
    torque_metric, SimulationMethod, StepReport, TemperatureField, GAMMA_ELECTRON, K_BOLTZMANN,
    MU_BOHR,
};
use crate::spin_field::SpinField;
use crate::vec3;

pub struct LandauLifshitzGilbert {
    /// Integration time step in seconds.
    time_width: f64,
    /// Gilbert damping parameter alpha.
    damping: f64,
    /// Magnetic moment per site in Bohr magnetons.
    magnetic_moment: f64,
    active_mask: Vec<bool>,
    noise: Vec<[f64; 3]>,
    trial: Vec<[f64; 3]>,
    committed: Vec<[f64; 3]>,
}

impl LandauLifshitzGilbert {
    pub fn new(time_width: f64, damping: f64, magnetic_moment: f64) -> Result<Self, SimError> {
        if time_width <= 0.0 || damping < 0.0 || magnetic_moment <= 0.0 {
            return Err(SimError::InvalidConfig(format!(
                "bad LLG parameters: dt = {time_width}, alpha = {damping}, mu = {magnetic_moment}"
            )));
        }
        Ok(Self {
            time_width,
            damping,
            magnetic_moment,
            active_mask: Vec::new(),
            noise: Vec::new(),
            trial: Vec::new(),
            committed: Vec::new(),
        })
    }

    /// Cayley rotation, norm preserving for any u.
    #[inline]
    fn rotate(s: [f64; 3], u: [f64; 3]) -> [f64; 3] {
        let u2 = vec3::dot(u, u);
        let v = vec3::add(
            vec3::add(vec3::scale(s, 1.0 - u2), vec3::scale(vec3::cross(s, u), 2.0)),
            vec3::scale(u, 2.0 * vec3::dot(u, s)),
        );
        vec3::scale(v, 1.0 / (1.0 + u2))
    }

    #[inline]
    fn stage_rotation(&self, prefactor: f64, s: [f64; 3], a: [f64; 3]) -> [f64; 3] {
        let u = vec3::scale(
            vec3::add(a, vec3::scale(vec3::cross(s, a), self.damping)),
            prefactor,
        );
        Self::rotate(s, u)
    }
}

impl SimulationMethod for LandauLifshitzGilbert {
    fn step(
        &mut self,
        field: &mut SpinField,
        hamiltonian: &Hamiltonian,
        rng: &mut RandomSource,
        temperature: &TemperatureField,
        want_metric: bool,
    ) -> Result<StepReport, SimError> {
        crate::sim::check_temperature_extent(field, temperature)?;
        let n = field.len();
        self.active_mask.clear();
        self.active_mask.resize(n, false);
        for &i in field.active_sites() {
            self.active_mask[i] = true;
        }
        self.noise.resize(n, [0.0; 3]);
        self.trial.resize(n, [0.0; 3]);
        self.committed.resize(n, [0.0; 3]);

        let dt = self.time_width;
        let sqrt_dt = dt.sqrt();
        let field_scale = 1.0 / (self.magnetic_moment * MU_BOHR);
        let gamma_reduced = GAMMA_ELECTRON / (1.0 + self.damping * self.damping);

        // Thermal draws happen sequentially so trajectories stay
        // reproducible for a fixed seed regardless of thread count.
        for i in 0..n {
            self.noise[i] = if self.active_mask[i] && temperature.at(i) > 0.0 {
                let sigma = (2.0 * self.damping * K_BOLTZMANN * temperature.at(i)
                    / (GAMMA_ELECTRON * self.magnetic_moment * MU_BOHR))
                    .sqrt();
                vec3::scale(rng.normal3(), sqrt_dt * sigma)
            } else {
                [0.0; 3]
            };
        }

        let spins = field.spins().to_vec();

        // Predictor: every active site sees the committed array.
        let mask = &self.active_mask;
        let noise = &self.noise;
        let pred_prefactor = -gamma_reduced / 4.0;
        let trial: Vec<[f64; 3]> = (0..n)
            .into_par_iter()
            .map(|i| {
                if !mask[i] {
                    return spins[i];
                }
                let b = vec3::scale(hamiltonian.effective_field(&spins, i), field_scale);
                let a = vec3::add(vec3::scale(b, dt), noise[i]);
                self.stage_rotation(pred_prefactor, spins[i], a)
            })
            .collect();
        self.trial = trial;

        // Corrector: fields from the trial buffer, rotation applied to the
        // original spin, with the trial spin steering the damping term.
        let corr_prefactor = -gamma_reduced / 2.0;
        let fallbacks = AtomicUsize::new(0);
        let trial_ref = &self.trial;
        let committed: Vec<[f64; 3]> = (0..n)
            .into_par_iter()
            .map(|i| {
                if !mask[i] {
                    return spins[i];
                }
                let b = vec3::scale(hamiltonian.effective_field(trial_ref, i), field_scale);
                let a = vec3::add(vec3::scale(b, dt), noise[i]);
                let s_star = trial_ref[i];
                let u = vec3::scale(
                    vec3::add(a, vec3::scale(vec3::cross(s_star, a), self.damping)),
                    corr_prefactor,
                );
                let rotated = Self::rotate(spins[i], u);
                // rotation preserves the norm up to roundoff; renormalize,
                // falling back to the previous orientation if degenerate
                if vec3::dot(rotated, rotated) == 0.0 {
                    fallbacks.fetch_add(1, Ordering::Relaxed);
                    spins[i]
                } else {
                    vec3::normalize_or(rotated, spins[i])
                }
            })
            .collect();
        self.committed = committed;

        field.overwrite_spins(&self.committed)?;

        let metric = want_metric.then(|| torque_metric(field, hamiltonian));
        Ok(StepReport {
            metric,
            fallback_events: fallbacks.load(Ordering::Relaxed),
        })
    }

    fn label(&self) -> &str {
        "llg"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::energy::ZeemanEnergy;
    use crate::lattice::{BoundaryKind, LatticeShape, LatticeSpec};
    use crate::spin_field::SpinModel;

    fn single_site() -> (SpinField, Hamiltonian, TemperatureField) {
        let _lat = crate::lattice::shapes::build(&LatticeSpec {
            shape: LatticeShape::SimpleCubic,
            dims: vec![1, 1, 1],
            boundary: BoundaryKind::Open,
            coordinate_file: None,
            image_file: None,
        })
        .unwrap();
        let mut field = SpinField::new(SpinModel::Heisenberg, 1);
        field.set_spin(0, [1.0, 0.0, 0.0]).unwrap();
        let ham = Hamiltonian::new(vec![Box::new(ZeemanEnergy::new([0.0, 0.0, 1.0]))]);
        let temp = TemperatureField::uniform(1, 0.0);
        (field, ham, temp)
    }

    #[test]
    fn rotation_preserves_norm() {
        let s = [0.6, 0.0, 0.8];
        let r = LandauLifshitzGilbert::rotate(s, [0.3, -0.2, 0.1]);
        assert!((vec3::norm(r) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn damped_spin_relaxes_onto_the_field() {
        let (mut field, ham, temp) = single_site();
        let mut rng = RandomSource::from_seed(1);
        let mut llg = LandauLifshitzGilbert::new(1e-14, 0.5, 1.0).unwrap();
        for _ in 0..5000 {
            llg.step(&mut field, &ham, &mut rng, &temp, false).unwrap();
        }
        let s = field.spin(0).unwrap();
        assert!(s[2] > 0.99, "spin did not align with the field: {s:?}");
        assert!((vec3::norm(s) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn zero_temperature_energy_is_monotone() {
        let (mut field, ham, temp) = single_site();
        let mut rng = RandomSource::from_seed(1);
        let mut llg = LandauLifshitzGilbert::new(1e-14, 0.3, 1.0).unwrap();
        let mut last = ham.total_energy(field.spins());
        for _ in 0..200 {
            llg.step(&mut field, &ham, &mut rng, &temp, false).unwrap();
            let e = ham.total_energy(field.spins());
            assert!(e <= last + 1e-12, "energy rose: {last} -> {e}");
            last = e;
        }
    }

    #[test]
    fn short_temperature_field_is_a_typed_error() {
        let (mut field, ham, _temp) = single_site();
        let mut rng = RandomSource::from_seed(1);
        let temp = TemperatureField::uniform(0, 10.0);
        let mut llg = LandauLifshitzGilbert::new(1e-14, 0.2, 1.0).unwrap();
        assert!(matches!(
            llg.step(&mut field, &ham, &mut rng, &temp, false),
            Err(SimError::TemperatureFieldLength { sites: 1, got: 0 })
        ));
    }

    #[test]
    fn inactive_sites_are_frozen() {
        let mut field = SpinField::new(SpinModel::Heisenberg, 2);
        field.set_spin(0, [1.0, 0.0, 0.0]).unwrap();
        field.set_spin(1, [1.0, 0.0, 0.0]).unwrap();
        field.set_inactive_site(1).unwrap();
        let ham = Hamiltonian::new(vec![Box::new(ZeemanEnergy::new([0.0, 0.0, 1.0]))]);
        let temp = TemperatureField::uniform(2, 10.0);
        let mut rng = RandomSource::from_seed(4);
        let mut llg = LandauLifshitzGilbert::new(1e-14, 0.2, 1.0).unwrap();
        for _ in 0..50 {
            llg.step(&mut field, &ham, &mut rng, &temp, false).unwrap();
        }
        assert_eq!(field.spin(1).unwrap(), [1.0, 0.0, 0.0]);
        assert!(field.spin(0).unwrap() != [1.0, 0.0, 0.0]);
    }
}
