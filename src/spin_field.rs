// src/spin_field.rs
//
// Per-site spin orientation state: the spin vector array, the
// active/inactive site partition, and the single-site trial/restore
// primitives the Monte Carlo sweep builds on.
//
// Inactive sites keep their orientation and still enter every energy and
// field sum as fixed sources; they are simply never selected for updates.
// Used for boundary pinning and defect studies.

use crate::error::SimError;
use crate::rng::RandomSource;
use crate::vec3::{self, PRECISION};

/// Spin model variants. Heisenberg spins are free unit vectors on the
/// sphere; Ising spins are restricted to the +-x axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpinModel {
    Heisenberg,
    Ising,
}

/// One Fourier component of a multi-q spin texture:
/// contribution(r) = cos(k.r) * cos_amplitude + sin(k.r) * sin_amplitude.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct SpiralComponent {
    pub k: [f64; 3],
    pub cos_amplitude: [f64; 3],
    pub sin_amplitude: [f64; 3],
}

#[derive(Debug, Clone)]
pub struct SpinField {
    model: SpinModel,
    spins: Vec<[f64; 3]>,
    /// Cone width for local trial moves; `None` draws a fully random
    /// direction on the sphere for every trial.
    trial_sigma: Option<f64>,
    active: Vec<usize>,
    inactive: Vec<usize>,
    /// Per-site (is_active, position within its list). Keeps partition
    /// moves O(1).
    slot: Vec<(bool, usize)>,
    /// One-slot undo cache for the pending trial move.
    pending: Option<(usize, [f64; 3])>,
}

impl SpinField {
    /// All sites start active, aligned along +z (Heisenberg) or +x (Ising).
    pub fn new(model: SpinModel, sites: usize) -> Self {
        let rest = match model {
            SpinModel::Heisenberg => [0.0, 0.0, 1.0],
            SpinModel::Ising => [1.0, 0.0, 0.0],
        };
        Self {
            model,
            spins: vec![rest; sites],
            trial_sigma: None,
            active: (0..sites).collect(),
            inactive: Vec::new(),
            slot: (0..sites).map(|i| (true, i)).collect(),
            pending: None,
        }
    }

    pub fn model(&self) -> SpinModel {
        self.model
    }

    pub fn len(&self) -> usize {
        self.spins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spins.is_empty()
    }

    pub fn spins(&self) -> &[[f64; 3]] {
        &self.spins
    }

    pub fn spin(&self, site: usize) -> Result<[f64; 3], SimError> {
        self.check_site(site)?;
        Ok(self.spins[site])
    }

    /// Overwrite one site's orientation (normalized, projected for Ising).
    /// Clears any pending trial.
    pub fn set_spin(&mut self, site: usize, spin: [f64; 3]) -> Result<(), SimError> {
        self.check_site(site)?;
        self.spins[site] = self.constrain(vec3::normalize(spin)?);
        self.pending = None;
        Ok(())
    }

    /// Replace the whole array (e.g. after an LLG commit). Lengths must
    /// match; vectors are taken as-is (the integrator renormalizes).
    pub fn overwrite_spins(&mut self, spins: &[[f64; 3]]) -> Result<(), SimError> {
        if spins.len() != self.spins.len() {
            return Err(SimError::InvalidConfig(format!(
                "spin array length {} does not match lattice size {}",
                spins.len(),
                self.spins.len()
            )));
        }
        self.spins.copy_from_slice(spins);
        self.pending = None;
        Ok(())
    }

    /// Width of the Gaussian cone for local trial moves, or `None` for
    /// global sphere draws (the default).
    pub fn set_trial_sigma(&mut self, sigma: Option<f64>) {
        self.trial_sigma = sigma.filter(|s| *s > 0.0);
    }

    fn check_site(&self, site: usize) -> Result<(), SimError> {
        if site >= self.spins.len() {
            return Err(SimError::SiteOutOfRange {
                site,
                len: self.spins.len(),
            });
        }
        Ok(())
    }

    fn constrain(&self, spin: [f64; 3]) -> [f64; 3] {
        match self.model {
            SpinModel::Heisenberg => spin,
            SpinModel::Ising => {
                if spin[0] >= 0.0 {
                    [1.0, 0.0, 0.0]
                } else {
                    [-1.0, 0.0, 0.0]
                }
            }
        }
    }

    // -----------------------------------------------------------
    // Initializers
    // -----------------------------------------------------------

    /// Reinitialize every site with a random orientation and mark all
    /// sites active.
    pub fn random_orientation(&mut self, rng: &mut RandomSource) {
        for i in 0..self.spins.len() {
            self.spins[i] = match self.model {
                SpinModel::Heisenberg => rng.unit_sphere(),
                SpinModel::Ising => {
                    if rng.uniform() < 0.5 {
                        [1.0, 0.0, 0.0]
                    } else {
                        [-1.0, 0.0, 0.0]
                    }
                }
            };
        }
        self.all_active();
        self.pending = None;
    }

    /// Uniform alignment along `direction`.
    pub fn set_ferromagnet(&mut self, direction: [f64; 3]) -> Result<(), SimError> {
        let d = self.constrain(vec3::normalize(direction)?);
        for s in &mut self.spins {
            *s = d;
        }
        self.pending = None;
        Ok(())
    }

    /// Multi-q texture from explicit Fourier components; the per-site sum
    /// is normalized (zero sums are a typed error, not a silent default).
    pub fn set_spin_spiral(
        &mut self,
        coords: &[[f64; 3]],
        components: &[SpiralComponent],
    ) -> Result<(), SimError> {
        if coords.len() != self.spins.len() {
            return Err(SimError::InvalidConfig(
                "coordinate array does not match spin field size".to_string(),
            ));
        }
        for (i, r) in coords.iter().enumerate() {
            let mut sum = [0.0; 3];
            for c in components {
                let phase = vec3::dot(c.k, *r);
                sum = vec3::add(sum, vec3::scale(c.cos_amplitude, phase.cos()));
                sum = vec3::add(sum, vec3::scale(c.sin_amplitude, phase.sin()));
            }
            self.spins[i] = self.constrain(vec3::normalize(sum)?);
        }
        self.pending = None;
        Ok(())
    }

    /// Single-q spiral from wave vector, origin, and helicity angle.
    /// helicity 0 gives a Neel (cycloidal) spiral rotating in the plane
    /// spanned by z and k; helicity pi/2 gives a Bloch (helical) spiral
    /// rotating in the plane perpendicular to k.
    pub fn set_spin_spiral_k(
        &mut self,
        coords: &[[f64; 3]],
        k: [f64; 3],
        origin: [f64; 3],
        helicity: f64,
    ) -> Result<(), SimError> {
        if coords.len() != self.spins.len() {
            return Err(SimError::InvalidConfig(
                "coordinate array does not match spin field size".to_string(),
            ));
        }
        let k_hat = vec3::normalize(k)?;
        let z = [0.0, 0.0, 1.0];
        let in_plane = vec3::add(
            vec3::scale(k_hat, helicity.cos()),
            vec3::scale(vec3::cross(z, k_hat), helicity.sin()),
        );
        let in_plane = vec3::normalize(in_plane)?;
        for (i, r) in coords.iter().enumerate() {
            let phase = vec3::dot(k, vec3::sub(*r, origin));
            let s = vec3::add(
                vec3::scale(z, phase.cos()),
                vec3::scale(in_plane, phase.sin()),
            );
            self.spins[i] = self.constrain(vec3::normalize(s)?);
        }
        self.pending = None;
        Ok(())
    }

    /// Vector sum over all sites (active and inactive alike).
    pub fn magnetisation(&self) -> [f64; 3] {
        let mut m = [0.0; 3];
        for s in &self.spins {
            m = vec3::add(m, *s);
        }
        m
    }

    // -----------------------------------------------------------
    // Trial moves
    // -----------------------------------------------------------

    /// Propose and apply a random trial orientation at `site`, caching the
    /// previous value for a possible restore. A second call overwrites the
    /// cache (the earlier trial counts as accepted).
    pub fn single_orientation(
        &mut self,
        site: usize,
        rng: &mut RandomSource,
    ) -> Result<(), SimError> {
        self.check_site(site)?;
        let old = self.spins[site];
        let trial = match self.model {
            SpinModel::Ising => vec3::scale(old, -1.0),
            SpinModel::Heisenberg => match self.trial_sigma {
                None => rng.unit_sphere(),
                // local move: Gaussian kick in the tangent space, then
                // renormalize
                Some(sigma) => {
                    let kick = vec3::scale(rng.normal3(), sigma);
                    vec3::normalize_or(vec3::add(old, kick), old)
                }
            },
        };
        self.spins[site] = trial;
        self.pending = Some((site, old));
        Ok(())
    }

    /// Revert the last trial move. Valid exactly once per trial.
    pub fn restore_single_orientation(&mut self) -> Result<(), SimError> {
        let (site, old) = self.pending.take().ok_or(SimError::NoPendingTrial)?;
        self.spins[site] = old;
        Ok(())
    }

    // -----------------------------------------------------------
    // Active/inactive partition
    // -----------------------------------------------------------

    pub fn active_sites(&self) -> &[usize] {
        &self.active
    }

    pub fn inactive_sites(&self) -> &[usize] {
        &self.inactive
    }

    pub fn is_active(&self, site: usize) -> Result<bool, SimError> {
        self.check_site(site)?;
        Ok(self.slot[site].0)
    }

    pub fn set_active_site(&mut self, site: usize) -> Result<(), SimError> {
        self.check_site(site)?;
        if !self.slot[site].0 {
            self.remove_from(site, false);
            self.slot[site] = (true, self.active.len());
            self.active.push(site);
        }
        Ok(())
    }

    pub fn set_inactive_site(&mut self, site: usize) -> Result<(), SimError> {
        self.check_site(site)?;
        if self.slot[site].0 {
            self.remove_from(site, true);
            self.slot[site] = (false, self.inactive.len());
            self.inactive.push(site);
        }
        Ok(())
    }

    /// Mark every site active (also the documented fallback when a spin
    /// file carries activity values other than 0/1).
    pub fn all_active(&mut self) {
        self.active.clear();
        self.active.extend(0..self.spins.len());
        self.inactive.clear();
        for (i, s) in self.slot.iter_mut().enumerate() {
            *s = (true, i);
        }
    }

    fn remove_from(&mut self, site: usize, from_active: bool) {
        let pos = self.slot[site].1;
        let list = if from_active {
            &mut self.active
        } else {
            &mut self.inactive
        };
        list.swap_remove(pos);
        if pos < list.len() {
            let moved = list[pos];
            self.slot[moved].1 = pos;
        }
    }
}

/// True when every component pair agrees within PRECISION.
pub fn spins_close(a: [f64; 3], b: [f64; 3]) -> bool {
    vec3::dist2(a, b) < PRECISION * PRECISION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partition_stays_disjoint_and_exhaustive() {
        let mut field = SpinField::new(SpinModel::Heisenberg, 10);
        field.set_inactive_site(3).unwrap();
        field.set_inactive_site(7).unwrap();
        field.set_active_site(3).unwrap();
        field.set_inactive_site(0).unwrap();

        let mut seen = vec![0u32; 10];
        for &i in field.active_sites() {
            seen[i] += 1;
        }
        for &i in field.inactive_sites() {
            seen[i] += 1;
        }
        assert!(seen.iter().all(|&c| c == 1), "partition broke: {seen:?}");
        assert_eq!(field.inactive_sites().len(), 2);
        assert!(!field.is_active(0).unwrap());
        assert!(field.is_active(3).unwrap());
    }

    #[test]
    fn restore_reverts_exactly_one_trial() {
        let mut field = SpinField::new(SpinModel::Heisenberg, 4);
        let mut rng = RandomSource::from_seed(11);
        let before = field.spin(2).unwrap();
        field.single_orientation(2, &mut rng).unwrap();
        field.restore_single_orientation().unwrap();
        assert_eq!(field.spin(2).unwrap(), before);
        assert!(matches!(
            field.restore_single_orientation(),
            Err(SimError::NoPendingTrial)
        ));
    }

    #[test]
    fn ising_trials_flip_along_x() {
        let mut field = SpinField::new(SpinModel::Ising, 3);
        let mut rng = RandomSource::from_seed(1);
        field.single_orientation(1, &mut rng).unwrap();
        assert_eq!(field.spin(1).unwrap(), [-1.0, 0.0, 0.0]);
        field.single_orientation(1, &mut rng).unwrap();
        assert_eq!(field.spin(1).unwrap(), [1.0, 0.0, 0.0]);
    }

    #[test]
    fn cone_restricted_trials_stay_local() {
        let mut field = SpinField::new(SpinModel::Heisenberg, 1);
        field.set_trial_sigma(Some(0.05));
        let mut rng = RandomSource::from_seed(2);
        for _ in 0..200 {
            let before = field.spin(0).unwrap();
            field.single_orientation(0, &mut rng).unwrap();
            let after = field.spin(0).unwrap();
            assert!(
                vec3::dot(before, after) > 0.8,
                "cone move jumped: {before:?} -> {after:?}"
            );
        }
    }

    #[test]
    fn ferromagnet_magnetisation_is_extensive() {
        let mut field = SpinField::new(SpinModel::Heisenberg, 5);
        field.set_ferromagnet([0.0, 0.0, 2.0]).unwrap();
        let m = field.magnetisation();
        assert!(spins_close(m, [0.0, 0.0, 5.0]));
    }

    #[test]
    fn fourier_components_superpose_and_normalize() {
        let mut field = SpinField::new(SpinModel::Heisenberg, 2);
        let coords = [[0.0; 3], [1.0, 0.0, 0.0]];
        // uniform x component plus a k = pi wave along z: site 0 sees
        // x + z, site 1 sees x - z, both normalized
        let components = [
            SpiralComponent {
                k: [0.0; 3],
                cos_amplitude: [1.0, 0.0, 0.0],
                sin_amplitude: [0.0; 3],
            },
            SpiralComponent {
                k: [std::f64::consts::PI, 0.0, 0.0],
                cos_amplitude: [0.0, 0.0, 1.0],
                sin_amplitude: [0.0; 3],
            },
        ];
        field.set_spin_spiral(&coords, &components).unwrap();
        let r = std::f64::consts::FRAC_1_SQRT_2;
        assert!(spins_close(field.spin(0).unwrap(), [r, 0.0, r]));
        assert!(spins_close(field.spin(1).unwrap(), [r, 0.0, -r]));
    }

    #[test]
    fn bloch_spiral_rotates_perpendicular_to_k() {
        let mut field = SpinField::new(SpinModel::Heisenberg, 4);
        let coords: Vec<[f64; 3]> = (0..4).map(|i| [i as f64, 0.0, 0.0]).collect();
        let k = [std::f64::consts::FRAC_PI_2, 0.0, 0.0];
        field
            .set_spin_spiral_k(&coords, k, [0.0; 3], std::f64::consts::FRAC_PI_2)
            .unwrap();
        // phase advances by pi/2 per site: z, y, -z, -y
        assert!(spins_close(field.spin(0).unwrap(), [0.0, 0.0, 1.0]));
        assert!(spins_close(field.spin(1).unwrap(), [0.0, 1.0, 0.0]));
        assert!(spins_close(field.spin(2).unwrap(), [0.0, 0.0, -1.0]));
        assert!(spins_close(field.spin(3).unwrap(), [0.0, -1.0, 0.0]));
    }
}
