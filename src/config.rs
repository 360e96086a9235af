// src/config.rs
//
// Plain configuration aggregate, read once at setup. Everything tunable
// lives here: lattice geometry, spin model, interaction coefficients,
// temperature and field loops, and run cadences. JSON on disk; omitted
// sections fall back to their defaults, the lattice section is mandatory.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::energy::{
    BiquadraticEnergy, DipolarEnergy, DmEnergy, DmKind, EnergyTerm, ExchangeEnergy,
    FourSpinEnergy, HexagonalAnisotropy, Modulation, ThreeSiteEnergy, TipEnergy,
    UniaxialAnisotropy, ZeemanEnergy,
};
use crate::error::SimError;
use crate::hamiltonian::Hamiltonian;
use crate::lattice::{self, Lattice, LatticeSpec};
use crate::sim::{
    Converger, LandauLifshitzGilbert, Metropolis, RunSchedule, SimulationMethod,
    TemperatureField,
};
use crate::spin_field::{SpinField, SpinModel};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Configuration {
    pub lattice: LatticeSpec,
    #[serde(default)]
    pub spins: SpinConfig,
    #[serde(default)]
    pub hamiltonian: HamiltonianConfig,
    #[serde(default)]
    pub temperature: TemperatureConfig,
    #[serde(default)]
    pub field_loop: Option<FieldLoop>,
    #[serde(default)]
    pub run: RunConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpinConfig {
    pub model: SpinModel,
    /// Cone width for local Metropolis trial moves; unset means global
    /// sphere draws.
    #[serde(default)]
    pub gaussian_spin_sampling_sigma: Option<f64>,
    /// Moment per site in Bohr magnetons.
    #[serde(default = "default_moment")]
    pub magnetic_moment: f64,
}

fn default_moment() -> f64 {
    1.0
}

impl Default for SpinConfig {
    fn default() -> Self {
        Self {
            model: SpinModel::Heisenberg,
            gaussian_spin_sampling_sigma: None,
            magnetic_moment: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnisotropyAxis {
    pub k: f64,
    pub axis: [f64; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TipConfig {
    pub position: [f64; 3],
    pub moment: [f64; 3],
    pub strength: f64,
}

/// Interaction coefficients, meV throughout. Zero / empty entries leave
/// the corresponding term out of the Hamiltonian.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HamiltonianConfig {
    /// Per-shell exchange J_1..J_8.
    #[serde(default)]
    pub exchange: Vec<f64>,
    #[serde(default)]
    pub exchange_modulation: Option<Modulation>,
    /// Per-shell DM strength d_1..d_5.
    #[serde(default)]
    pub dm: Vec<f64>,
    #[serde(default = "default_dm_kind")]
    pub dm_kind: DmKind,
    #[serde(default)]
    pub anisotropy: Vec<AnisotropyAxis>,
    #[serde(default)]
    pub anisotropy_modulation: Option<Modulation>,
    #[serde(default)]
    pub hexagonal_anisotropy: Option<[f64; 3]>,
    #[serde(default)]
    pub biquadratic: f64,
    #[serde(default)]
    pub four_spin: f64,
    #[serde(default)]
    pub three_site: f64,
    #[serde(default)]
    pub dipolar: f64,
    #[serde(default)]
    pub zeeman: [f64; 3],
    #[serde(default)]
    pub tip: Option<TipConfig>,
}

fn default_dm_kind() -> DmKind {
    DmKind::Chiral
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemperatureConfig {
    pub t_min: f64,
    pub t_max: f64,
    /// Set to ramp the temperature across the lattice instead of holding
    /// it uniform at `t_min`.
    #[serde(default)]
    pub gradient_direction: Option<[f64; 3]>,
    /// Outer-loop step count between `t_min` and `t_max`.
    #[serde(default)]
    pub loop_steps: usize,
}

impl Default for TemperatureConfig {
    fn default() -> Self {
        Self {
            t_min: 1.0,
            t_max: 1.0,
            gradient_direction: None,
            loop_steps: 0,
        }
    }
}

impl TemperatureConfig {
    /// Temperatures visited by the outer loop (a single value when no
    /// loop is configured).
    pub fn loop_values(&self) -> Vec<f64> {
        if self.loop_steps < 2 {
            return vec![self.t_min];
        }
        let n = self.loop_steps;
        (0..n)
            .map(|i| self.t_min + (self.t_max - self.t_min) * i as f64 / (n - 1) as f64)
            .collect()
    }

    pub fn build_field(&self, lattice: &Lattice, t: f64) -> TemperatureField {
        match self.gradient_direction {
            Some(dir) => TemperatureField::gradient(lattice, self.t_min, self.t_max, dir),
            None => TemperatureField::uniform(lattice.len(), t),
        }
    }
}

/// External-field sweep: Zeeman vector interpolated start to end.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldLoop {
    pub start: [f64; 3],
    pub end: [f64; 3],
    pub steps: usize,
}

impl FieldLoop {
    pub fn values(&self) -> Vec<[f64; 3]> {
        if self.steps < 2 {
            return vec![self.start];
        }
        (0..self.steps)
            .map(|i| {
                let t = i as f64 / (self.steps - 1) as f64;
                [
                    self.start[0] + (self.end[0] - self.start[0]) * t,
                    self.start[1] + (self.end[1] - self.start[1]) * t,
                    self.start[2] + (self.end[2] - self.start[2]) * t,
                ]
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    Metropolis,
    LandauLifshitzGilbert,
    Converger,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub method: MethodKind,
    #[serde(flatten)]
    pub schedule: RunSchedule,
    /// LLG time step, seconds.
    #[serde(default = "default_time_width")]
    pub time_width: f64,
    /// Gilbert damping.
    #[serde(default = "default_damping")]
    pub damping: f64,
    #[serde(default)]
    pub seed: u64,
}

fn default_time_width() -> f64 {
    1e-14
}

fn default_damping() -> f64 {
    0.1
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            method: MethodKind::Metropolis,
            schedule: RunSchedule::plain(1000),
            time_width: default_time_width(),
            damping: default_damping(),
            seed: 0,
        }
    }
}

impl Configuration {
    pub fn from_file(path: &Path) -> Result<Self, SimError> {
        let file = File::open(path).map_err(|_| SimError::MissingFile(path.to_path_buf()))?;
        let config: Configuration = serde_json::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    pub fn write_to_dir(&self, out_dir: &Path) -> Result<(), SimError> {
        let file = File::create(out_dir.join("config.json"))?;
        serde_json::to_writer_pretty(file, self)?;
        Ok(())
    }

    /// Pre-flight check; nothing is constructed from an invalid config.
    pub fn validate(&self) -> Result<(), SimError> {
        lattice::shapes::parameter_consistency(&self.lattice)?;
        if self.spins.magnetic_moment <= 0.0 {
            return Err(SimError::InvalidConfig(
                "magnetic_moment must be positive".to_string(),
            ));
        }
        if self.run.schedule.steps == 0 {
            return Err(SimError::InvalidConfig(
                "run.steps must be positive".to_string(),
            ));
        }
        if self.run.time_width <= 0.0 || self.run.damping < 0.0 {
            return Err(SimError::InvalidConfig(
                "time_width must be positive and damping non-negative".to_string(),
            ));
        }
        if self.temperature.gradient_direction.is_some() && self.temperature.loop_steps > 1 {
            return Err(SimError::InvalidConfig(
                "a temperature gradient fixes the per-site temperatures; combine it with \
                 loop_steps and the loop values would be ignored"
                    .to_string(),
            ));
        }
        if self.run.method == MethodKind::Metropolis
            && (self.temperature.t_min <= 0.0 || self.temperature.t_max <= 0.0)
        {
            return Err(SimError::InvalidConfig(
                "Metropolis requires strictly positive temperatures".to_string(),
            ));
        }
        Ok(())
    }

    pub fn build_lattice(&self) -> Result<Arc<Lattice>, SimError> {
        Ok(Arc::new(lattice::shapes::build(&self.lattice)?))
    }

    pub fn build_spin_field(&self, lattice: &Lattice) -> SpinField {
        let mut field = SpinField::new(self.spins.model, lattice.len());
        field.set_trial_sigma(self.spins.gaussian_spin_sampling_sigma);
        field
    }

    pub fn build_hamiltonian(&self, lattice: &Arc<Lattice>) -> Hamiltonian {
        let h = &self.hamiltonian;
        let mut terms: Vec<Box<dyn EnergyTerm>> = Vec::new();
        if h.exchange.iter().any(|&j| j != 0.0) {
            let mut ex = ExchangeEnergy::new(lattice.clone(), h.exchange.clone());
            ex.set_modulation(h.exchange_modulation);
            terms.push(Box::new(ex));
        }
        if h.dm.iter().any(|&d| d != 0.0) {
            terms.push(Box::new(DmEnergy::new(
                lattice.clone(),
                h.dm.clone(),
                h.dm_kind,
            )));
        }
        if !h.anisotropy.is_empty() {
            let axes = h.anisotropy.iter().map(|a| (a.k, a.axis)).collect();
            let mut ani = UniaxialAnisotropy::new(lattice.clone(), axes);
            ani.set_modulation(h.anisotropy_modulation);
            terms.push(Box::new(ani));
        }
        if let Some(coeffs) = h.hexagonal_anisotropy {
            terms.push(Box::new(HexagonalAnisotropy::new(lattice.clone(), coeffs)));
        }
        if h.biquadratic != 0.0 {
            terms.push(Box::new(BiquadraticEnergy::new(
                lattice.clone(),
                h.biquadratic,
            )));
        }
        if h.four_spin != 0.0 {
            terms.push(Box::new(FourSpinEnergy::new(lattice.clone(), h.four_spin)));
        }
        if h.three_site != 0.0 {
            terms.push(Box::new(ThreeSiteEnergy::new(
                lattice.clone(),
                h.three_site,
            )));
        }
        if h.dipolar != 0.0 {
            terms.push(Box::new(DipolarEnergy::new(lattice.clone(), h.dipolar)));
        }
        if h.zeeman != [0.0; 3] {
            terms.push(Box::new(ZeemanEnergy::new(h.zeeman)));
        }
        if let Some(tip) = &h.tip {
            terms.push(Box::new(TipEnergy::new(
                lattice.clone(),
                tip.position,
                tip.moment,
                tip.strength,
            )));
        }
        Hamiltonian::new(terms)
    }

    /// Hamiltonian for one point of the external-field sweep: the Zeeman
    /// vector is replaced, every other term is rebuilt unchanged. Terms
    /// are immutable once boxed, so sweeps rebuild instead of mutating.
    pub fn build_hamiltonian_at_field(
        &self,
        lattice: &Arc<Lattice>,
        zeeman: [f64; 3],
    ) -> Hamiltonian {
        let mut at_field = self.clone();
        at_field.hamiltonian.zeeman = zeeman;
        at_field.build_hamiltonian(lattice)
    }

    pub fn build_method(&self) -> Result<Box<dyn SimulationMethod>, SimError> {
        Ok(match self.run.method {
            MethodKind::Metropolis => Box::new(Metropolis::new()),
            MethodKind::LandauLifshitzGilbert => Box::new(LandauLifshitzGilbert::new(
                self.run.time_width,
                self.run.damping,
                self.spins.magnetic_moment,
            )?),
            MethodKind::Converger => Box::new(Converger::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lattice::{BoundaryKind, LatticeShape};

    fn minimal() -> Configuration {
        Configuration {
            lattice: LatticeSpec {
                shape: LatticeShape::SimpleCubic,
                dims: vec![2, 2, 1],
                boundary: BoundaryKind::Open,
                coordinate_file: None,
                image_file: None,
            },
            spins: SpinConfig::default(),
            hamiltonian: HamiltonianConfig {
                exchange: vec![-1.0],
                zeeman: [0.0, 0.0, 0.1],
                ..HamiltonianConfig::default()
            },
            temperature: TemperatureConfig::default(),
            field_loop: None,
            run: RunConfig::default(),
        }
    }

    #[test]
    fn json_round_trip() {
        let config = minimal();
        let text = serde_json::to_string(&config).unwrap();
        let back: Configuration = serde_json::from_str(&text).unwrap();
        back.validate().unwrap();
        assert_eq!(back.hamiltonian.exchange, vec![-1.0]);
        assert_eq!(back.run.method, MethodKind::Metropolis);
    }

    #[test]
    fn defaults_fill_omitted_sections() {
        let text = r#"{
            "lattice": {
                "shape": "simple_cubic",
                "dims": [3, 3, 3],
                "boundary": "periodic"
            }
        }"#;
        let config: Configuration = serde_json::from_str(text).unwrap();
        config.validate().unwrap();
        assert_eq!(config.spins.magnetic_moment, 1.0);
        assert_eq!(config.run.schedule.steps, 1000);
    }

    #[test]
    fn zero_temperature_metropolis_config_is_rejected() {
        let mut config = minimal();
        config.temperature.t_min = 0.0;
        assert!(matches!(
            config.validate(),
            Err(SimError::InvalidConfig(_))
        ));
    }

    #[test]
    fn gradient_combined_with_temperature_loop_is_rejected() {
        let mut config = minimal();
        config.temperature.gradient_direction = Some([1.0, 0.0, 0.0]);
        config.temperature.loop_steps = 5;
        assert!(matches!(
            config.validate(),
            Err(SimError::InvalidConfig(_))
        ));
        // either alone is fine
        config.temperature.loop_steps = 0;
        config.validate().unwrap();
        config.temperature.gradient_direction = None;
        config.temperature.loop_steps = 5;
        config.validate().unwrap();
    }

    #[test]
    fn hamiltonian_skips_zero_terms() {
        let config = minimal();
        let lat = config.build_lattice().unwrap();
        let ham = config.build_hamiltonian(&lat);
        assert_eq!(ham.labels(), vec!["exchange", "zeeman"]);
    }

    #[test]
    fn field_loop_points_rebuild_the_zeeman_term() {
        let mut config = minimal();
        config.field_loop = Some(FieldLoop {
            start: [0.0, 0.0, 0.0],
            end: [0.0, 0.0, 2.0],
            steps: 3,
        });
        let lat = config.build_lattice().unwrap();
        let spins = vec![[0.0, 0.0, 1.0]; lat.len()];
        let values = config.field_loop.as_ref().unwrap().values();
        // E_zeeman per site = -H_z; isolate it against the zero-field point
        let e0 = config
            .build_hamiltonian_at_field(&lat, values[0])
            .total_energy(&spins);
        for (h, expected) in [(values[1], -1.0), (values[2], -2.0)] {
            let e = config.build_hamiltonian_at_field(&lat, h).total_energy(&spins);
            let per_site = (e - e0) / lat.len() as f64;
            assert!((per_site - expected).abs() < 1e-12, "H = {h:?}: {per_site}");
        }
    }

    #[test]
    fn loops_interpolate_endpoints() {
        let t = TemperatureConfig {
            t_min: 10.0,
            t_max: 50.0,
            gradient_direction: None,
            loop_steps: 5,
        };
        let values = t.loop_values();
        assert_eq!(values.len(), 5);
        assert!((values[0] - 10.0).abs() < 1e-12);
        assert!((values[4] - 50.0).abs() < 1e-12);

        let f = FieldLoop {
            start: [0.0, 0.0, 0.0],
            end: [0.0, 0.0, 2.0],
            steps: 3,
        };
        assert_eq!(f.values()[1], [0.0, 0.0, 1.0]);
    }
}
