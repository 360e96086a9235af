// src/sim/mod.rs
//
// Simulation methods and the driving loop.
//
// A method implements one `step` over the active sites; `run_simulation`
// repeats steps, reports progress at the UI cadence, samples measurements
// at the measure cadence, emits movie snapshots inside the configured
// window, and honors cooperative cancellation at UI boundaries only.
//
// The spin field sits behind one coarse mutex, locked for the duration of
// each step and released between steps so a driver/UI thread can read a
// consistent snapshot while the run is in flight.

pub mod converger;
pub mod llg;
pub mod metropolis;

pub use converger::Converger;
pub use llg::LandauLifshitzGilbert;
pub use metropolis::Metropolis;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::error::SimError;
use crate::hamiltonian::Hamiltonian;
use crate::lattice::Lattice;
use crate::observables::Measurement;
use crate::rng::RandomSource;
use crate::spin_field::SpinField;
use crate::vec3;

/// Boltzmann constant in meV/K.
pub const K_BOLTZMANN: f64 = 8.617_333_262e-2;

/// Electron gyromagnetic ratio, 1/(T s).
pub const GAMMA_ELECTRON: f64 = 1.760_859_630_23e11;

/// Bohr magneton in meV/T; converts meV-per-moment fields to Tesla.
pub const MU_BOHR: f64 = 5.788_381_806e-2;

/// Per-site temperature in Kelvin.
#[derive(Debug, Clone)]
pub struct TemperatureField {
    values: Vec<f64>,
}

impl TemperatureField {
    pub fn uniform(sites: usize, temperature: f64) -> Self {
        Self {
            values: vec![temperature; sites],
        }
    }

    /// Linear ramp from `t_min` to `t_max` along `direction`, rescaled over
    /// the lattice's projected extent. A degenerate extent (all sites
    /// projecting to the same value) falls back to the uniform midpoint.
    pub fn gradient(lattice: &Lattice, t_min: f64, t_max: f64, direction: [f64; 3]) -> Self {
        let (lo, hi) = lattice.projection_range(direction);
        let span = hi - lo;
        if span.abs() < crate::vec3::PRECISION {
            return Self::uniform(lattice.len(), 0.5 * (t_min + t_max));
        }
        let values = lattice
            .coords()
            .iter()
            .map(|p| {
                let t = (vec3::dot(*p, direction) - lo) / span;
                t_min + t * (t_max - t_min)
            })
            .collect();
        Self { values }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[inline]
    pub fn at(&self, site: usize) -> f64 {
        self.values[site]
    }
}

/// Outcome of one simulation step.
#[derive(Debug, Clone, Copy, Default)]
pub struct StepReport {
    /// Convergence scalar: acceptance fraction for Metropolis, max torque
    /// magnitude for the field-driven methods. Only computed on steps
    /// where the driver asks for it (except Metropolis, where it is a
    /// byproduct of the sweep).
    pub metric: Option<f64>,
    /// Count of per-site numerical fallbacks (degenerate normalizations)
    /// taken during the step.
    pub fallback_events: usize,
}

pub trait SimulationMethod {
    fn step(
        &mut self,
        field: &mut SpinField,
        hamiltonian: &Hamiltonian,
        rng: &mut RandomSource,
        temperature: &TemperatureField,
        want_metric: bool,
    ) -> Result<StepReport, SimError>;

    fn label(&self) -> &str;
}

/// Max over active sites of |S x B_eff|; goes to zero at equilibrium.
pub fn torque_metric(field: &SpinField, hamiltonian: &Hamiltonian) -> f64 {
    let spins = field.spins();
    field
        .active_sites()
        .iter()
        .map(|&i| vec3::norm(vec3::cross(spins[i], hamiltonian.effective_field(spins, i))))
        .fold(0.0, f64::max)
}

/// Per-site arrays must cover the whole spin field; checked at step entry
/// so a short temperature field is a typed error, not a panic mid-sweep.
pub(crate) fn check_temperature_extent(
    field: &SpinField,
    temperature: &TemperatureField,
) -> Result<(), SimError> {
    if temperature.len() != field.len() {
        return Err(SimError::TemperatureFieldLength {
            sites: field.len(),
            got: temperature.len(),
        });
    }
    Ok(())
}

/// Cadences for one `run_simulation` call. Zero intervals disable the
/// corresponding hook.
#[derive(Debug, Clone, Copy, serde::Serialize, serde::Deserialize)]
pub struct RunSchedule {
    pub steps: usize,
    #[serde(default)]
    pub ui_update_interval: usize,
    #[serde(default)]
    pub measure_interval: usize,
    #[serde(default)]
    pub movie_start: usize,
    #[serde(default)]
    pub movie_end: usize,
    #[serde(default)]
    pub movie_interval: usize,
}

impl RunSchedule {
    pub fn plain(steps: usize) -> Self {
        Self {
            steps,
            ui_update_interval: 0,
            measure_interval: 0,
            movie_start: 0,
            movie_end: 0,
            movie_interval: 0,
        }
    }
}

/// Driver callbacks. Both are plain non-blocking notifications; snapshot
/// receives a copy-ready borrow of the spin array valid for the call only.
#[derive(Default)]
pub struct RunHooks<'a> {
    pub progress: Option<Box<dyn FnMut(usize, Option<f64>) + 'a>>,
    pub snapshot: Option<Box<dyn FnMut(usize, &[[f64; 3]]) + 'a>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Done,
    Cancelled,
}

#[derive(Debug, Clone, Copy)]
pub struct RunOutcome {
    pub state: RunState,
    pub completed_steps: usize,
    pub fallback_events: usize,
    pub last_metric: Option<f64>,
}

fn lock_field(shared: &Mutex<SpinField>) -> std::sync::MutexGuard<'_, SpinField> {
    shared.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Drive `schedule.steps` iterations of `method.step`.
///
/// The cancellation flag is polled at UI-update boundaries only; a run
/// with `ui_update_interval == 0` is not cancellable. Cancellation is a
/// normal early return, not an error.
#[allow(clippy::too_many_arguments)]
pub fn run_simulation(
    method: &mut dyn SimulationMethod,
    shared: &Mutex<SpinField>,
    hamiltonian: &Hamiltonian,
    rng: &mut RandomSource,
    temperature: &TemperatureField,
    schedule: &RunSchedule,
    cancel: &AtomicBool,
    hooks: &mut RunHooks<'_>,
    mut measurement: Option<&mut dyn Measurement>,
) -> Result<RunOutcome, SimError> {
    let mut fallback_events = 0;
    let mut last_metric = None;
    let due = |interval: usize, step: usize| interval > 0 && step % interval == 0;

    for step in 1..=schedule.steps {
        let at_ui_boundary = due(schedule.ui_update_interval, step) || step == schedule.steps;

        let report = {
            let mut field = lock_field(shared);
            method.step(&mut field, hamiltonian, rng, temperature, at_ui_boundary)?
        };
        fallback_events += report.fallback_events;
        if report.metric.is_some() {
            last_metric = report.metric;
        }

        if due(schedule.ui_update_interval, step) {
            if let Some(progress) = hooks.progress.as_mut() {
                progress(step, report.metric);
            }
            if cancel.load(Ordering::Relaxed) {
                return Ok(RunOutcome {
                    state: RunState::Cancelled,
                    completed_steps: step,
                    fallback_events,
                    last_metric,
                });
            }
        }

        if due(schedule.measure_interval, step) {
            if let Some(m) = measurement.as_deref_mut() {
                let field = lock_field(shared);
                m.measure(field.spins(), hamiltonian);
            }
        }

        let in_movie_window = schedule.movie_interval > 0
            && step >= schedule.movie_start
            && step <= schedule.movie_end
            && (step - schedule.movie_start) % schedule.movie_interval == 0;
        if in_movie_window {
            if let Some(snapshot) = hooks.snapshot.as_mut() {
                let field = lock_field(shared);
                snapshot(step, field.spins());
            }
        }
    }

    Ok(RunOutcome {
        state: RunState::Done,
        completed_steps: schedule.steps,
        fallback_events,
        last_metric,
    })
}
