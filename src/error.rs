// src/error.rs
//
// Typed error taxonomy for the simulator core.
//
// Policy:
// - Construction-time problems (lattice/spin-field/config) are fatal: no
//   partial lattice is ever handed to a Hamiltonian.
// - Per-step numerical degeneracies do NOT abort a run; the step methods
//   substitute a conservative fallback and surface a counter in their
//   StepReport instead of returning one of these.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    /// Lattice shape and dimension-count disagree (e.g. a cubic shape with
    /// two dimensions). Checked before any array is sized.
    #[error("inconsistent lattice parameters: shape {shape} expects {expected} dimension(s), got {got}")]
    InconsistentLatticeParameters {
        shape: String,
        expected: usize,
        got: usize,
    },

    /// A lattice/spin input file does not exist or cannot be opened.
    #[error("missing input file: {0}")]
    MissingFile(PathBuf),

    /// A text input file exists but a line does not parse.
    #[error("malformed line {line} in {path}: {reason}")]
    MalformedLine {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    /// Attempt to normalize a zero-length vector in a context where the
    /// direction matters and no fallback is defined.
    #[error("cannot normalize a zero-length vector")]
    ZeroNormalization,

    /// Site index outside [0, N).
    #[error("site index {site} out of range (lattice has {len} sites)")]
    SiteOutOfRange { site: usize, len: usize },

    /// Energy-term index outside the Hamiltonian's term list.
    #[error("energy term index {index} out of range ({count} terms)")]
    TermOutOfRange { index: usize, count: usize },

    /// Temperature field and spin field disagree on the site count.
    #[error("temperature field covers {got} sites, spin field has {sites}")]
    TemperatureFieldLength { sites: usize, got: usize },

    /// `restore_single_orientation` called with no pending trial.
    #[error("restore_single_orientation called without a preceding trial")]
    NoPendingTrial,

    /// Metropolis requires strictly positive temperature at every active
    /// site (Boltzmann factor divides by kB*T).
    #[error("non-positive temperature {temperature} K at site {site}")]
    NonPositiveTemperature { site: usize, temperature: f64 },

    /// Configuration failed validation before setup.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Raster mask could not be decoded.
    #[error("failed to decode image mask {path}: {reason}")]
    BadImageMask { path: PathBuf, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
