//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during Fisher-matrix evaluation
//! - exported to text/JSON reports
//! - reloaded later for comparisons across runs

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Well-known signal parameter names.
///
/// The derivative engine special-cases the first three (analytic rules) and
/// the sky/orientation triple (projection-only finite differences); everything
/// else is treated as an intrinsic waveform parameter.
pub mod names {
    pub const MASS_1: &str = "mass_1";
    pub const MASS_2: &str = "mass_2";
    pub const LUMINOSITY_DISTANCE: &str = "luminosity_distance";
    pub const GEOCENT_TIME: &str = "geocent_time";
    pub const PHASE: &str = "phase";
    pub const THETA_JN: &str = "theta_jn";
    pub const RA: &str = "ra";
    pub const DEC: &str = "dec";
    pub const PSI: &str = "psi";
}

/// An immutable map from parameter name to value.
///
/// Central parameter values never change during an evaluation; perturbation
/// for finite differencing goes through [`ParameterSet::with`], which returns
/// an independent copy. Keys iterate in sorted order, so downstream output is
/// deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet {
    values: BTreeMap<String, f64>,
}

impl ParameterSet {
    pub fn from_pairs<K: Into<String>>(pairs: impl IntoIterator<Item = (K, f64)>) -> Self {
        Self {
            values: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Look up a parameter, failing with a clear message when absent.
    pub fn get(&self, name: &str) -> Result<f64, AppError> {
        self.values
            .get(name)
            .copied()
            .ok_or_else(|| AppError::new(2, format!("Missing signal parameter '{name}'.")))
    }

    pub fn try_get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Return a perturbed copy with `name` set to `value`.
    pub fn with(&self, name: &str, value: f64) -> Self {
        let mut values = self.values.clone();
        values.insert(name.to_string(), value);
        Self { values }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Numerical knobs of the Fisher engine.
///
/// The defaults are the documented values used throughout the literature on
/// linearized-likelihood forecasting; they are surfaced here (and on the CLI)
/// rather than buried as literals in the numerics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FisherConfig {
    /// Central finite-difference step scale: `dθ = max(fd_eps, fd_eps·|θ|)`.
    ///
    /// The default follows the cube-root-of-double-precision heuristic.
    pub fd_eps: f64,
    /// Singular values of the normalized Fisher matrix at or below this
    /// threshold are discarded during pseudo-inversion.
    pub svd_threshold: f64,
    /// Waveform reference frequency (Hz): the post-Newtonian phase term is
    /// zeroed at this frequency.
    pub f_ref: f64,
}

impl Default for FisherConfig {
    fn default() -> Self {
        Self {
            fd_eps: 1e-5,
            svd_threshold: 1e-10,
            f_ref: 50.0,
        }
    }
}

/// Waveform model selectable from the CLI.
///
/// Sample-backed templates ([`crate::waveform::SampledModel`]) are constructed
/// programmatically from stored arrays and have no file format yet, so they do
/// not appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WaveformArg {
    /// Closed-form frequency-domain inspiral model.
    Inspiral,
}

impl WaveformArg {
    /// Human-readable label for terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            WaveformArg::Inspiral => "inspiral",
        }
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub detectors: Vec<String>,
    /// Individual-detector SNR threshold for Fisher-matrix inclusion.
    pub detector_snr_threshold: f64,
    /// Network SNR detection threshold (strict `>` comparison).
    pub network_snr_threshold: f64,
    pub fisher_parameters: Vec<String>,
    pub waveform: WaveformArg,

    /// Uniform detector frequency grid.
    pub f_min: f64,
    pub f_max: f64,
    pub delta_f: f64,

    pub use_duty_cycle: bool,
    pub fisher: FisherConfig,

    /// Optional sub-network index groups to analyze instead of the full
    /// network (each group selects detectors by position).
    pub sub_networks: Option<Vec<Vec<usize>>>,

    /// Population label used in output file names.
    pub population_name: String,
    pub output_dir: PathBuf,
    pub export_json: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameter_set_with_returns_independent_copy() {
        let base = ParameterSet::from_pairs([("mass_1", 30.0), ("mass_2", 25.0)]);
        let perturbed = base.with("mass_1", 31.0);

        assert!((base.get("mass_1").unwrap() - 30.0).abs() < 1e-15);
        assert!((perturbed.get("mass_1").unwrap() - 31.0).abs() < 1e-15);
        assert!((perturbed.get("mass_2").unwrap() - 25.0).abs() < 1e-15);
    }

    #[test]
    fn parameter_set_missing_name_is_an_error() {
        let base = ParameterSet::from_pairs([("ra", 1.0)]);
        let err = base.get("dec").unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn parameter_set_iterates_in_sorted_order() {
        let set = ParameterSet::from_pairs([("psi", 0.1), ("dec", 0.2), ("ra", 0.3)]);
        let order: Vec<&str> = set.names().collect();
        assert_eq!(order, vec!["dec", "psi", "ra"]);
    }

    #[test]
    fn fisher_config_defaults() {
        let config = FisherConfig::default();
        assert!((config.fd_eps - 1e-5).abs() < 1e-20);
        assert!((config.svd_threshold - 1e-10).abs() < 1e-25);
    }
}
