//! Command-line parsing for the network Fisher forecaster.
//!
//! The goal of this module is to keep **argument parsing** and **command
//! dispatch** separate from the numerics.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::WaveformArg;
use crate::error::AppError;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "gwf",
    version,
    about = "Fisher-matrix parameter-error forecasting for gravitational-wave detector networks"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze a signal catalog CSV and write the errors table.
    Analyze(AnalyzeArgs),
    /// Generate a seeded synthetic population and analyze it.
    Sample(SampleArgs),
}

/// Options shared by every analysis run.
#[derive(Debug, Parser, Clone)]
pub struct RunArgs {
    /// Detectors forming the network (preset names).
    #[arg(long, value_delimiter = ',', default_values_t = ["H1".to_string(), "L1".to_string(), "V1".to_string()])]
    pub detectors: Vec<String>,

    /// Individual-detector SNR threshold for Fisher-matrix inclusion.
    #[arg(long, default_value_t = 0.0)]
    pub detector_snr: f64,

    /// Network SNR detection threshold (strict > comparison).
    #[arg(long, default_value_t = 8.0)]
    pub network_snr: f64,

    /// Parameters to include in the Fisher matrix.
    #[arg(
        long,
        value_delimiter = ',',
        default_values_t = [
            "mass_1".to_string(),
            "mass_2".to_string(),
            "luminosity_distance".to_string(),
            "geocent_time".to_string(),
            "phase".to_string(),
            "ra".to_string(),
            "dec".to_string(),
            "psi".to_string(),
        ]
    )]
    pub fisher_parameters: Vec<String>,

    /// Waveform model.
    #[arg(long, value_enum, default_value_t = WaveformArg::Inspiral)]
    pub waveform: WaveformArg,

    /// Lower edge of the frequency grid (Hz).
    #[arg(long, default_value_t = 20.0)]
    pub f_min: f64,

    /// Upper edge of the frequency grid (Hz).
    #[arg(long, default_value_t = 1024.0)]
    pub f_max: f64,

    /// Frequency grid spacing (Hz).
    #[arg(long, default_value_t = 0.25)]
    pub delta_f: f64,

    /// Waveform reference frequency (Hz).
    #[arg(long, default_value_t = 50.0)]
    pub f_ref: f64,

    /// Finite-difference step scale.
    #[arg(long, default_value_t = 1e-5)]
    pub fd_eps: f64,

    /// Singular-value truncation threshold for the pseudo-inverse.
    #[arg(long, default_value_t = 1e-10)]
    pub svd_threshold: f64,

    /// Derate SNR by each detector's duty factor.
    #[arg(long)]
    pub duty_cycle: bool,

    /// Analyze sub-networks instead of the full network: semicolon-separated
    /// groups of comma-separated detector indices, e.g. `0,1;0,2;0,1,2`.
    #[arg(long, value_name = "GROUPS")]
    pub sub_networks: Option<String>,

    /// Population label used in output file names.
    #[arg(long, default_value = "population")]
    pub population: String,

    /// Directory for the errors text table.
    #[arg(long, default_value = ".")]
    pub out_dir: PathBuf,

    /// Also export results as JSON.
    #[arg(long)]
    pub export_json: Option<PathBuf>,
}

/// Analyze an existing catalog file.
#[derive(Debug, Parser)]
pub struct AnalyzeArgs {
    /// Signal catalog CSV (header names the parameters).
    pub catalog: PathBuf,

    #[command(flatten)]
    pub run: RunArgs,
}

/// Generate and analyze a synthetic population.
#[derive(Debug, Parser)]
pub struct SampleArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Number of signals to generate.
    #[arg(short = 'n', long, default_value_t = 100)]
    pub count: usize,

    /// Random seed for population generation.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Mean component mass (solar masses).
    #[arg(long, default_value_t = 30.0)]
    pub mass_mean: f64,

    /// Component-mass standard deviation (solar masses).
    #[arg(long, default_value_t = 5.0)]
    pub mass_sigma: f64,

    /// Minimum component mass (solar masses).
    #[arg(long, default_value_t = 5.0)]
    pub mass_min: f64,

    /// Maximum component mass (solar masses).
    #[arg(long, default_value_t = 80.0)]
    pub mass_max: f64,

    /// Minimum luminosity distance (Mpc).
    #[arg(long, default_value_t = 100.0)]
    pub distance_min: f64,

    /// Maximum luminosity distance (Mpc).
    #[arg(long, default_value_t = 2000.0)]
    pub distance_max: f64,
}

/// Parse the `--sub-networks` flag: `0,1;0,2` selects two sub-networks.
pub fn parse_sub_networks(spec: &str) -> Result<Vec<Vec<usize>>, AppError> {
    let mut groups = Vec::new();
    for group in spec.split(';') {
        let group = group.trim();
        if group.is_empty() {
            continue;
        }
        let mut indices = Vec::new();
        for token in group.split(',') {
            let token = token.trim();
            let index = token.parse::<usize>().map_err(|_| {
                AppError::new(2, format!("Invalid detector index '{token}' in --sub-networks."))
            })?;
            indices.push(index);
        }
        groups.push(indices);
    }
    if groups.is_empty() {
        return Err(AppError::new(2, "--sub-networks selects no detectors."));
    }
    Ok(groups)
}
