//! Shared analysis pipeline used by both subcommands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! network construction -> per-signal Fisher evaluation -> detection filter
//!
//! The subcommands then focus on input acquisition and presentation.

use log::info;

use crate::detection::{Detector, FrequencyGrid, Network};
use crate::domain::{ParameterSet, RunConfig, WaveformArg};
use crate::error::AppError;
use crate::fisher::{compute_network_errors, NetworkErrors};
use crate::waveform::WaveformKind;

/// All computed outputs of a single run.
#[derive(Debug)]
pub struct AnalysisOutput {
    pub network: Network,
    pub errors: NetworkErrors,
}

/// Build the detector network described by the configuration.
pub fn build_network(config: &RunConfig) -> Result<Network, AppError> {
    let grid = FrequencyGrid::uniform(config.f_min, config.f_max, config.delta_f)?;
    let detectors: Result<Vec<Detector>, AppError> = config
        .detectors
        .iter()
        .map(|name| Detector::preset(name, grid.clone()))
        .collect();
    Network::new(
        detectors?,
        (config.detector_snr_threshold, config.network_snr_threshold),
    )
}

/// Run the Fisher analysis of a catalog against one (sub-)network.
pub fn run_with_network(
    network: &Network,
    config: &RunConfig,
    catalog: &[ParameterSet],
) -> Result<NetworkErrors, AppError> {
    let kind = match config.waveform {
        WaveformArg::Inspiral => WaveformKind::Inspiral,
    };

    info!(
        "analyzing {} signals against {} ({} Fisher parameters)",
        catalog.len(),
        network.name(),
        config.fisher_parameters.len()
    );

    compute_network_errors(
        network,
        catalog,
        &config.fisher_parameters,
        &kind,
        config.fisher,
        config.use_duty_cycle,
    )
}

/// Execute the full analysis against the configured network.
pub fn run_analysis(
    config: &RunConfig,
    catalog: &[ParameterSet],
) -> Result<AnalysisOutput, AppError> {
    let network = build_network(config)?;
    let errors = run_with_network(&network, config, catalog)?;
    Ok(AnalysisOutput { network, errors })
}
