//! Formatted terminal summary of a run.

use crate::detection::Network;
use crate::domain::RunConfig;
use crate::error::AppError;
use crate::fisher::{sky_localization_percentile_factor, NetworkErrors};
use crate::io::fmt_sci;

/// Format the full run summary (network + detection stats + median errors).
pub fn format_run_summary(
    network: &Network,
    config: &RunConfig,
    n_signals: usize,
    errors: &NetworkErrors,
) -> Result<String, AppError> {
    let mut out = String::new();

    let (detector_threshold, network_threshold) = network.detection_snr();
    out.push_str("=== gwf - network Fisher forecast ===\n");
    out.push_str(&format!(
        "Network: {} (detector SNR > {detector_threshold}, network SNR > {network_threshold})\n",
        network.name()
    ));
    out.push_str(&format!("Waveform: {}\n", config.waveform.display_name()));
    out.push_str(&format!(
        "Grid: [{:.1}, {:.1}] Hz, df={:.3} Hz\n",
        config.f_min, config.f_max, config.delta_f
    ));

    let detected = errors.detected.len();
    let rate = 100.0 * detected as f64 / n_signals as f64;
    out.push_str(&format!(
        "Signals: n={n_signals} | detected={detected} ({rate:.1}%)\n"
    ));

    if detected == 0 {
        out.push_str("\nNo signals above the network detection threshold.\n");
        return Ok(out);
    }

    let snr_median = median(&errors.network_snr)
        .ok_or_else(|| AppError::new(4, "Failed to compute the median network SNR."))?;
    out.push_str(&format!("Median network SNR: {snr_median:.2}\n"));

    out.push_str("\nMedian 1-sigma errors (detected signals):\n");
    for (i, name) in config.fisher_parameters.iter().enumerate() {
        let column: Vec<f64> = errors.parameter_errors.iter().map(|row| row[i]).collect();
        let value = median(&column)
            .ok_or_else(|| AppError::new(4, format!("Failed to compute the median error of '{name}'.")))?;
        out.push_str(&format!("  {:<24} {}\n", format!("err_{name}"), fmt_sci(value)));
    }

    if let Some(sky) = &errors.sky_localization {
        let area = median(sky)
            .ok_or_else(|| AppError::new(4, "Failed to compute the median sky area."))?;
        let ninety = area * sky_localization_percentile_factor(90.0);
        out.push_str(&format!(
            "\nMedian sky localization: {} sr (90%: {} deg^2)\n",
            fmt_sci(area),
            fmt_sci(ninety)
        ));
    }

    Ok(out)
}

fn median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 1 {
        Some(sorted[mid])
    } else {
        Some((sorted[mid - 1] + sorted[mid]) / 2.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{Detector, FrequencyGrid, NoiseModel};
    use crate::domain::{FisherConfig, WaveformArg};
    use std::path::PathBuf;

    fn test_setup() -> (Network, RunConfig) {
        let grid = FrequencyGrid::uniform(20.0, 100.0, 1.0).unwrap();
        let detector =
            Detector::new("H1", 0.5, -2.0, 1.0, grid, NoiseModel::Flat { level: 1.0 }, 1.0).unwrap();
        let network = Network::new(vec![detector], (0.0, 8.0)).unwrap();

        let config = RunConfig {
            detectors: vec!["H1".to_string()],
            detector_snr_threshold: 0.0,
            network_snr_threshold: 8.0,
            fisher_parameters: vec!["luminosity_distance".to_string(), "ra".to_string()],
            waveform: WaveformArg::Inspiral,
            f_min: 20.0,
            f_max: 100.0,
            delta_f: 1.0,
            use_duty_cycle: false,
            fisher: FisherConfig::default(),
            sub_networks: None,
            population_name: "test".to_string(),
            output_dir: PathBuf::from("."),
            export_json: None,
        };
        (network, config)
    }

    #[test]
    fn summary_lists_counts_and_median_errors() {
        let (network, config) = test_setup();
        let errors = NetworkErrors {
            detected: vec![0, 2],
            network_snr: vec![10.0, 20.0],
            parameter_errors: vec![vec![0.2, 1e-3], vec![0.4, 3e-3]],
            sky_localization: None,
        };

        let summary = format_run_summary(&network, &config, 3, &errors).unwrap();
        assert!(summary.contains("detected=2"));
        assert!(summary.contains("Median network SNR: 15.00"));
        assert!(summary.contains("err_luminosity_distance"));
        assert!(summary.contains("3.000E-01"));
        assert!(!summary.contains("sky localization"));
    }

    #[test]
    fn summary_handles_zero_detections() {
        let (network, config) = test_setup();
        let errors = NetworkErrors {
            detected: vec![],
            network_snr: vec![],
            parameter_errors: vec![],
            sky_localization: None,
        };

        let summary = format_run_summary(&network, &config, 5, &errors).unwrap();
        assert!(summary.contains("No signals above the network detection threshold."));
    }

    #[test]
    fn summary_includes_sky_block_when_present() {
        let (network, config) = test_setup();
        let errors = NetworkErrors {
            detected: vec![0],
            network_snr: vec![12.0],
            parameter_errors: vec![vec![0.2, 1e-3]],
            sky_localization: Some(vec![2e-5]),
        };

        let summary = format_run_summary(&network, &config, 1, &errors).unwrap();
        assert!(summary.contains("Median sky localization"));
        assert!(summary.contains("2.000E-05"));
    }
}
