//! Network aggregation of per-detector Fisher matrices.
//!
//! For every signal in a catalog: each detector contributes its squared SNR
//! unconditionally, but its information matrix only when its own SNR clears
//! the individual-detector threshold. The summed matrix is pseudo-inverted
//! and the covariance diagonal becomes the 1-sigma parameter errors. Signals
//! survive selection only when the network SNR strictly exceeds the network
//! threshold.

use log::debug;
use nalgebra::DMatrix;
use rayon::prelude::*;

use crate::detection::{project, snr_contributions, Detector, Network};
use crate::domain::{names, FisherConfig, ParameterSet};
use crate::error::AppError;
use crate::fisher::FisherMatrix;
use crate::math::invert_svd;
use crate::waveform::{build_waveform, WaveformData, WaveformKind};

/// Evaluate one detector/signal pair.
///
/// Returns the Fisher matrix over `fisher_parameters` and the squared SNR of
/// the projected signal in this detector.
pub fn compute_detector_fisher(
    detector: &Detector,
    parameters: &ParameterSet,
    fisher_parameters: &[String],
    kind: &WaveformKind,
    config: FisherConfig,
    use_duty_cycle: bool,
) -> Result<(DMatrix<f64>, f64), AppError> {
    let data = WaveformData {
        grid: detector.frequency_grid().clone(),
        f_ref: config.f_ref,
    };
    let model = build_waveform(kind, parameters, &data)?;
    let sample = model.strain()?;
    let signal = project(parameters, detector, &sample)?;

    let contributions = snr_contributions(detector, &signal, use_duty_cycle)?;
    let snr_square: f64 = contributions.iter().map(|s| s * s).sum();

    let mut fisher = FisherMatrix::new(kind, parameters, fisher_parameters, detector, config)?;
    Ok((fisher.get_or_compute()?, snr_square))
}

/// Errors of the detected subset of a catalog.
#[derive(Debug, Clone)]
pub struct NetworkErrors {
    /// Catalog indices of the detected signals, in catalog order.
    pub detected: Vec<usize>,
    pub network_snr: Vec<f64>,
    /// Per detected signal: 1-sigma errors ordered like the Fisher parameters.
    pub parameter_errors: Vec<Vec<f64>>,
    /// 1-sigma sky areas (steradian); present iff both `ra` and `dec` are
    /// Fisher parameters.
    pub sky_localization: Option<Vec<f64>>,
}

struct SignalResult {
    snr: f64,
    errors: Vec<f64>,
    sky_area: Option<f64>,
}

/// Compute Fisher errors for every catalog signal and keep the detected ones.
///
/// Signals are evaluated independently (in parallel); the catalog order is
/// preserved in the output.
pub fn compute_network_errors(
    network: &Network,
    catalog: &[ParameterSet],
    fisher_parameters: &[String],
    kind: &WaveformKind,
    config: FisherConfig,
    use_duty_cycle: bool,
) -> Result<NetworkErrors, AppError> {
    let n_params = fisher_parameters.len();
    if n_params == 0 {
        return Err(AppError::new(2, "Fisher parameter list must not be empty."));
    }
    if catalog.is_empty() {
        return Err(AppError::new(2, "Signal catalog must not be empty."));
    }

    let i_ra = fisher_parameters.iter().position(|p| p == names::RA);
    let i_dec = fisher_parameters.iter().position(|p| p == names::DEC);
    let sky_indices = match (i_ra, i_dec) {
        (Some(ra), Some(dec)) => Some((ra, dec)),
        _ => None,
    };

    let (detector_threshold, network_threshold) = network.detection_snr();

    let results: Result<Vec<SignalResult>, AppError> = catalog
        .par_iter()
        .enumerate()
        .map(|(index, parameters)| {
            let mut network_fisher = DMatrix::<f64>::zeros(n_params, n_params);
            let mut snr_square_total = 0.0;

            for detector in network.detectors() {
                let (fisher, snr_square) = compute_detector_fisher(
                    detector,
                    parameters,
                    fisher_parameters,
                    kind,
                    config,
                    use_duty_cycle,
                )?;
                // Every detector contributes signal power; only confident
                // detectors contribute information.
                snr_square_total += snr_square;
                if snr_square.sqrt() > detector_threshold {
                    network_fisher += fisher;
                }
            }

            let (covariance, _singular_values) = invert_svd(&network_fisher, config.svd_threshold)?;
            let errors: Vec<f64> = (0..n_params)
                .map(|i| covariance[(i, i)].max(0.0).sqrt())
                .collect();
            let snr = snr_square_total.sqrt();

            let sky_area = match sky_indices {
                Some((ra, dec)) => Some(sky_localization_area(
                    &covariance,
                    parameters.get(names::DEC)?,
                    ra,
                    dec,
                )),
                None => None,
            };

            debug!("signal {index}: network SNR {snr:.2}");
            Ok(SignalResult {
                snr,
                errors,
                sky_area,
            })
        })
        .collect();
    let results = results?;

    let mut detected = Vec::new();
    let mut network_snr = Vec::new();
    let mut parameter_errors = Vec::new();
    let mut sky_areas = Vec::new();
    for (index, result) in results.into_iter().enumerate() {
        // Strict comparison: a signal exactly at threshold is not detected.
        if result.snr > network_threshold {
            detected.push(index);
            network_snr.push(result.snr);
            parameter_errors.push(result.errors);
            if let Some(area) = result.sky_area {
                sky_areas.push(area);
            }
        }
    }

    debug!(
        "{} of {} signals above network SNR threshold {network_threshold}",
        detected.len(),
        catalog.len()
    );

    Ok(NetworkErrors {
        detected,
        network_snr,
        parameter_errors,
        sky_localization: sky_indices.map(|_| sky_areas),
    })
}

/// 1-sigma sky-localization ellipse area (steradian) from a network
/// covariance matrix and the signal's declination.
pub fn sky_localization_area(
    covariance: &DMatrix<f64>,
    declination: f64,
    ra_index: usize,
    dec_index: usize,
) -> f64 {
    let det_block = covariance[(ra_index, ra_index)] * covariance[(dec_index, dec_index)]
        - covariance[(ra_index, dec_index)].powi(2);
    std::f64::consts::PI * declination.cos().abs() * det_block.max(0.0).sqrt()
}

/// Conversion factor from the 1-sigma steradian area to the
/// `percentile`%-confidence contour in square degrees.
pub fn sky_localization_percentile_factor(percentile: f64) -> f64 {
    -2.0 * (1.0 - percentile / 100.0).ln() * (180.0 / std::f64::consts::PI).powi(2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{FrequencyGrid, NoiseModel};

    fn flat_detector(name: &str) -> Detector {
        Detector::new(
            name,
            0.64,
            -2.08,
            2.2,
            FrequencyGrid::uniform(20.0, 128.0, 2.0).unwrap(),
            NoiseModel::Flat { level: 1e-46 },
            1.0,
        )
        .unwrap()
    }

    fn test_parameters() -> ParameterSet {
        ParameterSet::from_pairs([
            (names::MASS_1, 30.0),
            (names::MASS_2, 25.0),
            (names::LUMINOSITY_DISTANCE, 400.0),
            (names::GEOCENT_TIME, 1.0),
            (names::PHASE, 1.3),
            (names::THETA_JN, 0.4),
            (names::RA, 1.2),
            (names::DEC, -0.5),
            (names::PSI, 0.7),
        ])
    }

    fn to_names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn analytic_parameters_give_distance_error_d_over_snr() {
        // Single detector, flat noise, analytic derivatives only: the
        // distance row decouples and its 1-sigma error is d/SNR.
        let detector = flat_detector("T1");
        let network = Network::new(vec![detector.clone()], (0.0, 0.0)).unwrap();
        let parameters = test_parameters();
        let fisher_parameters = to_names(&[
            names::LUMINOSITY_DISTANCE,
            names::GEOCENT_TIME,
            names::PHASE,
        ]);

        let (_, snr_square) = compute_detector_fisher(
            &detector,
            &parameters,
            &fisher_parameters,
            &WaveformKind::Inspiral,
            FisherConfig::default(),
            false,
        )
        .unwrap();
        let snr = snr_square.sqrt();
        assert!(snr > 0.0);

        let errors = compute_network_errors(
            &network,
            &[parameters],
            &fisher_parameters,
            &WaveformKind::Inspiral,
            FisherConfig::default(),
            false,
        )
        .unwrap();

        assert_eq!(errors.detected, vec![0]);
        assert!(errors.sky_localization.is_none());
        assert!((errors.network_snr[0] - snr).abs() < 1e-9 * snr);

        let distance_error = errors.parameter_errors[0][0];
        let expected = 400.0 / snr;
        assert!(
            (distance_error - expected).abs() < 1e-6 * expected,
            "sigma_d = {distance_error}, expected d/SNR = {expected}"
        );
    }

    #[test]
    fn network_snr_square_is_additive_regardless_of_matrix_inclusion() {
        let d1 = flat_detector("T1");
        let d2 = flat_detector("T2");
        let parameters = test_parameters();
        let fisher_parameters = to_names(&[names::LUMINOSITY_DISTANCE, names::PHASE]);

        let mut per_detector_sum = 0.0;
        for detector in [&d1, &d2] {
            let (_, snr_square) = compute_detector_fisher(
                detector,
                &parameters,
                &fisher_parameters,
                &WaveformKind::Inspiral,
                FisherConfig::default(),
                false,
            )
            .unwrap();
            per_detector_sum += snr_square;
        }

        // Individual threshold so high that no matrix is ever included: the
        // SNR accumulator must be unaffected.
        let network = Network::new(vec![d1, d2], (1e12, 0.0)).unwrap();
        let errors = compute_network_errors(
            &network,
            &[parameters],
            &fisher_parameters,
            &WaveformKind::Inspiral,
            FisherConfig::default(),
            false,
        )
        .unwrap();

        let expected = per_detector_sum.sqrt();
        assert!((errors.network_snr[0] - expected).abs() < 1e-9 * expected);
        // With no information contributed, errors degrade to zero covariance.
        assert!(errors.parameter_errors[0].iter().all(|&e| e == 0.0));
    }

    #[test]
    fn at_threshold_signal_is_excluded_and_above_threshold_is_kept() {
        let detector = flat_detector("T1");
        let parameters = test_parameters();
        let fisher_parameters = to_names(&[names::LUMINOSITY_DISTANCE]);

        let (_, snr_square) = compute_detector_fisher(
            &detector,
            &parameters,
            &fisher_parameters,
            &WaveformKind::Inspiral,
            FisherConfig::default(),
            false,
        )
        .unwrap();
        let snr = snr_square.sqrt();

        let at_threshold = Network::new(vec![detector.clone()], (0.0, snr)).unwrap();
        let errors = compute_network_errors(
            &at_threshold,
            &[parameters.clone()],
            &fisher_parameters,
            &WaveformKind::Inspiral,
            FisherConfig::default(),
            false,
        )
        .unwrap();
        assert!(errors.detected.is_empty(), "exact-threshold signal must be excluded");

        let below_threshold = Network::new(vec![detector], (0.0, snr - 1.0)).unwrap();
        let errors = compute_network_errors(
            &below_threshold,
            &[parameters],
            &fisher_parameters,
            &WaveformKind::Inspiral,
            FisherConfig::default(),
            false,
        )
        .unwrap();
        assert_eq!(errors.detected, vec![0]);
    }

    #[test]
    fn sky_localization_present_when_ra_dec_requested() {
        let detector = flat_detector("T1");
        let network = Network::new(vec![detector], (0.0, 0.0)).unwrap();
        let fisher_parameters = to_names(&[
            names::LUMINOSITY_DISTANCE,
            names::RA,
            names::DEC,
            names::PSI,
        ]);

        let errors = compute_network_errors(
            &network,
            &[test_parameters()],
            &fisher_parameters,
            &WaveformKind::Inspiral,
            FisherConfig::default(),
            false,
        )
        .unwrap();

        let sky = errors.sky_localization.expect("sky areas expected");
        assert_eq!(sky.len(), errors.detected.len());
        assert!(sky.iter().all(|a| a.is_finite() && *a >= 0.0));
    }

    #[test]
    fn diagonal_covariance_block_gives_closed_form_area() {
        let mut covariance = DMatrix::<f64>::zeros(3, 3);
        covariance[(1, 1)] = 4.0e-4; // sigma_ra²
        covariance[(2, 2)] = 9.0e-4; // sigma_dec²
        let dec: f64 = -0.5;

        let area = sky_localization_area(&covariance, dec, 1, 2);
        let expected = std::f64::consts::PI * dec.cos().abs() * (2.0e-2 * 3.0e-2);
        assert!((area - expected).abs() < 1e-12);
    }

    #[test]
    fn percentile_factor_matches_reference_value() {
        // 90% contour: -2·ln(0.1)·(180/π)² ≈ 15117.9 deg²/sr.
        let factor = sky_localization_percentile_factor(90.0);
        assert!((factor - 15117.9).abs() < 1.0);
        assert!(sky_localization_percentile_factor(0.0).abs() < 1e-12);
    }

    #[test]
    fn empty_inputs_are_programming_errors() {
        let detector = flat_detector("T1");
        let network = Network::new(vec![detector], (0.0, 8.0)).unwrap();

        let err = compute_network_errors(
            &network,
            &[],
            &to_names(&[names::LUMINOSITY_DISTANCE]),
            &WaveformKind::Inspiral,
            FisherConfig::default(),
            false,
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);

        let err = compute_network_errors(
            &network,
            &[test_parameters()],
            &[],
            &WaveformKind::Inspiral,
            FisherConfig::default(),
            false,
        )
        .unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }
}
