//! Write detected-signal errors to disk.
//!
//! Two formats are produced:
//!
//! - a whitespace-delimited text table (one row per detected signal, header
//!   naming every column, `%.3E`-style scientific notation) that downstream
//!   scripts consume
//! - a JSON results file as the portable representation

use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::detection::Network;
use crate::domain::ParameterSet;
use crate::error::AppError;
use crate::fisher::NetworkErrors;

/// Output file stem for a (sub-)network's error table.
pub fn errors_file_name(
    network: &Network,
    sub_network_ids: &[usize],
    population_name: &str,
) -> Result<String, AppError> {
    let detectors = network.detectors();
    let mut names = Vec::with_capacity(sub_network_ids.len());
    for &k in sub_network_ids {
        let detector = detectors.get(k).ok_or_else(|| {
            AppError::new(
                2,
                format!("Sub-network index {k} out of range (network has {} detectors).", detectors.len()),
            )
        })?;
        names.push(detector.name());
    }

    Ok(format!(
        "Errors_{}_{}_SNR{}",
        names.join("_"),
        population_name,
        network.detection_snr().1
    ))
}

/// C-style `%.3E` formatting: three fractional digits, explicit exponent sign,
/// at least two exponent digits.
pub fn fmt_sci(value: f64) -> String {
    if !value.is_finite() {
        return format!("{value}");
    }
    let formatted = format!("{value:.3e}");
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{mantissa}E{sign}{digits:0>2}")
        }
        None => formatted,
    }
}

/// Write the errors text table.
///
/// Columns: network SNR, the original parameter values (in `parameter_names`
/// order), one `err_*` column per Fisher parameter, and `err_sky_location`
/// when sky areas were computed. Returns the written path.
pub fn write_errors_txt(
    dir: &Path,
    file_stem: &str,
    catalog: &[ParameterSet],
    parameter_names: &[String],
    errors: &NetworkErrors,
    fisher_parameters: &[String],
) -> Result<PathBuf, AppError> {
    create_dir_all(dir)
        .map_err(|e| AppError::new(2, format!("Failed to create output dir '{}': {e}", dir.display())))?;
    let path = dir.join(format!("{file_stem}.txt"));
    let mut file = File::create(&path)
        .map_err(|e| AppError::new(2, format!("Failed to create '{}': {e}", path.display())))?;

    let mut header = String::from("network_SNR");
    for name in parameter_names {
        header.push(' ');
        header.push_str(name);
    }
    for name in fisher_parameters {
        header.push_str(" err_");
        header.push_str(name);
    }
    if errors.sky_localization.is_some() {
        header.push_str(" err_sky_location");
    }
    writeln!(file, "{header}")
        .map_err(|e| AppError::new(2, format!("Failed to write errors header: {e}")))?;

    for (row, &signal_index) in errors.detected.iter().enumerate() {
        let signal = catalog.get(signal_index).ok_or_else(|| {
            AppError::new(4, format!("Detected index {signal_index} outside the catalog."))
        })?;

        let mut line = format!("{}", errors.network_snr[row]);
        for name in parameter_names {
            line.push(' ');
            line.push_str(&fmt_sci(signal.get(name)?));
        }
        for value in &errors.parameter_errors[row] {
            line.push(' ');
            line.push_str(&fmt_sci(*value));
        }
        if let Some(sky) = &errors.sky_localization {
            line.push(' ');
            line.push_str(&fmt_sci(sky[row]));
        }
        writeln!(file, "{line}")
            .map_err(|e| AppError::new(2, format!("Failed to write errors row: {e}")))?;
    }

    Ok(path)
}

/// JSON results schema.
#[derive(Debug, Clone, Serialize)]
pub struct ResultsFile {
    pub tool: String,
    pub network: String,
    pub detection_snr: (f64, f64),
    pub fisher_parameters: Vec<String>,
    pub signals: Vec<SignalRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignalRecord {
    /// Index of the signal in the input catalog.
    pub index: usize,
    pub network_snr: f64,
    pub parameters: ParameterSet,
    /// 1-sigma errors, ordered like `fisher_parameters`.
    pub errors: Vec<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sky_area: Option<f64>,
}

/// Write the JSON results file.
pub fn write_results_json(
    path: &Path,
    network: &Network,
    catalog: &[ParameterSet],
    errors: &NetworkErrors,
    fisher_parameters: &[String],
) -> Result<(), AppError> {
    let mut signals = Vec::with_capacity(errors.detected.len());
    for (row, &signal_index) in errors.detected.iter().enumerate() {
        let parameters = catalog.get(signal_index).ok_or_else(|| {
            AppError::new(4, format!("Detected index {signal_index} outside the catalog."))
        })?;
        signals.push(SignalRecord {
            index: signal_index,
            network_snr: errors.network_snr[row],
            parameters: parameters.clone(),
            errors: errors.parameter_errors[row].clone(),
            sky_area: errors.sky_localization.as_ref().map(|sky| sky[row]),
        });
    }

    let results = ResultsFile {
        tool: "gwf".to_string(),
        network: network.name(),
        detection_snr: network.detection_snr(),
        fisher_parameters: fisher_parameters.to_vec(),
        signals,
    };

    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create results JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, &results)
        .map_err(|e| AppError::new(2, format!("Failed to write results JSON: {e}")))?;
    Ok(())
}
