//! CSV catalog ingest and normalization.
//!
//! A catalog is a plain CSV whose header names the signal parameters and
//! whose rows hold one signal each. Design goals:
//!
//! - **Strict schema** for the header (clear errors + exit code 2)
//! - **Row-level validation** (skip bad rows, but report what happened)
//! - **Deterministic behavior** (no hidden randomness)

use std::path::Path;

use crate::domain::ParameterSet;
use crate::error::AppError;

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: signals + the header's parameter order + row errors.
#[derive(Debug, Clone)]
pub struct CatalogData {
    pub signals: Vec<ParameterSet>,
    /// Parameter names in the catalog's column order (used for reports).
    pub parameter_names: Vec<String>,
    pub rows_read: usize,
    pub row_errors: Vec<RowError>,
}

/// Load a signal catalog from CSV.
pub fn load_catalog(path: &Path) -> Result<CatalogData, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| AppError::new(2, format!("Failed to open catalog '{}': {e}", path.display())))?;

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read catalog header: {e}")))?
        .clone();
    let parameter_names: Vec<String> = headers.iter().map(|h| h.to_string()).collect();

    if parameter_names.is_empty() {
        return Err(AppError::new(2, "Catalog header names no parameters."));
    }
    for (i, name) in parameter_names.iter().enumerate() {
        if name.is_empty() {
            return Err(AppError::new(2, format!("Catalog header column {} is empty.", i + 1)));
        }
        if parameter_names[..i].contains(name) {
            return Err(AppError::new(2, format!("Duplicate catalog column '{name}'.")));
        }
    }

    let mut signals = Vec::new();
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (index, record) in reader.records().enumerate() {
        rows_read += 1;
        // Header occupies line 1.
        let line = index + 2;

        let record = match record {
            Ok(record) => record,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("Unreadable row: {e}"),
                });
                continue;
            }
        };

        if record.len() != parameter_names.len() {
            row_errors.push(RowError {
                line,
                message: format!(
                    "Expected {} fields, found {}.",
                    parameter_names.len(),
                    record.len()
                ),
            });
            continue;
        }

        let mut values = Vec::with_capacity(parameter_names.len());
        let mut bad_field = None;
        for (name, field) in parameter_names.iter().zip(record.iter()) {
            match field.parse::<f64>() {
                Ok(v) if v.is_finite() => values.push((name.clone(), v)),
                Ok(v) => {
                    bad_field = Some(format!("Non-finite value {v} for '{name}'."));
                    break;
                }
                Err(_) => {
                    bad_field = Some(format!("Cannot parse '{field}' for '{name}'."));
                    break;
                }
            }
        }
        if let Some(message) = bad_field {
            row_errors.push(RowError { line, message });
            continue;
        }

        signals.push(ParameterSet::from_pairs(values));
    }

    if signals.is_empty() {
        return Err(AppError::new(
            3,
            format!(
                "No usable signals in '{}' ({} rows rejected).",
                path.display(),
                row_errors.len()
            ),
        ));
    }

    Ok(CatalogData {
        signals,
        parameter_names,
        rows_read,
        row_errors,
    })
}
