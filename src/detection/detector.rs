//! Detector and network domain types.
//!
//! A `Detector` carries everything the evaluation of one signal needs: the
//! frequency grid it samples, an analytic noise PSD, the site geometry for
//! antenna patterns and time delays, and a duty factor. A `Network` is an
//! ordered collection of detectors plus the detection-threshold pair.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// An ordered, uniformly spaced frequency grid (Hz).
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyGrid {
    values: Vec<f64>,
    delta_f: f64,
}

impl FrequencyGrid {
    /// Build a uniform grid covering `[f_min, f_max]` with spacing `delta_f`.
    pub fn uniform(f_min: f64, f_max: f64, delta_f: f64) -> Result<Self, AppError> {
        if !(f_min.is_finite() && f_max.is_finite() && delta_f.is_finite()) {
            return Err(AppError::new(2, "Frequency grid bounds must be finite."));
        }
        if f_min <= 0.0 || f_max <= f_min || delta_f <= 0.0 {
            return Err(AppError::new(
                2,
                format!("Invalid frequency grid: f_min={f_min}, f_max={f_max}, delta_f={delta_f}."),
            ));
        }

        let n = ((f_max - f_min) / delta_f).floor() as usize + 1;
        let values = (0..n).map(|i| f_min + i as f64 * delta_f).collect();
        Ok(Self { values, delta_f })
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn delta_f(&self) -> f64 {
        self.delta_f
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Analytic one-sided noise power spectral density models.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoiseModel {
    /// Frequency-independent PSD level (strain²/Hz). Used for tests and
    /// idealized studies.
    Flat { level: f64 },
    /// Analytic fit to an advanced-interferometer sensitivity curve:
    ///
    /// `S(f) = s0 · [x^-4.14 − 5x^-2 + 111(1 − x² + x⁴/2)/(1 + x²/2)]`,
    /// `x = f/f0`. Valid above the seismic wall (~10 Hz).
    Analytic { s0: f64, f0: f64 },
}

impl NoiseModel {
    /// One-sided PSD at frequency `f` (Hz).
    pub fn psd(&self, f: f64) -> f64 {
        match *self {
            NoiseModel::Flat { level } => level,
            NoiseModel::Analytic { s0, f0 } => {
                let x = f / f0;
                let x2 = x * x;
                s0 * (x.powf(-4.14) - 5.0 / x2 + 111.0 * (1.0 - x2 + 0.5 * x2 * x2) / (1.0 + 0.5 * x2))
            }
        }
    }
}

/// A single interferometric detector.
#[derive(Debug, Clone)]
pub struct Detector {
    name: String,
    /// Site latitude (rad).
    latitude: f64,
    /// Site longitude (rad).
    longitude: f64,
    /// Azimuth of the first arm, measured from local East toward North (rad).
    arm_azimuth: f64,
    grid: FrequencyGrid,
    noise: NoiseModel,
    /// Fraction of time the detector is operating, in [0, 1].
    duty_factor: f64,
}

/// Site table for preset detectors: (name, lat °, lon °, arm azimuth °,
/// noise model, duty factor).
const PRESETS: &[(&str, f64, f64, f64, NoiseModel, f64)] = &[
    (
        "H1",
        46.455,
        -119.408,
        126.0,
        NoiseModel::Analytic { s0: 1e-49, f0: 215.0 },
        0.85,
    ),
    (
        "L1",
        30.563,
        -90.774,
        198.0,
        NoiseModel::Analytic { s0: 1e-49, f0: 215.0 },
        0.85,
    ),
    (
        "V1",
        43.631,
        10.504,
        71.0,
        NoiseModel::Analytic { s0: 3e-49, f0: 215.0 },
        0.85,
    ),
];

impl Detector {
    pub fn new(
        name: impl Into<String>,
        latitude: f64,
        longitude: f64,
        arm_azimuth: f64,
        grid: FrequencyGrid,
        noise: NoiseModel,
        duty_factor: f64,
    ) -> Result<Self, AppError> {
        if !(0.0..=1.0).contains(&duty_factor) {
            return Err(AppError::new(2, "Detector duty factor must be in [0, 1]."));
        }
        Ok(Self {
            name: name.into(),
            latitude,
            longitude,
            arm_azimuth,
            grid,
            noise,
            duty_factor,
        })
    }

    /// Construct a preset detector on the given frequency grid.
    pub fn preset(name: &str, grid: FrequencyGrid) -> Result<Self, AppError> {
        let entry = PRESETS
            .iter()
            .find(|(preset, ..)| *preset == name)
            .ok_or_else(|| {
                let known: Vec<&str> = PRESETS.iter().map(|(n, ..)| *n).collect();
                AppError::new(
                    2,
                    format!("Unknown detector '{name}'. Known detectors: {}.", known.join(", ")),
                )
            })?;
        let (preset, lat_deg, lon_deg, azimuth_deg, noise, duty) = *entry;
        Detector::new(
            preset,
            lat_deg.to_radians(),
            lon_deg.to_radians(),
            azimuth_deg.to_radians(),
            grid,
            noise,
            duty,
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn arm_azimuth(&self) -> f64 {
        self.arm_azimuth
    }

    pub fn frequency_grid(&self) -> &FrequencyGrid {
        &self.grid
    }

    /// One-sided noise PSD at `f` (Hz).
    pub fn psd(&self, f: f64) -> f64 {
        self.noise.psd(f)
    }

    pub fn duty_factor(&self) -> f64 {
        self.duty_factor
    }
}

/// An ordered detector network with its detection-threshold pair.
#[derive(Debug, Clone)]
pub struct Network {
    detectors: Vec<Detector>,
    /// (individual-detector threshold, network threshold).
    detection_snr: (f64, f64),
}

impl Network {
    pub fn new(detectors: Vec<Detector>, detection_snr: (f64, f64)) -> Result<Self, AppError> {
        if detectors.is_empty() {
            return Err(AppError::new(2, "A network needs at least one detector."));
        }
        Ok(Self {
            detectors,
            detection_snr,
        })
    }

    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    pub fn detection_snr(&self) -> (f64, f64) {
        self.detection_snr
    }

    /// Joined detector names, e.g. `H1_L1_V1`.
    pub fn name(&self) -> String {
        let names: Vec<&str> = self.detectors.iter().map(|d| d.name()).collect();
        names.join("_")
    }

    /// Select a sub-network by detector indices (order preserved).
    pub fn partial(&self, indices: &[usize]) -> Result<Network, AppError> {
        let mut detectors = Vec::with_capacity(indices.len());
        for &i in indices {
            let detector = self.detectors.get(i).ok_or_else(|| {
                AppError::new(
                    2,
                    format!("Sub-network index {i} out of range (network has {} detectors).", self.detectors.len()),
                )
            })?;
            detectors.push(detector.clone());
        }
        Network::new(detectors, self.detection_snr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> FrequencyGrid {
        FrequencyGrid::uniform(20.0, 100.0, 1.0).unwrap()
    }

    #[test]
    fn uniform_grid_covers_range() {
        let g = grid();
        assert_eq!(g.len(), 81);
        assert!((g.values()[0] - 20.0).abs() < 1e-12);
        assert!((g.values()[80] - 100.0).abs() < 1e-12);
        assert!((g.delta_f() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn invalid_grid_is_rejected() {
        assert!(FrequencyGrid::uniform(0.0, 100.0, 1.0).is_err());
        assert!(FrequencyGrid::uniform(100.0, 20.0, 1.0).is_err());
        assert!(FrequencyGrid::uniform(20.0, 100.0, 0.0).is_err());
    }

    #[test]
    fn analytic_psd_is_positive_in_band() {
        let noise = NoiseModel::Analytic { s0: 1e-49, f0: 215.0 };
        for &f in &[15.0, 50.0, 215.0, 1000.0, 4000.0] {
            let s = noise.psd(f);
            assert!(s.is_finite() && s > 0.0, "PSD at {f} Hz should be positive, got {s}");
        }
    }

    #[test]
    fn unknown_preset_is_an_error() {
        let err = Detector::preset("XYZ", grid()).unwrap_err();
        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn partial_network_preserves_order_and_thresholds() {
        let detectors = vec![
            Detector::preset("H1", grid()).unwrap(),
            Detector::preset("L1", grid()).unwrap(),
            Detector::preset("V1", grid()).unwrap(),
        ];
        let network = Network::new(detectors, (4.0, 8.0)).unwrap();

        let sub = network.partial(&[2, 0]).unwrap();
        assert_eq!(sub.name(), "V1_H1");
        assert_eq!(sub.detection_snr(), (4.0, 8.0));

        assert!(network.partial(&[5]).is_err());
    }
}
