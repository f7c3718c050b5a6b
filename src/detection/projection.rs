//! Projection of a waveform onto a detector, and noise-weighted products.
//!
//! The projection applies, per frequency bin and at the epoch the signal
//! sweeps through that bin:
//!
//! - the interferometer antenna response `F+`, `F×` (time-dependent through
//!   Earth rotation)
//! - the geocentric time delay of the site
//!
//! `scalar_product` and `snr_contributions` are the noise-weighting
//! collaborators of the Fisher engine; both return per-bin arrays and leave
//! the frequency sum to the caller.

use num_complex::Complex64;

use crate::detection::Detector;
use crate::domain::{names, ParameterSet};
use crate::error::AppError;
use crate::waveform::WaveformSample;

/// Mean Earth radius (m).
const EARTH_RADIUS_M: f64 = 6.371e6;
/// Sidereal day (s).
const SIDEREAL_DAY_S: f64 = 86_164.0905;
/// Speed of light (m/s).
const C_M_S: f64 = 299_792_458.0;

type Vec3 = [f64; 3];

fn dot(a: Vec3, b: Vec3) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn combine(ca: f64, a: Vec3, cb: f64, b: Vec3) -> Vec3 {
    [
        ca * a[0] + cb * b[0],
        ca * a[1] + cb * b[1],
        ca * a[2] + cb * b[2],
    ]
}

/// Earth rotation angle at epoch `t` (s). The phase origin is arbitrary but
/// fixed, which is all the antenna-pattern evolution needs.
fn earth_rotation_angle(t: f64) -> f64 {
    std::f64::consts::TAU * (t / SIDEREAL_DAY_S).rem_euclid(1.0)
}

/// Local east/north/up unit vectors of the site in the celestial frame at
/// epoch `t`.
fn site_basis(detector: &Detector, t: f64) -> (Vec3, Vec3, Vec3) {
    let lat = detector.latitude();
    // Rotating the Earth-fixed frame by the rotation angle is the same as
    // shifting the site longitude.
    let lon = detector.longitude() + earth_rotation_angle(t);

    let east = [-lon.sin(), lon.cos(), 0.0];
    let north = [-lat.sin() * lon.cos(), -lat.sin() * lon.sin(), lat.cos()];
    let up = [lat.cos() * lon.cos(), lat.cos() * lon.sin(), lat.sin()];
    (east, north, up)
}

/// Antenna response `(F+, F×)` of the detector to a source at `(ra, dec)`
/// with polarization angle `psi`, at epoch `t`.
pub fn antenna_pattern(detector: &Detector, ra: f64, dec: f64, psi: f64, t: f64) -> (f64, f64) {
    let (east, north, _) = site_basis(detector, t);
    let gamma = detector.arm_azimuth();
    let arm_x = combine(gamma.cos(), east, gamma.sin(), north);
    let arm_y = combine(-gamma.sin(), east, gamma.cos(), north);

    let theta = std::f64::consts::FRAC_PI_2 - dec;
    let e_theta = [
        theta.cos() * ra.cos(),
        theta.cos() * ra.sin(),
        -theta.sin(),
    ];
    let e_phi = [-ra.sin(), ra.cos(), 0.0];

    let l = combine(psi.cos(), e_theta, psi.sin(), e_phi);
    let m = combine(-psi.sin(), e_theta, psi.cos(), e_phi);

    // Contract the detector tensor D = (x⊗x − y⊗y)/2 with the polarization
    // tensors; D_ab l_a l_b = ((x·l)² − (y·l)²)/2 and similarly for cross.
    let xl = dot(arm_x, l);
    let yl = dot(arm_y, l);
    let xm = dot(arm_x, m);
    let ym = dot(arm_y, m);

    let f_plus = 0.5 * ((xl * xl - yl * yl) - (xm * xm - ym * ym));
    let f_cross = (xl * xm) - (yl * ym);
    (f_plus, f_cross)
}

/// Geocentric time delay (s) of the site for a source at `(ra, dec)`, at
/// epoch `t`. Positive when the site is closer to the source than the
/// geocenter.
pub fn time_delay(detector: &Detector, ra: f64, dec: f64, t: f64) -> f64 {
    let (_, _, up) = site_basis(detector, t);
    let source = [dec.cos() * ra.cos(), dec.cos() * ra.sin(), dec.sin()];
    EARTH_RADIUS_M * dot(up, source) / C_M_S
}

/// Project a waveform sample onto the detector.
///
/// Antenna response and time delay are evaluated at the time-of-frequency
/// epoch of each bin, so long-lived signals pick up Earth-rotation modulation.
pub fn project(
    parameters: &ParameterSet,
    detector: &Detector,
    sample: &WaveformSample,
) -> Result<Vec<Complex64>, AppError> {
    let grid = detector.frequency_grid();
    if sample.len() != grid.len() || sample.time_track.len() != grid.len() {
        return Err(AppError::new(
            4,
            format!(
                "Waveform sample length {} does not match the detector grid length {}.",
                sample.len(),
                grid.len()
            ),
        ));
    }

    let ra = parameters.get(names::RA)?;
    let dec = parameters.get(names::DEC)?;
    let psi = parameters.get(names::PSI)?;

    let mut projected = Vec::with_capacity(grid.len());
    for (i, &f) in grid.values().iter().enumerate() {
        let t = sample.time_track[i];
        let (f_plus, f_cross) = antenna_pattern(detector, ra, dec, psi, t);
        let delay = time_delay(detector, ra, dec, t);
        let phase = Complex64::cis(-std::f64::consts::TAU * f * delay);
        projected.push((f_plus * sample.plus[i] + f_cross * sample.cross[i]) * phase);
    }
    Ok(projected)
}

/// Per-bin noise-weighted inner product `4·Δf·Re(a·conj(b))/S_n(f)`.
///
/// The caller sums over frequency to get the scalar product.
pub fn scalar_product(
    a: &[Complex64],
    b: &[Complex64],
    detector: &Detector,
) -> Result<Vec<f64>, AppError> {
    let grid = detector.frequency_grid();
    if a.len() != grid.len() || b.len() != grid.len() {
        return Err(AppError::new(
            4,
            format!(
                "Scalar-product operands ({}, {}) do not match the detector grid length {}.",
                a.len(),
                b.len(),
                grid.len()
            ),
        ));
    }

    let df = grid.delta_f();
    Ok(grid
        .values()
        .iter()
        .enumerate()
        .map(|(i, &f)| 4.0 * df * (a[i] * b[i].conj()).re / detector.psd(f))
        .collect())
}

/// Per-bin SNR contributions of a projected signal; the squares sum to SNR².
///
/// With `use_duty_cycle`, contributions are derated by the detector duty
/// factor (expected-value derating, so evaluation stays deterministic).
pub fn snr_contributions(
    detector: &Detector,
    signal: &[Complex64],
    use_duty_cycle: bool,
) -> Result<Vec<f64>, AppError> {
    let weighted = scalar_product(signal, signal, detector)?;
    let factor = if use_duty_cycle {
        detector.duty_factor()
    } else {
        1.0
    };
    Ok(weighted
        .iter()
        .map(|&w| (w.max(0.0) * factor).sqrt())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::{FrequencyGrid, NoiseModel};

    fn flat_detector(level: f64) -> Detector {
        Detector::new(
            "T1",
            0.64,
            -2.08,
            2.2,
            FrequencyGrid::uniform(20.0, 100.0, 1.0).unwrap(),
            NoiseModel::Flat { level },
            0.5,
        )
        .unwrap()
    }

    fn sky_parameters() -> ParameterSet {
        ParameterSet::from_pairs([(names::RA, 1.2), (names::DEC, -0.5), (names::PSI, 0.7)])
    }

    fn constant_sample(n: usize, value: Complex64) -> WaveformSample {
        WaveformSample {
            plus: vec![value; n],
            cross: vec![value; n],
            time_track: vec![1000.0; n],
        }
    }

    #[test]
    fn antenna_response_is_bounded() {
        let det = flat_detector(1.0);
        for i in 0..8 {
            for j in 0..6 {
                let ra = i as f64 * std::f64::consts::TAU / 8.0;
                let dec = -1.4 + j as f64 * 0.56;
                let (fp, fc) = antenna_pattern(&det, ra, dec, 0.3, 12345.0);
                assert!(fp.abs() <= 1.0 + 1e-12, "F+ out of range: {fp}");
                assert!(fc.abs() <= 1.0 + 1e-12, "Fx out of range: {fc}");
            }
        }
    }

    #[test]
    fn antenna_response_is_periodic_in_a_sidereal_day() {
        let det = flat_detector(1.0);
        let (fp0, fc0) = antenna_pattern(&det, 0.9, 0.2, 0.1, 5000.0);
        let (fp1, fc1) = antenna_pattern(&det, 0.9, 0.2, 0.1, 5000.0 + SIDEREAL_DAY_S);
        assert!((fp0 - fp1).abs() < 1e-9);
        assert!((fc0 - fc1).abs() < 1e-9);
    }

    #[test]
    fn time_delay_is_within_light_travel_radius() {
        let det = flat_detector(1.0);
        let bound = EARTH_RADIUS_M / C_M_S;
        for &t in &[0.0, 3000.0, 40000.0] {
            let delay = time_delay(&det, 2.0, 0.4, t);
            assert!(delay.abs() <= bound + 1e-12);
        }
    }

    #[test]
    fn scalar_product_flat_noise_closed_form() {
        let det = flat_detector(2.0);
        let n = det.frequency_grid().len();
        let a = vec![Complex64::new(3.0, 4.0); n];

        let weighted = scalar_product(&a, &a, &det).unwrap();
        // |a|² = 25, df = 1, S = 2 -> per-bin 4·25/2 = 50.
        for w in weighted {
            assert!((w - 50.0).abs() < 1e-12);
        }
    }

    #[test]
    fn scalar_product_is_linear_in_first_argument() {
        let det = flat_detector(1.0);
        let n = det.frequency_grid().len();
        let a: Vec<Complex64> = (0..n).map(|i| Complex64::new(i as f64, 1.0)).collect();
        let b: Vec<Complex64> = (0..n).map(|i| Complex64::new(0.5, i as f64 * 0.1)).collect();
        let sum_ab: f64 = scalar_product(&a, &b, &det).unwrap().iter().sum();

        let doubled: Vec<Complex64> = a.iter().map(|v| v * 2.0).collect();
        let sum_2ab: f64 = scalar_product(&doubled, &b, &det).unwrap().iter().sum();
        assert!((sum_2ab - 2.0 * sum_ab).abs() < 1e-9 * sum_ab.abs().max(1.0));
    }

    #[test]
    fn snr_squares_sum_to_weighted_power() {
        let det = flat_detector(1.0);
        let sample = constant_sample(det.frequency_grid().len(), Complex64::new(1e-23, 0.0));
        let signal = project(&sky_parameters(), &det, &sample).unwrap();

        let expected: f64 = scalar_product(&signal, &signal, &det).unwrap().iter().sum();
        let snr_sq: f64 = snr_contributions(&det, &signal, false)
            .unwrap()
            .iter()
            .map(|s| s * s)
            .sum();
        assert!((snr_sq - expected).abs() < 1e-9 * expected.abs().max(1e-30));
    }

    #[test]
    fn duty_cycle_derates_snr_squared() {
        let det = flat_detector(1.0);
        let sample = constant_sample(det.frequency_grid().len(), Complex64::new(1e-23, 0.0));
        let signal = project(&sky_parameters(), &det, &sample).unwrap();

        let full: f64 = snr_contributions(&det, &signal, false)
            .unwrap()
            .iter()
            .map(|s| s * s)
            .sum();
        let derated: f64 = snr_contributions(&det, &signal, true)
            .unwrap()
            .iter()
            .map(|s| s * s)
            .sum();
        assert!((derated - 0.5 * full).abs() < 1e-9 * full.max(1e-30));
    }

    #[test]
    fn mismatched_lengths_are_an_error() {
        let det = flat_detector(1.0);
        let short = vec![Complex64::new(1.0, 0.0); 3];
        assert!(scalar_product(&short, &short, &det).is_err());

        let sample = constant_sample(3, Complex64::new(1.0, 0.0));
        assert!(project(&sky_parameters(), &det, &sample).is_err());
    }
}
