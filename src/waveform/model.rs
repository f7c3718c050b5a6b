//! Waveform model trait and its concrete implementations.
//!
//! Two variants are provided:
//!
//! - [`InspiralModel`]: a closed-form frequency-domain compact-binary chirp
//!   (leading-order amplitude, reference-frequency phase convention, analytic
//!   time-of-frequency track)
//! - [`SampledModel`]: strain backed by precomputed template arrays, standing
//!   in for waveforms produced by an external library
//!
//! Both produce a [`WaveformSample`] aligned to a detector frequency grid.

use std::sync::Arc;

use num_complex::Complex64;

use crate::detection::FrequencyGrid;
use crate::domain::{names, ParameterSet};
use crate::error::AppError;

/// `G·M_sun/c³` in seconds.
const GMSUN_S: f64 = 4.925490947641267e-6;
/// One megaparsec in metres.
const MPC_M: f64 = 3.0856775814913673e22;
/// Speed of light (m/s).
const C_M_S: f64 = 299_792_458.0;

/// Auxiliary data a waveform model is built with.
#[derive(Debug, Clone)]
pub struct WaveformData {
    pub grid: FrequencyGrid,
    /// Reference frequency (Hz) at which the inspiral phase term is zeroed.
    pub f_ref: f64,
}

/// A frequency-domain strain evaluated on a detector grid, with the parallel
/// time-of-frequency track used for time-dependent projection.
#[derive(Debug, Clone)]
pub struct WaveformSample {
    pub plus: Vec<Complex64>,
    pub cross: Vec<Complex64>,
    /// Epoch (s) at which the signal sweeps through each frequency bin.
    pub time_track: Vec<f64>,
}

impl WaveformSample {
    pub fn len(&self) -> usize {
        self.plus.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plus.is_empty()
    }

    /// Copy with the time track shifted by `dt` seconds.
    pub fn with_time_shift(&self, dt: f64) -> WaveformSample {
        WaveformSample {
            plus: self.plus.clone(),
            cross: self.cross.clone(),
            time_track: self.time_track.iter().map(|t| t + dt).collect(),
        }
    }
}

/// A parametrized frequency-domain waveform source.
pub trait WaveformModel {
    /// Evaluate the strain (both polarizations) and its time track at the
    /// currently stored parameters.
    fn strain(&self) -> Result<WaveformSample, AppError>;

    /// The time-of-frequency track alone.
    fn time_track(&self) -> Result<Vec<f64>, AppError>;

    /// Replace the stored parameters.
    fn update_parameters(&mut self, parameters: &ParameterSet);
}

/// Which waveform implementation to instantiate.
#[derive(Clone)]
pub enum WaveformKind {
    Inspiral,
    Sampled(Arc<SampledTemplate>),
}

/// Instantiate a waveform model for the given parameters and grid.
pub fn build_waveform(
    kind: &WaveformKind,
    parameters: &ParameterSet,
    data: &WaveformData,
) -> Result<Box<dyn WaveformModel>, AppError> {
    match kind {
        WaveformKind::Inspiral => Ok(Box::new(InspiralModel::new(
            parameters.clone(),
            data.grid.clone(),
            data.f_ref,
        )?)),
        WaveformKind::Sampled(template) => Ok(Box::new(SampledModel::new(
            template.clone(),
            parameters.clone(),
        )?)),
    }
}

/// Closed-form frequency-domain inspiral.
///
/// Restricted (leading-order) amplitude with the stationary-phase chirp phase
///
/// `Ψ(f) = 2πf·t_c − φ_c − π/4 + (3/128)·(u^-5/3 − u_ref^-5/3)`, `u = πℳf`
///
/// where `ℳ` is the chirp mass in seconds. The post-Newtonian term vanishes
/// at the reference frequency, so `phase` is the merger phase referenced
/// there. The time track is the stationary-phase relation
/// `t(f) = t_c − (5/256)·ℳ·u^-8/3`.
pub struct InspiralModel {
    parameters: ParameterSet,
    grid: FrequencyGrid,
    f_ref: f64,
}

impl InspiralModel {
    pub fn new(parameters: ParameterSet, grid: FrequencyGrid, f_ref: f64) -> Result<Self, AppError> {
        if !(f_ref.is_finite() && f_ref > 0.0) {
            return Err(AppError::new(2, "Reference frequency must be positive."));
        }
        Ok(Self {
            parameters,
            grid,
            f_ref,
        })
    }

    /// Chirp mass in seconds, from component masses in solar masses.
    fn chirp_time_scale(&self) -> Result<f64, AppError> {
        let m1 = self.parameters.get(names::MASS_1)?;
        let m2 = self.parameters.get(names::MASS_2)?;
        if !(m1.is_finite() && m2.is_finite() && m1 > 0.0 && m2 > 0.0) {
            return Err(AppError::new(4, format!("Non-physical component masses: {m1}, {m2}.")));
        }
        let chirp_mass = (m1 * m2).powf(0.6) / (m1 + m2).powf(0.2);
        Ok(chirp_mass * GMSUN_S)
    }
}

impl WaveformModel for InspiralModel {
    fn strain(&self) -> Result<WaveformSample, AppError> {
        let mc = self.chirp_time_scale()?;
        let distance = self.parameters.get(names::LUMINOSITY_DISTANCE)?;
        if !(distance.is_finite() && distance > 0.0) {
            return Err(AppError::new(4, format!("Non-physical luminosity distance: {distance}.")));
        }
        let tc = self.parameters.get(names::GEOCENT_TIME)?;
        let phase = self.parameters.get(names::PHASE)?;
        let theta_jn = self.parameters.get(names::THETA_JN)?;

        let cos_iota = theta_jn.cos();
        let plus_factor = 0.5 * (1.0 + cos_iota * cos_iota);
        let cross_factor = cos_iota;

        let amp_scale = (5.0 / 24.0_f64).sqrt()
            * std::f64::consts::PI.powf(-2.0 / 3.0)
            * mc.powf(5.0 / 6.0)
            * C_M_S
            / (distance * MPC_M);

        let u_ref = std::f64::consts::PI * mc * self.f_ref;
        let psi_ref = (3.0 / 128.0) * u_ref.powf(-5.0 / 3.0);

        let n = self.grid.len();
        let mut plus = Vec::with_capacity(n);
        let mut cross = Vec::with_capacity(n);
        let mut time_track = Vec::with_capacity(n);

        for &f in self.grid.values() {
            let u = std::f64::consts::PI * mc * f;
            let psi = 2.0 * std::f64::consts::PI * f * tc - phase - std::f64::consts::FRAC_PI_4
                + (3.0 / 128.0) * u.powf(-5.0 / 3.0)
                - psi_ref;
            let amp = amp_scale * f.powf(-7.0 / 6.0);

            let h = amp * Complex64::cis(psi);
            plus.push(plus_factor * h);
            // The cross polarization leads by a quarter cycle.
            cross.push(cross_factor * h * Complex64::cis(std::f64::consts::FRAC_PI_2));
            time_track.push(tc - (5.0 / 256.0) * mc * u.powf(-8.0 / 3.0));
        }

        Ok(WaveformSample {
            plus,
            cross,
            time_track,
        })
    }

    fn time_track(&self) -> Result<Vec<f64>, AppError> {
        let mc = self.chirp_time_scale()?;
        let tc = self.parameters.get(names::GEOCENT_TIME)?;
        Ok(self
            .grid
            .values()
            .iter()
            .map(|&f| {
                let u = std::f64::consts::PI * mc * f;
                tc - (5.0 / 256.0) * mc * u.powf(-8.0 / 3.0)
            })
            .collect())
    }

    fn update_parameters(&mut self, parameters: &ParameterSet) {
        self.parameters = parameters.clone();
    }
}

/// Precomputed strain arrays with the parameter values they were generated at.
///
/// Stands in for an external waveform library: the intrinsic shape is fixed,
/// while distance, merger phase, and coalescence time are re-applied
/// analytically on evaluation.
pub struct SampledTemplate {
    pub grid: FrequencyGrid,
    pub plus: Vec<Complex64>,
    pub cross: Vec<Complex64>,
    pub time_track: Vec<f64>,
    /// Parameters the template arrays were generated at.
    pub reference: ParameterSet,
}

impl SampledTemplate {
    pub fn new(
        grid: FrequencyGrid,
        plus: Vec<Complex64>,
        cross: Vec<Complex64>,
        time_track: Vec<f64>,
        reference: ParameterSet,
    ) -> Result<Self, AppError> {
        let n = grid.len();
        if plus.len() != n || cross.len() != n || time_track.len() != n {
            return Err(AppError::new(
                2,
                format!(
                    "Template arrays ({}, {}, {}) do not match the grid length {n}.",
                    plus.len(),
                    cross.len(),
                    time_track.len()
                ),
            ));
        }
        Ok(Self {
            grid,
            plus,
            cross,
            time_track,
            reference,
        })
    }
}

/// Sample-backed waveform model.
///
/// Only `luminosity_distance`, `phase`, and `geocent_time` respond to
/// parameter updates; other intrinsic parameters are frozen into the template
/// arrays, so their numerical derivatives vanish under this model.
pub struct SampledModel {
    template: Arc<SampledTemplate>,
    parameters: ParameterSet,
}

impl SampledModel {
    pub fn new(template: Arc<SampledTemplate>, parameters: ParameterSet) -> Result<Self, AppError> {
        Ok(Self {
            template,
            parameters,
        })
    }
}

impl WaveformModel for SampledModel {
    fn strain(&self) -> Result<WaveformSample, AppError> {
        let d_ref = self.template.reference.get(names::LUMINOSITY_DISTANCE)?;
        let phase_ref = self.template.reference.get(names::PHASE)?;
        let tc_ref = self.template.reference.get(names::GEOCENT_TIME)?;

        let d = self.parameters.get(names::LUMINOSITY_DISTANCE)?;
        if !(d.is_finite() && d > 0.0) {
            return Err(AppError::new(4, format!("Non-physical luminosity distance: {d}.")));
        }
        let phase = self.parameters.get(names::PHASE)?;
        let tc = self.parameters.get(names::GEOCENT_TIME)?;

        let amplitude_ratio = d_ref / d;
        let dphase = phase - phase_ref;
        let dt = tc - tc_ref;

        let n = self.template.grid.len();
        let mut plus = Vec::with_capacity(n);
        let mut cross = Vec::with_capacity(n);
        let mut time_track = Vec::with_capacity(n);

        for (i, &f) in self.template.grid.values().iter().enumerate() {
            // Phase convention matches the inspiral model: exp(-i·phase) and
            // exp(+2πi·f·t_c).
            let shift = Complex64::cis(2.0 * std::f64::consts::PI * f * dt - dphase) * amplitude_ratio;
            plus.push(self.template.plus[i] * shift);
            cross.push(self.template.cross[i] * shift);
            time_track.push(self.template.time_track[i] + dt);
        }

        Ok(WaveformSample {
            plus,
            cross,
            time_track,
        })
    }

    fn time_track(&self) -> Result<Vec<f64>, AppError> {
        let tc_ref = self.template.reference.get(names::GEOCENT_TIME)?;
        let dt = self.parameters.get(names::GEOCENT_TIME)? - tc_ref;
        Ok(self.template.time_track.iter().map(|t| t + dt).collect())
    }

    fn update_parameters(&mut self, parameters: &ParameterSet) {
        self.parameters = parameters.clone();
    }
}
