//! Derivatives of the projected signal with respect to signal parameters.
//!
//! Three parameters have exact rules (the projected signal depends on them
//! through an overall factor): `luminosity_distance`, `geocent_time`, and
//! `phase`. The sky/orientation parameters only enter through the projection,
//! so their finite differences reuse the cached central waveform. Everything
//! else is intrinsic and requires regenerating the waveform at perturbed
//! parameter values.
//!
//! For the intrinsic path, waveforms are generated with the coalescence time
//! set to zero and the true value restored afterwards (time shift on the
//! track, `exp(i·2πf·t_c)` on the projected signal): subtracting two signals
//! that each carry a large common `2πf·t_c` phase would otherwise lose most
//! of the significant digits.

use num_complex::Complex64;

use crate::detection::{project, Detector};
use crate::domain::{names, FisherConfig, ParameterSet};
use crate::error::AppError;
use crate::waveform::{build_waveform, WaveformData, WaveformKind, WaveformModel, WaveformSample};

pub struct Derivative<'a> {
    kind: WaveformKind,
    detector: &'a Detector,
    config: FisherConfig,
    central: ParameterSet,
    model: Box<dyn WaveformModel>,
    /// Central coalescence time.
    tc: f64,
    waveform: Option<WaveformSample>,
    projection: Option<Vec<Complex64>>,
}

impl<'a> Derivative<'a> {
    pub fn new(
        kind: &WaveformKind,
        parameters: &ParameterSet,
        detector: &'a Detector,
        config: FisherConfig,
    ) -> Result<Self, AppError> {
        let tc = parameters.get(names::GEOCENT_TIME)?;
        let model = build_waveform(kind, parameters, &waveform_data(detector, &config))?;
        Ok(Self {
            kind: kind.clone(),
            detector,
            config,
            central: parameters.clone(),
            model,
            tc,
            waveform: None,
            projection: None,
        })
    }

    /// The waveform at the central parameters (computed once, then cached).
    pub fn waveform_at_parameters(&mut self) -> Result<WaveformSample, AppError> {
        if let Some(sample) = &self.waveform {
            return Ok(sample.clone());
        }
        let sample = self.model.strain()?;
        self.waveform = Some(sample.clone());
        Ok(sample)
    }

    /// The projected central signal (computed once, then cached).
    pub fn projection_at_parameters(&mut self) -> Result<Vec<Complex64>, AppError> {
        if let Some(projected) = &self.projection {
            return Ok(projected.clone());
        }
        let sample = self.waveform_at_parameters()?;
        let projected = project(&self.central, self.detector, &sample)?;
        self.projection = Some(projected.clone());
        Ok(projected)
    }

    /// Drop the cached central waveform and projection.
    pub fn invalidate(&mut self) {
        self.waveform = None;
        self.projection = None;
    }

    /// Derivative of the projected signal with respect to `target`.
    pub fn with_respect_to(&mut self, target: &str) -> Result<Vec<Complex64>, AppError> {
        let derivative = match target {
            names::LUMINOSITY_DISTANCE => {
                let distance = self.central.get(target)?;
                let projected = self.projection_at_parameters()?;
                projected.iter().map(|s| -s / distance).collect()
            }
            names::GEOCENT_TIME => {
                let projected = self.projection_at_parameters()?;
                let frequencies = self.detector.frequency_grid().values().to_vec();
                projected
                    .iter()
                    .zip(frequencies)
                    .map(|(s, f)| Complex64::new(0.0, std::f64::consts::TAU * f) * s)
                    .collect()
            }
            names::PHASE => {
                let projected = self.projection_at_parameters()?;
                projected
                    .iter()
                    .map(|s| Complex64::new(0.0, -1.0) * s)
                    .collect()
            }
            _ => self.numeric(target)?,
        };

        // Leave the model back at the central parameters so repeated calls
        // observe consistent state.
        self.model.update_parameters(&self.central);
        Ok(derivative)
    }

    /// Central finite difference, usable for any parameter.
    ///
    /// This is the generic path the analytic rules shortcut; it is public so
    /// the two can be compared against each other.
    pub fn numeric(&mut self, target: &str) -> Result<Vec<Complex64>, AppError> {
        let value = self.central.get(target)?;
        let step = (self.config.fd_eps * value.abs()).max(self.config.fd_eps);

        let low = self.central.with(target, value - 0.5 * step);
        let high = self.central.with(target, value + 0.5 * step);

        if matches!(target, names::RA | names::DEC | names::PSI) {
            // Sky/orientation parameters leave the waveform untouched.
            let sample = self.waveform_at_parameters()?;
            let s_low = project(&low, self.detector, &sample)?;
            let s_high = project(&high, self.detector, &sample)?;
            return Ok(s_high
                .iter()
                .zip(&s_low)
                .map(|(h, l)| (h - l) / step)
                .collect());
        }

        let s_low = self.projected_with_rezeroed_time(&low)?;
        let s_high = self.projected_with_rezeroed_time(&high)?;
        Ok(s_high
            .iter()
            .zip(&s_low)
            .map(|(h, l)| (h - l) / step)
            .collect())
    }

    /// Generate, project, and phase-restore the signal at `parameters`,
    /// with the waveform itself generated at zero coalescence time.
    fn projected_with_rezeroed_time(
        &self,
        parameters: &ParameterSet,
    ) -> Result<Vec<Complex64>, AppError> {
        let tc = parameters.get(names::GEOCENT_TIME)?;
        let rezeroed = parameters.with(names::GEOCENT_TIME, 0.0);

        let model = build_waveform(&self.kind, &rezeroed, &waveform_data(self.detector, &self.config))?;
        let sample = model.strain()?.with_time_shift(tc);
        let projected = project(parameters, self.detector, &sample)?;

        // Restore the 2πf·t_c phase removed by generating at t_c = 0.
        Ok(self
            .detector
            .frequency_grid()
            .values()
            .iter()
            .zip(projected)
            .map(|(&f, s)| Complex64::cis(std::f64::consts::TAU * f * tc) * s)
            .collect())
    }

    pub fn coalescence_time(&self) -> f64 {
        self.tc
    }
}

fn waveform_data(detector: &Detector, config: &FisherConfig) -> WaveformData {
    WaveformData {
        grid: detector.frequency_grid().clone(),
        f_ref: config.f_ref,
    }
}
