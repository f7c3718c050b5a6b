//! Synthetic signal population generation.
//!
//! Populations are drawn from simple, seeded distributions: Gaussian component
//! masses (clamped to a physical window), uniform distances, isotropic sky
//! positions and orientations. The same seed always produces the same catalog.

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{names, ParameterSet};
use crate::error::AppError;

/// Knobs of the synthetic population.
#[derive(Debug, Clone)]
pub struct PopulationConfig {
    pub count: usize,
    pub seed: u64,

    /// Gaussian component-mass distribution (solar masses), clamped to
    /// `[mass_min, mass_max]`.
    pub mass_mean: f64,
    pub mass_sigma: f64,
    pub mass_min: f64,
    pub mass_max: f64,

    /// Uniform luminosity-distance window (Mpc).
    pub distance_min: f64,
    pub distance_max: f64,

    /// Coalescence times are drawn uniformly from
    /// `[base_time, base_time + time_window]` (GPS seconds).
    pub base_time: f64,
    pub time_window: f64,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self {
            count: 100,
            seed: 42,
            mass_mean: 30.0,
            mass_sigma: 5.0,
            mass_min: 5.0,
            mass_max: 80.0,
            distance_min: 100.0,
            distance_max: 2000.0,
            base_time: 1.4e9,
            time_window: 86_400.0,
        }
    }
}

/// Generate a seeded synthetic population.
pub fn generate_population(config: &PopulationConfig) -> Result<Vec<ParameterSet>, AppError> {
    if config.count == 0 {
        return Err(AppError::new(2, "Population count must be > 0."));
    }
    if !(config.mass_min.is_finite()
        && config.mass_max.is_finite()
        && config.mass_min > 0.0
        && config.mass_max > config.mass_min)
    {
        return Err(AppError::new(2, "Invalid mass window for population generation."));
    }
    if !(config.mass_sigma.is_finite() && config.mass_sigma > 0.0 && config.mass_mean.is_finite()) {
        return Err(AppError::new(2, "Invalid mass distribution settings."));
    }
    if !(config.distance_min.is_finite()
        && config.distance_max.is_finite()
        && config.distance_min > 0.0
        && config.distance_max > config.distance_min)
    {
        return Err(AppError::new(2, "Invalid distance window for population generation."));
    }
    if !(config.base_time.is_finite() && config.time_window.is_finite() && config.time_window >= 0.0) {
        return Err(AppError::new(2, "Invalid coalescence-time settings."));
    }

    let mut rng = StdRng::seed_from_u64(config.seed);
    let mass_distribution = Normal::new(config.mass_mean, config.mass_sigma)
        .map_err(|e| AppError::new(4, format!("Mass distribution error: {e}")))?;

    let mut signals = Vec::with_capacity(config.count);
    for _ in 0..config.count {
        let mut m1: f64 = mass_distribution
            .sample(&mut rng)
            .clamp(config.mass_min, config.mass_max);
        let mut m2: f64 = mass_distribution
            .sample(&mut rng)
            .clamp(config.mass_min, config.mass_max);
        if m2 > m1 {
            std::mem::swap(&mut m1, &mut m2);
        }

        let distance = rng.gen_range(config.distance_min..=config.distance_max);
        let ra = rng.gen_range(0.0..std::f64::consts::TAU);
        // Isotropic in the sky: uniform in sin(dec) and cos(theta_jn).
        let dec = rng.gen_range(-1.0..=1.0_f64).asin();
        let theta_jn = rng.gen_range(-1.0..=1.0_f64).acos();
        let psi = rng.gen_range(0.0..std::f64::consts::PI);
        let phase = rng.gen_range(0.0..std::f64::consts::TAU);
        let geocent_time = config.base_time
            + if config.time_window > 0.0 {
                rng.gen_range(0.0..config.time_window)
            } else {
                0.0
            };

        signals.push(ParameterSet::from_pairs([
            (names::MASS_1, m1),
            (names::MASS_2, m2),
            (names::LUMINOSITY_DISTANCE, distance),
            (names::RA, ra),
            (names::DEC, dec),
            (names::THETA_JN, theta_jn),
            (names::PSI, psi),
            (names::PHASE, phase),
            (names::GEOCENT_TIME, geocent_time),
        ]));
    }

    Ok(signals)
}

/// Parameter column order used for catalogs produced by the generator.
pub fn population_parameter_names() -> Vec<String> {
    [
        names::MASS_1,
        names::MASS_2,
        names::LUMINOSITY_DISTANCE,
        names::RA,
        names::DEC,
        names::THETA_JN,
        names::PSI,
        names::PHASE,
        names::GEOCENT_TIME,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
