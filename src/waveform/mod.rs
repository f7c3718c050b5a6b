//! Frequency-domain waveform models.
//!
//! Models are implemented behind the [`WaveformModel`] trait so the Fisher
//! engine can stay generic over where strain comes from: a closed-form
//! evaluation or precomputed sample arrays.

pub mod model;

pub use model::*;
