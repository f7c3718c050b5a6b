//! The Fisher-matrix engine.
//!
//! Responsibilities:
//!
//! - waveform derivatives with respect to signal parameters (`derivative`)
//! - symmetric information-matrix assembly per detector (`matrix`)
//! - network aggregation, detection thresholds, and sky localization
//!   (`network`)

pub mod derivative;
pub mod matrix;
pub mod network;

pub use derivative::*;
pub use matrix::*;
pub use network::*;
