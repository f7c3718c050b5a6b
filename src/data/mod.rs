//! Signal-catalog input.
//!
//! - CSV catalog ingest + validation (`catalog`)
//! - seeded synthetic population generation (`sample`)

pub mod catalog;
pub mod sample;

pub use catalog::*;
pub use sample::*;
