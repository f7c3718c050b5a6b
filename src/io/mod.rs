//! Output helpers.
//!
//! - errors text report + JSON results export (`export`)

pub mod export;

pub use export::*;
