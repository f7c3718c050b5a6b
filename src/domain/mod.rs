//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the immutable signal parameter map (`ParameterSet`)
//! - well-known parameter names (`names`)
//! - numerical configuration with documented defaults (`FisherConfig`)
//! - the resolved run configuration (`RunConfig`)

pub mod types;

pub use types::*;
