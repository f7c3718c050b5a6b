//! Mathematical utilities: robust pseudo-inversion of information matrices.

pub mod inversion;

pub use inversion::*;
