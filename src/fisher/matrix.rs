//! Symmetric information-matrix assembly for one detector/signal pair.

use nalgebra::DMatrix;

use crate::detection::{scalar_product, Detector};
use crate::domain::{FisherConfig, ParameterSet};
use crate::error::AppError;
use crate::fisher::Derivative;
use crate::waveform::WaveformKind;

/// The Fisher information matrix over an ordered parameter list.
///
/// The matrix is built lazily on first access and cached; `set_matrix` allows
/// replacing it with a hand-constructed one (useful in tests and for replaying
/// stored matrices).
pub struct FisherMatrix<'a> {
    fisher_parameters: Vec<String>,
    detector: &'a Detector,
    derivative: Derivative<'a>,
    matrix: Option<DMatrix<f64>>,
}

impl std::fmt::Debug for FisherMatrix<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FisherMatrix")
            .field("fisher_parameters", &self.fisher_parameters)
            .field("matrix", &self.matrix)
            .finish_non_exhaustive()
    }
}

impl<'a> FisherMatrix<'a> {
    pub fn new(
        kind: &WaveformKind,
        parameters: &ParameterSet,
        fisher_parameters: &[String],
        detector: &'a Detector,
        config: FisherConfig,
    ) -> Result<Self, AppError> {
        if fisher_parameters.is_empty() {
            return Err(AppError::new(2, "Fisher parameter list must not be empty."));
        }
        let derivative = Derivative::new(kind, parameters, detector, config)?;
        Ok(Self {
            fisher_parameters: fisher_parameters.to_vec(),
            detector,
            derivative,
            matrix: None,
        })
    }

    pub fn fisher_parameters(&self) -> &[String] {
        &self.fisher_parameters
    }

    /// The information matrix, computing it on first access.
    pub fn get_or_compute(&mut self) -> Result<DMatrix<f64>, AppError> {
        if let Some(matrix) = &self.matrix {
            return Ok(matrix.clone());
        }
        let matrix = self.compute()?;
        self.matrix = Some(matrix.clone());
        Ok(matrix)
    }

    /// Replace the cached matrix.
    pub fn set_matrix(&mut self, matrix: DMatrix<f64>) {
        self.matrix = Some(matrix);
    }

    fn compute(&mut self) -> Result<DMatrix<f64>, AppError> {
        let n = self.fisher_parameters.len();

        // One derivative per parameter; every unordered pair reuses them.
        let parameter_names = self.fisher_parameters.clone();
        let mut derivatives = Vec::with_capacity(n);
        for name in &parameter_names {
            derivatives.push(self.derivative.with_respect_to(name)?);
        }

        let mut matrix = DMatrix::<f64>::zeros(n, n);
        for i in 0..n {
            for j in i..n {
                let weighted = scalar_product(&derivatives[i], &derivatives[j], self.detector)?;
                let value: f64 = weighted.iter().sum();
                matrix[(i, j)] = value;
                matrix[(j, i)] = value;
            }
        }
        Ok(matrix)
    }
}
