//! SVD-based pseudo-inversion of information matrices.
//!
//! Fisher matrices mix parameters whose natural scales differ by many orders
//! of magnitude (seconds vs. radians vs. megaparsecs), which makes a direct
//! inverse numerically fragile. We therefore:
//!
//! - rescale the matrix to unit diagonal before decomposing
//! - truncate singular values at a configurable threshold
//! - rescale the truncated pseudo-inverse back
//!
//! Truncation intentionally discards near-null directions instead of failing:
//! the result is a biased but stable covariance. Callers that need to know how
//! much was discarded can inspect the returned singular values.

use nalgebra::{DMatrix, DVector};

use crate::error::AppError;

/// Pseudo-invert a symmetric information matrix.
///
/// Returns the pseudo-inverse and the singular values of the unit-diagonal
/// normalized matrix (for diagnostics). Singular values at or below
/// `threshold` are dropped from the reconstruction.
///
/// A non-positive diagonal entry gets a unit normalizer, so an all-zero row
/// stays zero in the output instead of turning into NaN.
pub fn invert_svd(
    matrix: &DMatrix<f64>,
    threshold: f64,
) -> Result<(DMatrix<f64>, DVector<f64>), AppError> {
    let n = matrix.nrows();
    if n == 0 || matrix.ncols() != n {
        return Err(AppError::new(
            4,
            format!(
                "Cannot invert a {}x{} matrix; expected square non-empty.",
                matrix.nrows(),
                matrix.ncols()
            ),
        ));
    }
    if !(threshold.is_finite() && threshold >= 0.0) {
        return Err(AppError::new(2, "Invalid singular-value threshold."));
    }

    // Unit-diagonal normalization: divide by the outer product of the
    // root-diagonal.
    let mut scale = DVector::<f64>::zeros(n);
    for i in 0..n {
        let d = matrix[(i, i)];
        scale[i] = if d > 0.0 { d.sqrt() } else { 1.0 };
    }

    let mut normalized = matrix.clone();
    for i in 0..n {
        for j in 0..n {
            normalized[(i, j)] /= scale[i] * scale[j];
        }
    }

    let svd = normalized.svd(true, true);
    let u = svd
        .u
        .as_ref()
        .ok_or_else(|| AppError::new(4, "SVD did not produce left singular vectors."))?;
    let v_t = svd
        .v_t
        .as_ref()
        .ok_or_else(|| AppError::new(4, "SVD did not produce right singular vectors."))?;
    let singular_values = DVector::from_iterator(n, svd.singular_values.iter().copied());

    // Truncated pseudo-inverse of the normalized matrix.
    let mut inverse = DMatrix::<f64>::zeros(n, n);
    for r in 0..n {
        let s = singular_values[r];
        if s <= threshold {
            continue;
        }
        let u_col = u.column(r);
        let v_row = v_t.row(r);
        for i in 0..n {
            for j in 0..n {
                inverse[(i, j)] += u_col[i] * v_row[j] / s;
            }
        }
    }

    // Denormalize by the same outer-product scaling.
    for i in 0..n {
        for j in 0..n {
            inverse[(i, j)] /= scale[i] * scale[j];
        }
    }

    Ok((inverse, singular_values))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn max_abs_diff(a: &DMatrix<f64>, b: &DMatrix<f64>) -> f64 {
        (a - b).iter().fold(0.0_f64, |acc, v| acc.max(v.abs()))
    }

    #[test]
    fn well_conditioned_matrix_round_trips_to_identity() {
        let m = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.5, 1.0, 3.0, 0.2, 0.5, 0.2, 5.0]);
        let (inv, singular_values) = invert_svd(&m, 1e-10).unwrap();

        let product = &m * &inv;
        let identity = DMatrix::<f64>::identity(3, 3);
        assert!(
            max_abs_diff(&product, &identity) < 1e-10,
            "M * pinv(M) should be the identity for well-conditioned input"
        );
        assert!(singular_values.iter().all(|&s| s > 1e-10));
    }

    #[test]
    fn wildly_different_scales_still_invert() {
        // Diagonal scales differing by 12 orders of magnitude: a naive inverse
        // of the unnormalized matrix would lose most of its accuracy.
        let m = DMatrix::from_row_slice(
            2,
            2,
            &[1e12, 3e5, 3e5, 1e-4],
        );
        let (inv, _) = invert_svd(&m, 1e-10).unwrap();

        let product = &m * &inv;
        let identity = DMatrix::<f64>::identity(2, 2);
        assert!(max_abs_diff(&product, &identity) < 1e-6);
    }

    #[test]
    fn near_singular_directions_are_truncated() {
        // Rank-1 matrix: one unit singular value, one at zero.
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let (inv, singular_values) = invert_svd(&m, 1e-10).unwrap();

        let kept = singular_values.iter().filter(|&&s| s > 1e-10).count();
        assert_eq!(kept, 1);

        // The pseudo-inverse of the normalized rank-1 projector is itself
        // rank-1; applying M twice through it reproduces M.
        let product = &m * &inv * &m;
        assert!(max_abs_diff(&product, &m) < 1e-10);
    }

    #[test]
    fn zero_matrix_yields_zero_covariance_not_nan() {
        let m = DMatrix::<f64>::zeros(3, 3);
        let (inv, _) = invert_svd(&m, 1e-10).unwrap();
        assert!(inv.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn empty_matrix_is_an_error() {
        let m = DMatrix::<f64>::zeros(0, 0);
        assert!(invert_svd(&m, 1e-10).is_err());
    }
}
