//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::{DMatrix, Isometry3, UnitQuaternion, SVD};
use thiserror::Error;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum MathsError {
    #[error("The singular value decomposition did not produce the {0} matrix")]
    MissingSvdFactor(&'static str),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the pseudo-inverse of a matrix from its thin singular value decomposition.
///
/// For `M = U * S * V^t` this returns `V * S^-1 * U^t`. Every singular value is inverted,
/// including zero ones, so a rank deficient matrix gives a result containing infinite or NaN
/// elements. No tolerance or damping is applied.
pub fn pseudo_inverse(matrix: &DMatrix<f64>) -> Result<DMatrix<f64>, MathsError> {
    let svd = SVD::new(matrix.clone(), true, true);

    let u = svd.u.ok_or(MathsError::MissingSvdFactor("U"))?;
    let v_t = svd.v_t.ok_or(MathsError::MissingSvdFactor("V^t"))?;
    let s_inv = DMatrix::from_diagonal(&svd.singular_values.map(|s| 1.0 / s));

    Ok(v_t.transpose() * s_inv * u.transpose())
}

/// Return the transform with its rotation replaced by the identity.
pub fn translation_only(transform: &Isometry3<f64>) -> Isometry3<f64> {
    Isometry3::from_parts(transform.translation, UnitQuaternion::identity())
}

/// Return true if every element of the slice is finite.
pub fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}
