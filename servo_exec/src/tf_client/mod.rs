//! # Transform client
//!
//! Provides the rigid transforms between named frames used by visual servoing. Transforms are
//! kept in a [`TfBuffer`], a tree in which every frame has at most one parent, so a transform
//! between any two frames of the same tree can be resolved by chaining edges. The buffer is fed
//! by the [`TfClient`] from the network and by the static transforms in the parameters.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod buffer;
mod client;
mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::eqpt::tf::TransformStamped;
use nalgebra::{Isometry3, Quaternion, Translation3, UnitQuaternion};
use std::time::Duration;

pub use buffer::TfBuffer;
pub use client::{TfClient, TfClientError};
pub use params::TfParams;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A source of transforms between named frames.
pub trait TransformProvider {
    /// Get the pose of `child_frame` expressed in `parent_frame`.
    ///
    /// Blocks for at most `timeout` waiting for the transform to become available.
    fn lookup(
        &self,
        parent_frame: &str,
        child_frame: &str,
        timeout: Duration,
    ) -> Result<Isometry3<f64>, TfError>;
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TfError {
    #[error("Timed out after {timeout_s} s waiting for the transform from {parent} to {child}")]
    Timeout {
        parent: String,
        child: String,
        timeout_s: f64,
    },

    #[error("The transform from {parent} to {child} has an invalid rotation {rotation_q:?}")]
    InvalidRotation {
        parent: String,
        child: String,
        rotation_q: [f64; 4],
    },

    #[error("The transform from {parent} to {child} contains non-finite values")]
    NonFinite { parent: String, child: String },

    #[error("Adding the transform from {parent} to {child} would create a loop in the tree")]
    Loop { parent: String, child: String },

    #[error("Waiting for the transform from {parent} to {child} was interrupted by the shutdown")]
    Interrupted { parent: String, child: String },
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Convert a transform message into an isometry.
///
/// The rotation quaternion is normalised, a zero or non-finite quaternion is rejected.
pub fn to_isometry(tf: &TransformStamped) -> Result<Isometry3<f64>, TfError> {
    let [tx, ty, tz] = tf.translation_m;
    let [qx, qy, qz, qw] = tf.rotation_q;

    if !util::maths::all_finite(&[tx, ty, tz, qx, qy, qz, qw]) {
        return Err(TfError::NonFinite {
            parent: tf.parent_frame.clone(),
            child: tf.child_frame.clone(),
        });
    }

    let rotation = UnitQuaternion::try_new(Quaternion::new(qw, qx, qy, qz), f64::EPSILON)
        .ok_or_else(|| TfError::InvalidRotation {
            parent: tf.parent_frame.clone(),
            child: tf.child_frame.clone(),
            rotation_q: tf.rotation_q,
        })?;

    Ok(Isometry3::from_parts(Translation3::new(tx, ty, tz), rotation))
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Utc;
    use nalgebra::Vector3;

    fn tf(rotation_q: [f64; 4]) -> TransformStamped {
        TransformStamped {
            timestamp: Utc::now(),
            parent_frame: "root".into(),
            child_frame: "marker".into(),
            translation_m: [1.0, 2.0, 3.0],
            rotation_q,
        }
    }

    #[test]
    fn test_to_isometry() {
        // 90 degrees about z, unnormalised
        let s = std::f64::consts::FRAC_1_SQRT_2;
        let iso = to_isometry(&tf([0.0, 0.0, 2.0 * s, 2.0 * s])).unwrap();

        assert_eq!(iso.translation.vector, Vector3::new(1.0, 2.0, 3.0));

        let x = iso.rotation * Vector3::x();
        assert!((x - Vector3::y()).norm() < 1e-12);
    }

    #[test]
    fn test_to_isometry_invalid() {
        assert!(matches!(
            to_isometry(&tf([0.0, 0.0, 0.0, 0.0])),
            Err(TfError::InvalidRotation { .. })
        ));
        assert!(matches!(
            to_isometry(&tf([0.0, f64::NAN, 0.0, 1.0])),
            Err(TfError::NonFinite { .. })
        ));
    }
}
