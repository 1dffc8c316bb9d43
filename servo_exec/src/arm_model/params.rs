//! Parameters structure for the arm model

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the arm model.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Params {
    /// Names of the joints of the arm group, from the base to the end effector.
    ///
    /// Joint states, trajectories and velocity demands all use this order.
    pub joint_names: Vec<String>,

    /// Standard Denavit-Hartenberg parameters of each joint, in the same order as
    /// `joint_names`. All joints are revolute.
    pub dh: Vec<DhParams>,
}

/// Standard Denavit-Hartenberg parameters for one revolute joint.
///
/// The transform from the previous link frame is `Rz(theta) * Tz(d) * Tx(a) * Rx(alpha)`,
/// where `theta` is the joint position plus `theta_offset_rad`.
#[derive(Debug, Default, Clone, Copy, Serialize, Deserialize)]
pub struct DhParams {
    /// Link length.
    ///
    /// Units: meters
    pub a_m: f64,

    /// Link offset.
    ///
    /// Units: meters
    pub d_m: f64,

    /// Link twist.
    ///
    /// Units: radians
    pub alpha_rad: f64,

    /// Offset added to the joint position to get the DH angle.
    ///
    /// Units: radians
    #[serde(default)]
    pub theta_offset_rad: f64,
}
