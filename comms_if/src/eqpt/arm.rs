//! # Arm Equipment Messages

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Number of joints accepted by the arm's joint velocity interface.
pub const NUM_ARM_JOINTS: usize = 6;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// A Cartesian velocity command for the end effector.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct CartesianVelocity {
    /// Linear velocity.
    ///
    /// Units: meters/second
    pub linear_ms: [f64; 3],

    /// Angular velocity.
    ///
    /// Units: radians/second
    pub angular_rads: [f64; 3],
}

/// Joint positions reported by the arm.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JointState {
    /// Time the state was measured.
    pub timestamp: DateTime<Utc>,

    /// Names of the joints, in the same order as `positions_rad`.
    pub names: Vec<String>,

    /// Joint positions.
    ///
    /// Units: radians
    pub positions_rad: Vec<f64>,

    /// Joint velocities, may be empty if the arm doesn't report them.
    ///
    /// Units: radians/second
    #[serde(default)]
    pub velocities_rads: Vec<f64>,
}

/// A joint space trajectory for the arm's position trajectory controller.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct JointTrajectory {
    /// Time the trajectory was issued.
    pub timestamp: DateTime<Utc>,

    /// Names of the joints, in the order used by every point.
    pub joint_names: Vec<String>,

    /// Waypoints to pass through.
    pub points: Vec<TrajectoryPoint>,
}

/// A single waypoint of a [`JointTrajectory`].
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TrajectoryPoint {
    /// Units: radians
    pub positions_rad: Vec<f64>,

    /// Units: radians/second
    pub velocities_rads: Vec<f64>,

    /// Units: radians/second^2
    pub accelerations_rads2: Vec<f64>,

    /// Units: newton meters
    pub efforts_nm: Vec<f64>,

    /// Time after the trajectory's timestamp at which the point shall be reached.
    ///
    /// Units: seconds
    pub time_from_start_s: f64,
}

/// Joint velocity demand for the real arm.
///
/// The arm's driver expects this to be sent at a fixed rate and stops if it isn't.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq)]
pub struct JointVelocity {
    /// Units: radians/second
    pub joint_rads: [f64; NUM_ARM_JOINTS],
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CartesianVelocity {
    /// Build a purely linear velocity command.
    pub fn linear(linear_ms: [f64; 3]) -> Self {
        Self {
            linear_ms,
            angular_rads: [0.0; 3],
        }
    }

    /// Get the command as a `[vx, vy, vz, wx, wy, wz]` twist.
    pub fn to_twist(&self) -> [f64; 6] {
        let l = self.linear_ms;
        let a = self.angular_rads;
        [l[0], l[1], l[2], a[0], a[1], a[2]]
    }
}

impl TrajectoryPoint {
    /// Build a point which stops at the given positions, with zero velocity, acceleration and
    /// effort.
    pub fn stop_at(positions_rad: Vec<f64>, time_from_start_s: f64) -> Self {
        let n = positions_rad.len();

        Self {
            positions_rad,
            velocities_rads: vec![0.0; n],
            accelerations_rads2: vec![0.0; n],
            efforts_nm: vec![0.0; n],
            time_from_start_s,
        }
    }
}
