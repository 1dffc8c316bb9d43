//! Dispatch of joint deltas to the arm

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use chrono::Utc;
use comms_if::eqpt::arm::{JointTrajectory, JointVelocity, TrajectoryPoint, NUM_ARM_JOINTS};
use log::trace;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard};

use super::DiffIkError;
use crate::arm_client::TrajectorySink;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Sends a joint delta to the arm.
pub trait Actuate {
    /// Apply `delta_rad` to the arm, whose joints are currently at `positions_rad`.
    fn actuate(
        &mut self,
        joint_names: &[String],
        positions_rad: &[f64],
        delta_rad: &DVector<f64>,
    ) -> Result<(), DiffIkError>;
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// How the arm is actuated, fixed for the lifetime of the executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActuationMode {
    /// The simulated arm, driven by position trajectories.
    Simulation,

    /// The real arm, driven by joint velocities broadcast at a fixed rate.
    ///
    /// In `debug` the held velocity is never updated.
    Hardware { debug: bool },
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The joint velocity demand held between the command handler and the broadcaster.
///
/// The whole demand is read and written under a single lock.
#[derive(Clone, Default)]
pub struct HeldVelocity {
    inner: Arc<Mutex<JointVelocity>>,
}

/// Sends each delta as a single waypoint trajectory.
pub struct TrajectoryActuator<S> {
    sink: S,

    time_to_reach_s: f64,
}

/// Writes each delta into the held joint velocity.
pub struct VelocityActuator {
    held: HeldVelocity,

    debug: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ActuationMode {
    /// True if the held joint velocity must be broadcast in this mode.
    pub fn needs_broadcast(&self) -> bool {
        matches!(self, ActuationMode::Hardware { .. })
    }
}

impl HeldVelocity {
    pub fn set(&self, velocity: JointVelocity) {
        *self.lock() = velocity;
    }

    pub fn get(&self) -> JointVelocity {
        *self.lock()
    }

    fn lock(&self) -> MutexGuard<'_, JointVelocity> {
        // Always written whole, so a poisoned value is still consistent
        match self.inner.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl<S: TrajectorySink> TrajectoryActuator<S> {
    pub fn new(sink: S, time_to_reach_s: f64) -> Self {
        Self {
            sink,
            time_to_reach_s,
        }
    }
}

impl<S: TrajectorySink> Actuate for TrajectoryActuator<S> {
    fn actuate(
        &mut self,
        joint_names: &[String],
        positions_rad: &[f64],
        delta_rad: &DVector<f64>,
    ) -> Result<(), DiffIkError> {
        if positions_rad.len() != delta_rad.len() {
            return Err(DiffIkError::WrongNumJoints {
                expected: positions_rad.len(),
                found: delta_rad.len(),
            });
        }

        let target_rad: Vec<f64> = positions_rad
            .iter()
            .zip(delta_rad.iter())
            .map(|(p, d)| p + d)
            .collect();

        trace!("Trajectory waypoint {:?}", target_rad);

        let trajectory = JointTrajectory {
            timestamp: Utc::now(),
            joint_names: joint_names.to_vec(),
            points: vec![TrajectoryPoint::stop_at(target_rad, self.time_to_reach_s)],
        };

        self.sink
            .send_trajectory(&trajectory)
            .map_err(DiffIkError::Actuation)
    }
}

impl VelocityActuator {
    pub fn new(held: HeldVelocity, debug: bool) -> Self {
        Self { held, debug }
    }
}

impl Actuate for VelocityActuator {
    fn actuate(
        &mut self,
        _joint_names: &[String],
        _positions_rad: &[f64],
        delta_rad: &DVector<f64>,
    ) -> Result<(), DiffIkError> {
        if delta_rad.len() != NUM_ARM_JOINTS {
            return Err(DiffIkError::WrongNumJoints {
                expected: NUM_ARM_JOINTS,
                found: delta_rad.len(),
            });
        }

        if self.debug {
            trace!("Debug mode, held velocity not updated");
            return Ok(());
        }

        let mut velocity = JointVelocity::default();
        velocity.joint_rads.copy_from_slice(delta_rad.as_slice());

        self.held.set(velocity);

        Ok(())
    }
}
