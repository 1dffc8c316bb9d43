//! Parameters structure for the differential kinematics

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ActuationMode, DiffIkError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the differential kinematics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    // ---- ACTUATION ----
    /// If true the arm is driven with joint trajectories (simulated arm), otherwise with joint
    /// velocities (real arm).
    #[serde(default)]
    pub simulation: bool,

    /// On the real arm, stop updating the joint velocity demand. The last demand keeps being
    /// broadcast.
    #[serde(default)]
    pub debug: bool,

    /// Time given to the simulated arm to reach each waypoint.
    ///
    /// Units: seconds
    #[serde(default = "default_time_to_reach_s")]
    pub time_to_reach_s: f64,

    // ---- TIMING ----
    /// Period at which the joint velocity demand is broadcast to the real arm.
    ///
    /// Units: seconds
    #[serde(default = "default_broadcast_period_s")]
    pub broadcast_period_s: f64,

    /// Maximum time the command handler waits for a command before checking for shutdown.
    ///
    /// Units: seconds
    #[serde(default = "default_cmd_wait_s")]
    pub cmd_wait_s: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// The actuation mode selected by these parameters.
    pub fn actuation_mode(&self) -> ActuationMode {
        match self.simulation {
            true => ActuationMode::Simulation,
            false => ActuationMode::Hardware { debug: self.debug },
        }
    }

    /// Broadcast period as a duration.
    pub fn broadcast_period(&self) -> Result<Duration, DiffIkError> {
        util::time::period_from_secs(self.broadcast_period_s).ok_or(DiffIkError::InvalidParam(
            "broadcast_period_s",
            self.broadcast_period_s,
        ))
    }

    /// Command wait timeout as a duration.
    pub fn cmd_wait(&self) -> Result<Duration, DiffIkError> {
        util::time::period_from_secs(self.cmd_wait_s)
            .ok_or(DiffIkError::InvalidParam("cmd_wait_s", self.cmd_wait_s))
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), DiffIkError> {
        if !self.time_to_reach_s.is_finite() || self.time_to_reach_s <= 0.0 {
            return Err(DiffIkError::InvalidParam(
                "time_to_reach_s",
                self.time_to_reach_s,
            ));
        }

        self.broadcast_period()?;
        self.cmd_wait()?;

        Ok(())
    }
}

impl Default for Params {
    fn default() -> Self {
        Self {
            simulation: false,
            debug: false,
            time_to_reach_s: default_time_to_reach_s(),
            broadcast_period_s: default_broadcast_period_s(),
            cmd_wait_s: default_cmd_wait_s(),
        }
    }
}

fn default_time_to_reach_s() -> f64 {
    0.5
}

fn default_broadcast_period_s() -> f64 {
    0.01
}

fn default_cmd_wait_s() -> f64 {
    0.1
}
