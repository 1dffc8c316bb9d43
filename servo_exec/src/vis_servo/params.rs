//! Parameters structure for visual servoing

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::VisServoError;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for visual servoing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Params {
    // ---- CONTROL ----
    /// Frame the end effector is driven towards.
    pub target_frame: String,

    /// Proportional gain applied to the position error.
    ///
    /// Units: 1/second
    pub k: f64,

    /// Limit on the commanded linear speed, applied when the target is further from the root
    /// frame than this value.
    ///
    /// Units: meters/second
    pub speed_cap: f64,

    // ---- TIMING ----
    /// Period of the control loop.
    ///
    /// Units: seconds
    #[serde(default = "default_period_s")]
    pub period_s: f64,

    /// Maximum time to wait for each transform.
    ///
    /// Units: seconds
    #[serde(default = "default_lookup_timeout_s")]
    pub lookup_timeout_s: f64,

    /// Time to wait before the first cycle, letting the transforms arrive.
    ///
    /// Units: seconds
    #[serde(default = "default_startup_delay_s")]
    pub startup_delay_s: f64,

    // ---- FRAMES ----
    /// Frame the vision estimate and the target are expressed in.
    #[serde(default = "default_root_frame")]
    pub root_frame: String,

    /// Frame of the marker as estimated by the vision system.
    #[serde(default = "default_marker_frame")]
    pub marker_frame: String,

    /// Frame of the marker as mounted on the arm, the parent of the end effector calibration.
    #[serde(default = "default_marker_link_frame")]
    pub marker_link_frame: String,

    /// Frame of the end effector.
    #[serde(default = "default_end_effector_frame")]
    pub end_effector_frame: String,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Period of the control loop as a duration.
    pub fn period(&self) -> Result<Duration, VisServoError> {
        util::time::period_from_secs(self.period_s)
            .ok_or(VisServoError::InvalidParam("period_s", self.period_s))
    }

    /// Transform lookup timeout as a duration.
    pub fn lookup_timeout(&self) -> Result<Duration, VisServoError> {
        util::time::duration_from_secs(self.lookup_timeout_s)
            .ok_or(VisServoError::InvalidParam("lookup_timeout_s", self.lookup_timeout_s))
    }

    /// Startup delay as a duration.
    pub fn startup_delay(&self) -> Result<Duration, VisServoError> {
        util::time::duration_from_secs(self.startup_delay_s)
            .ok_or(VisServoError::InvalidParam("startup_delay_s", self.startup_delay_s))
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), VisServoError> {
        if !self.k.is_finite() {
            return Err(VisServoError::InvalidParam("k", self.k));
        }

        if !self.speed_cap.is_finite() || self.speed_cap < 0.0 {
            return Err(VisServoError::InvalidParam("speed_cap", self.speed_cap));
        }

        self.period()?;
        self.lookup_timeout()?;
        self.startup_delay()?;

        Ok(())
    }
}

fn default_period_s() -> f64 {
    0.2
}

fn default_lookup_timeout_s() -> f64 {
    5.0
}

fn default_startup_delay_s() -> f64 {
    2.0
}

fn default_root_frame() -> String {
    "root".into()
}

fn default_marker_frame() -> String {
    "end_effector_marker".into()
}

fn default_marker_link_frame() -> String {
    "marker0_link".into()
}

fn default_end_effector_frame() -> String {
    "kinova_end_effector".into()
}
