//! # Visual servoing module
//!
//! Drives the end effector towards a visually tracked target. On each cycle the pose of the end
//! effector is estimated from the vision system's marker estimate and the calibrated offset
//! between the marker and the end effector, the position error to the target is scaled by a
//! proportional gain and the resulting linear velocity is sent to the differential kinematics.
//!
//! Failing to look up any of the transforms is fatal: the shutdown is triggered and no further
//! commands are sent. A lookup failing because the shutdown was triggered elsewhere simply ends
//! the loop.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::arm::CartesianVelocity;
use log::{debug, info};
use std::sync::mpsc::Sender;
use util::{cycle::run_cyclic, module::State, shutdown::Shutdown};

use crate::tf_client::{TfError, TransformProvider};

pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur during visual servoing.
#[derive(Debug, thiserror::Error)]
pub enum VisServoError {
    #[error("Invalid value for parameter {0}: {1}")]
    InvalidParam(&'static str, f64),

    #[error("Visual servoing has not been initialised")]
    NotInitialised,

    #[error("Transform unavailable: {0}")]
    TransformUnavailable(TfError),

    #[error("The velocity command channel is closed")]
    ChannelClosed,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Run the visual servoing loop until the shutdown is triggered or an error occurs.
///
/// Every command is sent on `cmd_tx`. An error triggers the shutdown before being returned.
pub fn run<P: TransformProvider>(
    params: Params,
    tf: &P,
    cmd_tx: Sender<CartesianVelocity>,
    shutdown: &Shutdown,
) -> Result<(), VisServoError> {
    let _guard = shutdown.trigger_on_panic("VisServo");

    let period = params.period()?;
    let lookup_timeout = params.lookup_timeout()?;
    let startup_delay = params.startup_delay()?;

    let mut vis_servo = VisServo::default();
    vis_servo.init(params.clone())?;

    info!(
        "VisServo driving {} towards {} every {:.03} s",
        params.end_effector_frame, params.target_frame, params.period_s
    );

    if shutdown.wait_timeout(startup_delay) {
        return Ok(());
    }

    let lookup = |parent: &str, child: &str| {
        tf.lookup(parent, child, lookup_timeout)
            .map_err(VisServoError::TransformUnavailable)
    };

    let read_input = || -> Result<InputData, VisServoError> {
        Ok(InputData {
            vision: lookup(&params.root_frame, &params.marker_frame)?,
            offset: lookup(&params.marker_link_frame, &params.end_effector_frame)?,
            target: lookup(&params.root_frame, &params.target_frame)?,
        })
    };

    run_cyclic("VisServo", period, shutdown, || {
        let input = match read_input() {
            Ok(i) => i,
            Err(_) if shutdown.is_triggered() => return Ok(()),
            Err(e) => return Err(e),
        };

        let (cmd, report) = vis_servo.proc(&input)?;

        debug!(
            "VisServo command {:?} m/s (error {:.04} m, capped {})",
            cmd.linear_ms, report.error_m, report.speed_capped
        );

        cmd_tx.send(cmd).map_err(|_| VisServoError::ChannelClosed)
    })
}
