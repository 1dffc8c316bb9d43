//! # Differential kinematics module
//!
//! Converts the Cartesian velocity commands from visual servoing into joint space. Each command
//! is solved against the Jacobian at the current arm state using its pseudo-inverse, and the
//! resulting joint delta is dispatched according to the [`ActuationMode`]:
//!
//! - `Simulation`: the delta is added to the current positions and sent as a single waypoint
//!   trajectory.
//! - `Hardware`: the delta replaces the held joint velocity, which the broadcaster publishes at a
//!   fixed rate whether or not new commands arrive.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod actuation;
mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::arm::CartesianVelocity;
use log::{debug, error, info};
use std::{
    sync::mpsc::{Receiver, RecvTimeoutError},
    time::Duration,
};
use util::{cycle::run_cyclic, maths::MathsError, shutdown::Shutdown};

use crate::{
    arm_client::{ArmClientError, JointVelocitySink},
    arm_model::{ArmModelError, RobotStateProvider},
};

pub use actuation::*;
pub use params::*;
pub use state::*;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors that can occur in the differential kinematics.
#[derive(Debug, thiserror::Error)]
pub enum DiffIkError {
    #[error("Invalid value for parameter {0}: {1}")]
    InvalidParam(&'static str, f64),

    #[error("Could not get the arm state: {0}")]
    RobotState(ArmModelError),

    #[error("Expected a 6 x {num_joints} Jacobian, got {rows} x {cols}")]
    JacobianShape {
        rows: usize,
        cols: usize,
        num_joints: usize,
    },

    #[error("Could not invert the Jacobian: {0}")]
    Maths(MathsError),

    #[error("The joint delta is not finite, the Jacobian is singular: {0:?}")]
    NonFiniteSolution(Vec<f64>),

    #[error("Expected {expected} joints, got {found}")]
    WrongNumJoints { expected: usize, found: usize },

    #[error("Could not send the demand to the arm: {0}")]
    Actuation(ArmClientError),

    #[error("The velocity command channel is closed")]
    ChannelClosed,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Handle velocity commands until the shutdown is triggered or an error occurs.
///
/// The handler waits at most `cmd_wait` for a command before checking for shutdown. When
/// several commands are queued only the most recent is handled. An error or a panic triggers the
/// shutdown.
pub fn run_handler<R: RobotStateProvider>(
    diff_ik: &mut DiffIk<R>,
    cmd_rx: &Receiver<CartesianVelocity>,
    cmd_wait: Duration,
    shutdown: &Shutdown,
) -> Result<(), DiffIkError> {
    let _guard = shutdown.trigger_on_panic("DiffIk");

    info!("DiffIk handler started");

    while !shutdown.is_triggered() {
        let mut cmd = match cmd_rx.recv_timeout(cmd_wait) {
            Ok(c) => c,
            Err(RecvTimeoutError::Timeout) => continue,
            // Senders stop only once the shutdown is triggered
            Err(RecvTimeoutError::Disconnected) if shutdown.is_triggered() => break,
            Err(RecvTimeoutError::Disconnected) => {
                return Err(fail(shutdown, DiffIkError::ChannelClosed))
            }
        };

        let mut skipped = 0;
        while let Ok(c) = cmd_rx.try_recv() {
            cmd = c;
            skipped += 1;
        }

        if skipped > 0 {
            debug!("DiffIk skipped {} stale commands", skipped);
        }

        if let Err(e) = diff_ik.handle(&cmd) {
            return Err(fail(shutdown, e));
        }
    }

    debug!("DiffIk handler stopped");

    Ok(())
}

/// Publish the held joint velocity every `period` until the shutdown is triggered or an error
/// occurs.
pub fn run_broadcaster<S: JointVelocitySink>(
    held: &HeldVelocity,
    sink: &mut S,
    period: Duration,
    shutdown: &Shutdown,
) -> Result<(), DiffIkError> {
    let _guard = shutdown.trigger_on_panic("Broadcaster");

    info!(
        "Joint velocity broadcaster started at {:.01} Hz",
        1.0 / period.as_secs_f64()
    );

    run_cyclic("Broadcaster", period, shutdown, || {
        sink.send_joint_velocity(&held.get())
            .map_err(DiffIkError::Actuation)
    })
}

fn fail(shutdown: &Shutdown, e: DiffIkError) -> DiffIkError {
    error!("DiffIk failed: {}", e);
    shutdown.trigger(format!("DiffIk failed: {}", e));
    e
}
