//! # Arm Client
//!
//! Publishes actuation demands to the arm. The simulated arm is driven by joint trajectories sent
//! to its position trajectory controller, the real arm by joint velocity demands which its driver
//! expects at a fixed rate.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::arm::{JointTrajectory, JointVelocity},
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};
use log::info;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Send timeout of the publishers.
///
/// Units: milliseconds
const SEND_TIMEOUT_MS: i32 = 10;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A destination for joint trajectories.
pub trait TrajectorySink {
    fn send_trajectory(&mut self, trajectory: &JointTrajectory) -> Result<(), ArmClientError>;
}

/// A destination for joint velocity demands.
pub trait JointVelocitySink {
    fn send_joint_velocity(&mut self, velocity: &JointVelocity) -> Result<(), ArmClientError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Publishes joint trajectories to the simulated arm.
pub struct TrajectoryPublisher {
    socket: MonitoredSocket,
}

/// Publishes joint velocity demands to the real arm.
pub struct JointVelocityPublisher {
    socket: MonitoredSocket,
}

#[derive(Debug, thiserror::Error)]
pub enum ArmClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send the demand: {0}")]
    SendError(MonitoredSocketError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TrajectoryPublisher {
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, ArmClientError> {
        let socket = publisher(ctx, &params.trajectory_endpoint)?;

        info!(
            "TrajectoryPublisher bound to {}",
            params.trajectory_endpoint
        );

        Ok(Self { socket })
    }
}

impl TrajectorySink for TrajectoryPublisher {
    fn send_trajectory(&mut self, trajectory: &JointTrajectory) -> Result<(), ArmClientError> {
        self.socket
            .send_json(trajectory)
            .map_err(ArmClientError::SendError)
    }
}

impl JointVelocityPublisher {
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, ArmClientError> {
        let socket = publisher(ctx, &params.joint_velocity_endpoint)?;

        info!(
            "JointVelocityPublisher bound to {}",
            params.joint_velocity_endpoint
        );

        Ok(Self { socket })
    }
}

impl JointVelocitySink for JointVelocityPublisher {
    fn send_joint_velocity(&mut self, velocity: &JointVelocity) -> Result<(), ArmClientError> {
        self.socket
            .send_json(velocity)
            .map_err(ArmClientError::SendError)
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn publisher(ctx: &zmq::Context, endpoint: &str) -> Result<MonitoredSocket, ArmClientError> {
    let socket_options = SocketOptions {
        bind: true,
        linger: 1,
        send_timeout: SEND_TIMEOUT_MS,
        ..Default::default()
    };

    MonitoredSocket::new(ctx, zmq::PUB, socket_options, endpoint)
        .map_err(ArmClientError::SocketError)
}
