//! # Joint State Client
//!
//! Subscribes to the joint states published by the arm driver (or the simulation) and keeps the
//! most recent one available to the arm model.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::arm::JointState,
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};
use log::{debug, error, info, trace, warn};
use std::{
    sync::{Arc, Mutex},
    thread::{self, JoinHandle},
};
use util::shutdown::Shutdown;

use crate::arm_model::JointStateSource;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Receive timeout of the subscriber, bounds how long the client takes to notice a shutdown.
///
/// Units: milliseconds
const RECV_TIMEOUT_MS: i32 = 100;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The joint state client.
pub struct JointStateClient {
    join_handle: Option<JoinHandle<()>>,
}

/// Shared handle onto the most recent joint state received by a [`JointStateClient`].
#[derive(Clone, Default)]
pub struct LatestJointState {
    inner: Arc<Mutex<Option<JointState>>>,
}

#[derive(Debug, thiserror::Error)]
pub enum JointStateClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not spawn the client thread: {0}")]
    SpawnError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl JointStateClient {
    /// Connect to the joint state publisher and start the client thread, which stores every
    /// received state into `latest`.
    ///
    /// The thread stops when `shutdown` is triggered. A socket failure or a panic of the thread
    /// triggers the shutdown.
    pub fn start(
        ctx: &zmq::Context,
        params: &NetParams,
        latest: LatestJointState,
        shutdown: Shutdown,
    ) -> Result<Self, JointStateClientError> {
        let socket_options = SocketOptions {
            linger: 1,
            recv_timeout: RECV_TIMEOUT_MS,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(
            ctx,
            zmq::SUB,
            socket_options,
            &params.joint_state_endpoint,
        )
        .map_err(JointStateClientError::SocketError)?;

        info!(
            "JointStateClient subscribed to {}",
            params.joint_state_endpoint
        );

        let join_handle = thread::Builder::new()
            .name("joint_state_client".into())
            .spawn(move || receive_joint_states(socket, latest, shutdown))
            .map_err(JointStateClientError::SpawnError)?;

        Ok(Self {
            join_handle: Some(join_handle),
        })
    }

    /// Wait for the client thread to finish.
    pub fn join(mut self) {
        if let Some(jh) = self.join_handle.take() {
            if jh.join().is_err() {
                error!("JointStateClient thread panicked");
            }
        }
    }
}

impl LatestJointState {
    /// Replace the latest joint state.
    pub fn set(&self, state: JointState) {
        match self.inner.lock() {
            Ok(mut g) => *g = Some(state),
            Err(poisoned) => *poisoned.into_inner() = Some(state),
        }
    }
}

impl JointStateSource for LatestJointState {
    fn latest_joint_state(&self) -> Option<JointState> {
        match self.inner.lock() {
            Ok(g) => g.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn receive_joint_states(socket: MonitoredSocket, latest: LatestJointState, shutdown: Shutdown) {
    let _guard = shutdown.trigger_on_panic("JointStateClient");

    while !shutdown.is_triggered() {
        let state: JointState = match socket.recv_json() {
            Ok(Some(s)) => s,
            Ok(None) => continue,
            Err(e @ MonitoredSocketError::DeserializeError(_))
            | Err(e @ MonitoredSocketError::NonUtf8Message) => {
                warn!("Ignoring invalid joint state message: {}", e);
                continue;
            }
            Err(e) => {
                error!("JointStateClient could not receive joint states: {}", e);
                shutdown.trigger(format!("JointStateClient failed: {}", e));
                break;
            }
        };

        if state.names.len() != state.positions_rad.len() {
            warn!(
                "Ignoring joint state with {} names and {} positions",
                state.names.len(),
                state.positions_rad.len()
            );
            continue;
        }

        trace!("Joint state received: {:?}", state.positions_rad);

        latest.set(state);
    }

    debug!("JointStateClient stopped");
}
