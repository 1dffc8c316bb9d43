//! Network subscriber feeding the transform buffer

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    eqpt::tf::TfMessage,
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};
use log::{debug, error, info, warn};
use std::thread::{self, JoinHandle};
use util::shutdown::Shutdown;

use super::TfBuffer;

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

/// The transform client.
///
/// Runs a background thread which subscribes to the transform publisher and inserts every
/// received transform into a [`TfBuffer`].
pub struct TfClient {
    join_handle: Option<JoinHandle<()>>,
}

#[derive(Debug, thiserror::Error)]
pub enum TfClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not spawn the client thread: {0}")]
    SpawnError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl TfClient {
    /// Connect to the transform publisher and start the client thread.
    ///
    /// The thread stops when `shutdown` is triggered. A socket failure or a panic of the thread
    /// triggers the shutdown.
    pub fn start(
        ctx: &zmq::Context,
        params: &NetParams,
        buffer: TfBuffer,
        shutdown: Shutdown,
    ) -> Result<Self, TfClientError> {
        let socket_options = SocketOptions {
            linger: 1,
            recv_timeout: RECV_TIMEOUT_MS,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::SUB, socket_options, &params.tf_endpoint)
            .map_err(TfClientError::SocketError)?;

        info!("TfClient subscribed to {}", params.tf_endpoint);

        let join_handle = thread::Builder::new()
            .name("tf_client".into())
            .spawn(move || receive_transforms(socket, buffer, shutdown))
            .map_err(TfClientError::SpawnError)?;

        Ok(Self {
            join_handle: Some(join_handle),
        })
    }

    /// Wait for the client thread to finish.
    pub fn join(mut self) {
        if let Some(jh) = self.join_handle.take() {
            if jh.join().is_err() {
                error!("TfClient thread panicked");
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn receive_transforms(socket: MonitoredSocket, buffer: TfBuffer, shutdown: Shutdown) {
    let _guard = shutdown.trigger_on_panic("TfClient");

    while !shutdown.is_triggered() {
        let msg: TfMessage = match socket.recv_json() {
            Ok(Some(m)) => m,
            Ok(None) => continue,
            Err(e @ MonitoredSocketError::DeserializeError(_))
            | Err(e @ MonitoredSocketError::NonUtf8Message) => {
                warn!("Ignoring invalid transform message: {}", e);
                continue;
            }
            Err(e) => {
                error!("TfClient could not receive transforms: {}", e);
                shutdown.trigger(format!("TfClient failed: {}", e));
                break;
            }
        };

        for tf in msg.transforms.iter() {
            if let Err(e) = buffer.set_transform(tf) {
                warn!("Ignoring transform: {}", e);
            }
        }

        debug!("{} transforms received", msg.transforms.len());
    }

    debug!("TfClient stopped");
}
