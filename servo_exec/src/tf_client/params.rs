//! Parameters structure for the transform client

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::tf::TransformStamped;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the transform client.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct TfParams {
    /// Transforms which never change, such as the calibrated offset between the marker and the
    /// end effector. Inserted into the buffer once at startup.
    #[serde(default)]
    pub static_transforms: Vec<TransformStamped>,
}
