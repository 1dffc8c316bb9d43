//! # Transform Messages
//!
//! Rigid transforms between named frames, as published by the vision system and by the
//! calibration tools.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The pose of `child_frame` expressed in `parent_frame`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TransformStamped {
    /// Time the transform was observed. Static transforms may omit it.
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    pub parent_frame: String,

    pub child_frame: String,

    /// Position of the child frame origin in the parent frame.
    ///
    /// Units: meters
    pub translation_m: [f64; 3],

    /// Rotation from the parent frame into the child frame as a `[x, y, z, w]` quaternion.
    pub rotation_q: [f64; 4],
}

/// A batch of transforms published together.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq)]
pub struct TfMessage {
    pub transforms: Vec<TransformStamped>,
}
