//! # Equipment Interface
//!
//! This module defines the interface structures which are exchanged with equipment over the
//! network: the arm (joint states in, trajectories and joint velocities out) and the transform
//! publishers (vision, calibration, targets).

// -----------------------------------------------------------------------------------------------
// MODULES
// -----------------------------------------------------------------------------------------------

pub mod arm;
pub mod tf;
