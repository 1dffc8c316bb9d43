//! # Servoing library.
//!
//! This library allows the executable, the benchmarks and other crates in the workspace to
//! access items defined inside the servoing crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Arm client - publishes trajectories and joint velocities to the arm
pub mod arm_client;

/// Arm model - joint positions and Jacobian of the arm
pub mod arm_model;

/// Differential kinematics module - converts Cartesian velocities into joint space demands
pub mod diff_ik;

/// Joint state client - receives the joint states of the arm
pub mod joint_state_client;

/// Transform client - keeps the transforms between frames up to date
pub mod tf_client;

/// Visual servoing module - drives the end effector towards the tracked target
pub mod vis_servo;
