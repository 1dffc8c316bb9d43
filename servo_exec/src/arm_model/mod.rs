//! # Arm model
//!
//! Kinematic model of the arm as a serial chain of revolute joints described by
//! Denavit-Hartenberg parameters. Provides the current joint positions of the arm group and the
//! geometric Jacobian of the end effector, both expressed in the base frame of the arm.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::arm::JointState;
use nalgebra::{DMatrix, Isometry3, Translation3, UnitQuaternion, Vector3};

pub use params::*;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Provides the state of the arm needed by the differential kinematics.
pub trait RobotStateProvider {
    /// Names of the joints of the arm group, in group order.
    fn joint_names(&self) -> &[String];

    /// Current positions of the joints of the arm group, in group order.
    fn current_joint_positions(&self) -> Result<Vec<f64>, ArmModelError>;

    /// The 6 x N Jacobian of the end effector at the current joint positions.
    ///
    /// Rows 0 to 2 map joint rates onto linear velocity, rows 3 to 5 onto angular velocity.
    fn jacobian(&self) -> Result<DMatrix<f64>, ArmModelError>;
}

/// A source of measured joint states.
pub trait JointStateSource {
    /// The most recently received joint state, if any has been received yet.
    fn latest_joint_state(&self) -> Option<JointState>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Kinematic model of the arm, reading joint positions from a [`JointStateSource`].
pub struct ArmModel<S> {
    params: Params,

    source: S,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ArmModelError {
    #[error("The arm model has {joints} joint names but {dh_rows} sets of DH parameters")]
    DhMismatch { joints: usize, dh_rows: usize },

    #[error("The arm model has no joints")]
    NoJoints,

    #[error("No joint state has been received yet")]
    NoJointState,

    #[error("The joint state does not contain a position for joint {0}")]
    MissingJoint(String),

    #[error("Expected {expected} joint positions, got {found}")]
    WrongNumPositions { expected: usize, found: usize },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<S: JointStateSource> ArmModel<S> {
    /// Create a new model from its parameters and a source of joint states.
    pub fn new(params: Params, source: S) -> Result<Self, ArmModelError> {
        if params.joint_names.is_empty() {
            return Err(ArmModelError::NoJoints);
        }

        if params.joint_names.len() != params.dh.len() {
            return Err(ArmModelError::DhMismatch {
                joints: params.joint_names.len(),
                dh_rows: params.dh.len(),
            });
        }

        Ok(Self { params, source })
    }

    /// Number of joints in the arm group.
    pub fn num_joints(&self) -> usize {
        self.params.joint_names.len()
    }

    /// Get the pose of every link frame in the base frame.
    ///
    /// The first element is the base frame itself (identity), element `i + 1` is the frame of
    /// the link moved by joint `i`. The last element is the end effector.
    pub fn link_frames(&self, positions_rad: &[f64]) -> Result<Vec<Isometry3<f64>>, ArmModelError> {
        self.check_num_positions(positions_rad)?;

        let mut frames = Vec::with_capacity(positions_rad.len() + 1);
        let mut current = Isometry3::identity();
        frames.push(current);

        for (dh, q) in self.params.dh.iter().zip(positions_rad.iter()) {
            current *= dh_transform(dh, *q);
            frames.push(current);
        }

        Ok(frames)
    }

    /// Get the pose of the end effector in the base frame.
    pub fn forward_kinematics(&self, positions_rad: &[f64]) -> Result<Isometry3<f64>, ArmModelError> {
        let frames = self.link_frames(positions_rad)?;

        // There is always at least the base frame
        Ok(frames[frames.len() - 1])
    }

    /// Compute the geometric Jacobian of the end effector at the given joint positions.
    ///
    /// Column `i` is `[z_i x (p_e - p_i), z_i]` where `z_i` and `p_i` are the axis and origin of
    /// joint `i` and `p_e` is the end effector position.
    pub fn jacobian_at(&self, positions_rad: &[f64]) -> Result<DMatrix<f64>, ArmModelError> {
        let frames = self.link_frames(positions_rad)?;
        let n = positions_rad.len();
        let p_e = frames[n].translation.vector;

        let mut jacobian = DMatrix::zeros(6, n);

        for (i, frame) in frames.iter().take(n).enumerate() {
            let z = frame.rotation * Vector3::z();
            let linear = z.cross(&(p_e - frame.translation.vector));

            for r in 0..3 {
                jacobian[(r, i)] = linear[r];
                jacobian[(r + 3, i)] = z[r];
            }
        }

        Ok(jacobian)
    }

    fn check_num_positions(&self, positions_rad: &[f64]) -> Result<(), ArmModelError> {
        if positions_rad.len() != self.num_joints() {
            return Err(ArmModelError::WrongNumPositions {
                expected: self.num_joints(),
                found: positions_rad.len(),
            });
        }

        Ok(())
    }
}

impl<S: JointStateSource> RobotStateProvider for ArmModel<S> {
    fn joint_names(&self) -> &[String] {
        &self.params.joint_names
    }

    fn current_joint_positions(&self) -> Result<Vec<f64>, ArmModelError> {
        let state = self
            .source
            .latest_joint_state()
            .ok_or(ArmModelError::NoJointState)?;

        group_positions(&self.params.joint_names, &state)
    }

    fn jacobian(&self) -> Result<DMatrix<f64>, ArmModelError> {
        self.jacobian_at(&self.current_joint_positions()?)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Extract the positions of the named joints from a joint state, in the order of `joint_names`.
///
/// The state may contain other joints (such as the fingers) in any order.
pub fn group_positions(
    joint_names: &[String],
    state: &JointState,
) -> Result<Vec<f64>, ArmModelError> {
    joint_names
        .iter()
        .map(|name| {
            state
                .names
                .iter()
                .position(|n| n == name)
                .and_then(|idx| state.positions_rad.get(idx))
                .copied()
                .ok_or_else(|| ArmModelError::MissingJoint(name.clone()))
        })
        .collect()
}

/// Transform from the previous link frame to the link frame of a joint.
fn dh_transform(dh: &DhParams, position_rad: f64) -> Isometry3<f64> {
    let theta = position_rad + dh.theta_offset_rad;

    Isometry3::from_parts(
        Translation3::new(0.0, 0.0, dh.d_m),
        UnitQuaternion::from_axis_angle(&Vector3::z_axis(), theta),
    ) * Isometry3::from_parts(
        Translation3::new(dh.a_m, 0.0, 0.0),
        UnitQuaternion::from_axis_angle(&Vector3::x_axis(), dh.alpha_rad),
    )
}

#[cfg(test)]
mod test {
    use super::*;
    use chrono::Utc;
    use std::f64::consts::{FRAC_PI_2, PI};

    struct FixedState(Option<JointState>);

    impl JointStateSource for FixedState {
        fn latest_joint_state(&self) -> Option<JointState> {
            self.0.clone()
        }
    }

    fn names(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("joint_{}", i)).collect()
    }

    /// Six joint arm with the Kinova j2s6s300 geometry.
    fn six_dof_params() -> Params {
        let dh = |a_m, d_m, alpha_rad| DhParams {
            a_m,
            d_m,
            alpha_rad,
            theta_offset_rad: 0.0,
        };

        Params {
            joint_names: names(6),
            dh: vec![
                dh(0.0, 0.2755, FRAC_PI_2),
                dh(0.41, 0.0, PI),
                dh(0.0, -0.0098, FRAC_PI_2),
                dh(0.0, -0.250082, PI / 3.0),
                dh(0.0, -0.085563, PI / 3.0),
                dh(0.0, -0.202782, PI),
            ],
        }
    }

    /// Two link planar arm with unit links.
    fn planar_params() -> Params {
        let dh = DhParams {
            a_m: 1.0,
            ..Default::default()
        };

        Params {
            joint_names: names(2),
            dh: vec![dh, dh],
        }
    }

    #[test]
    fn test_invalid_params() {
        let mut params = planar_params();
        params.dh.pop();
        assert!(matches!(
            ArmModel::new(params, FixedState(None)),
            Err(ArmModelError::DhMismatch {
                joints: 2,
                dh_rows: 1
            })
        ));

        assert!(matches!(
            ArmModel::new(Params::default(), FixedState(None)),
            Err(ArmModelError::NoJoints)
        ));
    }

    #[test]
    fn test_planar_forward_kinematics() {
        let model = ArmModel::new(planar_params(), FixedState(None)).unwrap();

        let ee = model.forward_kinematics(&[0.0, 0.0]).unwrap();
        assert!((ee.translation.vector - Vector3::new(2.0, 0.0, 0.0)).norm() < 1e-12);

        let ee = model.forward_kinematics(&[FRAC_PI_2, -FRAC_PI_2]).unwrap();
        assert!((ee.translation.vector - Vector3::new(1.0, 1.0, 0.0)).norm() < 1e-12);

        assert!(matches!(
            model.forward_kinematics(&[0.0]),
            Err(ArmModelError::WrongNumPositions {
                expected: 2,
                found: 1
            })
        ));
    }

    #[test]
    fn test_planar_jacobian() {
        let model = ArmModel::new(planar_params(), FixedState(None)).unwrap();
        let j = model.jacobian_at(&[0.0, FRAC_PI_2]).unwrap();

        // End effector at (1, 1), joint 1 at the origin, joint 2 at (1, 0)
        #[rustfmt::skip]
        let expected = DMatrix::from_row_slice(6, 2, &[
            -1.0, -1.0,
             1.0,  0.0,
             0.0,  0.0,
             0.0,  0.0,
             0.0,  0.0,
             1.0,  1.0,
        ]);

        assert!((j - expected).abs().max() < 1e-12);
    }

    #[test]
    fn test_jacobian_matches_finite_differences() {
        let model = ArmModel::new(six_dof_params(), FixedState(None)).unwrap();
        let q = [0.3, 2.9, 1.1, -2.0, 1.4, 0.0];
        let h = 1e-6;

        let j = model.jacobian_at(&q).unwrap();
        let ee = model.forward_kinematics(&q).unwrap();

        for i in 0..q.len() {
            let mut q_plus = q;
            let mut q_minus = q;
            q_plus[i] += h;
            q_minus[i] -= h;

            let ee_plus = model.forward_kinematics(&q_plus).unwrap();
            let ee_minus = model.forward_kinematics(&q_minus).unwrap();

            let linear =
                (ee_plus.translation.vector - ee_minus.translation.vector) / (2.0 * h);
            let angular = (ee_plus.rotation * ee.rotation.inverse()).scaled_axis()
                - (ee_minus.rotation * ee.rotation.inverse()).scaled_axis();
            let angular = angular / (2.0 * h);

            for r in 0..3 {
                assert!(
                    (j[(r, i)] - linear[r]).abs() < 1e-6,
                    "linear row {} col {}: {} != {}",
                    r,
                    i,
                    j[(r, i)],
                    linear[r]
                );
                assert!(
                    (j[(r + 3, i)] - angular[r]).abs() < 1e-6,
                    "angular row {} col {}: {} != {}",
                    r,
                    i,
                    j[(r + 3, i)],
                    angular[r]
                );
            }
        }
    }

    #[test]
    fn test_current_positions_reordered() {
        let state = JointState {
            timestamp: Utc::now(),
            names: vec!["finger_1".into(), "joint_2".into(), "joint_1".into()],
            positions_rad: vec![0.7, 0.2, 0.1],
            velocities_rads: vec![],
        };

        let model = ArmModel::new(planar_params(), FixedState(Some(state))).unwrap();

        assert_eq!(model.current_joint_positions().unwrap(), vec![0.1, 0.2]);
        assert_eq!(model.jacobian().unwrap().shape(), (6, 2));
    }

    #[test]
    fn test_missing_state() {
        let model = ArmModel::new(planar_params(), FixedState(None)).unwrap();
        assert!(matches!(
            model.current_joint_positions(),
            Err(ArmModelError::NoJointState)
        ));

        let state = JointState {
            timestamp: Utc::now(),
            names: vec!["joint_1".into()],
            positions_rad: vec![0.1],
            velocities_rads: vec![],
        };
        let model = ArmModel::new(planar_params(), FixedState(Some(state))).unwrap();
        assert!(matches!(
            model.jacobian(),
            Err(ArmModelError::MissingJoint(ref j)) if j == "joint_2"
        ));
    }

    #[test]
    fn test_shipped_params() {
        let params: Params = util::params::load_from_path(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/../params/arm_model.toml"
        ))
        .unwrap();

        let model = ArmModel::new(params, FixedState(None)).unwrap();
        assert_eq!(model.num_joints(), 6);
    }
}
