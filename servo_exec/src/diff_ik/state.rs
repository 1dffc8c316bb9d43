//! Differential kinematics solver state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::eqpt::arm::CartesianVelocity;
use log::{debug, trace};
use nalgebra::{DMatrix, DVector};

use super::{Actuate, DiffIkError};
use crate::arm_model::RobotStateProvider;
use util::maths::{all_finite, pseudo_inverse};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Converts Cartesian velocity commands into joint deltas and dispatches them.
pub struct DiffIk<R> {
    robot: R,

    actuator: Box<dyn Actuate + Send>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<R: RobotStateProvider> DiffIk<R> {
    pub fn new(robot: R, actuator: Box<dyn Actuate + Send>) -> Self {
        Self { robot, actuator }
    }

    /// Solve the joint delta for the command at the current arm state and dispatch it.
    ///
    /// Returns the dispatched delta.
    pub fn handle(&mut self, cmd: &CartesianVelocity) -> Result<DVector<f64>, DiffIkError> {
        let positions_rad = self
            .robot
            .current_joint_positions()
            .map_err(DiffIkError::RobotState)?;
        let jacobian = self.robot.jacobian().map_err(DiffIkError::RobotState)?;

        let delta_rad = solve(&jacobian, positions_rad.len(), cmd)?;

        debug!("DiffIk joint delta {:?}", delta_rad.as_slice());

        self.actuator
            .actuate(self.robot.joint_names(), &positions_rad, &delta_rad)?;

        Ok(delta_rad)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Compute the joint delta producing the commanded velocity, using the pseudo-inverse of the
/// Jacobian.
///
/// No damping is applied. A delta containing non-finite values, which a singular Jacobian
/// produces, is returned as an error.
pub fn solve(
    jacobian: &DMatrix<f64>,
    num_joints: usize,
    cmd: &CartesianVelocity,
) -> Result<DVector<f64>, DiffIkError> {
    if jacobian.nrows() != 6 || jacobian.ncols() != num_joints {
        return Err(DiffIkError::JacobianShape {
            rows: jacobian.nrows(),
            cols: jacobian.ncols(),
            num_joints,
        });
    }

    let pinv = pseudo_inverse(jacobian).map_err(DiffIkError::Maths)?;
    let twist = DVector::from_row_slice(&cmd.to_twist());

    let delta_rad = pinv * twist;

    if !all_finite(delta_rad.as_slice()) {
        return Err(DiffIkError::NonFiniteSolution(delta_rad.as_slice().to_vec()));
    }

    trace!("DiffIk solved {:?}", delta_rad.as_slice());

    Ok(delta_rad)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::arm_model::ArmModelError;
    use std::sync::{Arc, Mutex};

    /// Robot with fixed positions and Jacobian.
    struct FixedRobot {
        names: Vec<String>,
        positions: Option<Vec<f64>>,
        jacobian: DMatrix<f64>,
    }

    impl RobotStateProvider for FixedRobot {
        fn joint_names(&self) -> &[String] {
            &self.names
        }

        fn current_joint_positions(&self) -> Result<Vec<f64>, ArmModelError> {
            self.positions.clone().ok_or(ArmModelError::NoJointState)
        }

        fn jacobian(&self) -> Result<DMatrix<f64>, ArmModelError> {
            Ok(self.jacobian.clone())
        }
    }

    /// Records every delta it is asked to apply.
    #[derive(Clone, Default)]
    struct RecordingActuator {
        deltas: Arc<Mutex<Vec<Vec<f64>>>>,
    }

    impl Actuate for RecordingActuator {
        fn actuate(
            &mut self,
            _joint_names: &[String],
            _positions_rad: &[f64],
            delta_rad: &DVector<f64>,
        ) -> Result<(), DiffIkError> {
            self.deltas
                .lock()
                .unwrap()
                .push(delta_rad.as_slice().to_vec());
            Ok(())
        }
    }

    #[rustfmt::skip]
    fn full_rank_jacobian() -> DMatrix<f64> {
        DMatrix::from_row_slice(6, 6, &[
            0.0, -0.4, 0.1,  0.0, 0.0,  0.0,
            0.5,  0.0, 0.0,  0.2, 0.0,  0.0,
            0.0,  0.3, 0.3,  0.0, 0.1,  0.0,
            0.0,  0.0, 0.0,  1.0, 0.0,  0.3,
            0.0,  1.0, 1.0,  0.0, 0.5,  0.0,
            1.0,  0.0, 0.0,  0.0, 0.0,  1.0,
        ])
    }

    /// Rank 5, with an exactly zero singular value.
    fn singular_jacobian() -> DMatrix<f64> {
        DMatrix::from_diagonal(&DVector::from_vec(vec![0.5, 0.4, 0.3, 1.0, 1.0, 0.0]))
    }

    fn robot(jacobian: DMatrix<f64>) -> FixedRobot {
        FixedRobot {
            names: (1..=6).map(|i| format!("joint_{}", i)).collect(),
            positions: Some(vec![0.0; 6]),
            jacobian,
        }
    }

    #[test]
    fn test_solution_reproduces_command() {
        let j = full_rank_jacobian();
        let cmd = CartesianVelocity::linear([0.05, -0.02, 0.01]);

        let delta = solve(&j, 6, &cmd).unwrap();
        let twist = &j * delta;

        for (t, c) in twist.iter().zip(cmd.to_twist().iter()) {
            assert!((t - c).abs() < 1e-9);
        }
    }

    #[test]
    fn test_singular_jacobian_rejected() {
        let res = solve(&singular_jacobian(), 6, &CartesianVelocity::linear([0.05, 0.0, 0.0]));

        assert!(matches!(res, Err(DiffIkError::NonFiniteSolution(_))));
    }

    #[test]
    fn test_jacobian_shape_checked() {
        let j = DMatrix::zeros(6, 5);

        assert!(matches!(
            solve(&j, 6, &CartesianVelocity::default()),
            Err(DiffIkError::JacobianShape {
                rows: 6,
                cols: 5,
                num_joints: 6
            })
        ));
    }

    #[test]
    fn test_handle_dispatches_delta() {
        let actuator = RecordingActuator::default();
        let mut diff_ik = DiffIk::new(robot(full_rank_jacobian()), Box::new(actuator.clone()));

        let delta = diff_ik
            .handle(&CartesianVelocity::linear([0.0, 0.0, 0.1]))
            .unwrap();

        let deltas = actuator.deltas.lock().unwrap();
        assert_eq!(deltas.len(), 1);
        assert_eq!(deltas[0], delta.as_slice().to_vec());
    }

    #[test]
    fn test_handle_does_not_dispatch_on_error() {
        let actuator = RecordingActuator::default();

        let mut diff_ik = DiffIk::new(robot(singular_jacobian()), Box::new(actuator.clone()));
        assert!(matches!(
            diff_ik.handle(&CartesianVelocity::linear([0.0, 0.0, 0.1])),
            Err(DiffIkError::NonFiniteSolution(_))
        ));

        let mut no_state = robot(full_rank_jacobian());
        no_state.positions = None;
        let mut diff_ik = DiffIk::new(no_state, Box::new(actuator.clone()));
        assert!(matches!(
            diff_ik.handle(&CartesianVelocity::default()),
            Err(DiffIkError::RobotState(ArmModelError::NoJointState))
        ));

        assert!(actuator.deltas.lock().unwrap().is_empty());
    }
}
