//! Implementations for the visual servoing state structure

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use nalgebra::{Isometry3, Vector3};
use serde::{Deserialize, Serialize};

// Internal
use super::{Params, VisServoError};
use comms_if::eqpt::arm::CartesianVelocity;
use util::{maths::translation_only, module::State};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Visual servoing module state
#[derive(Default)]
pub struct VisServo {
    pub(crate) params: Option<Params>,

    pub(crate) report: StatusReport,
}

/// Input data to visual servoing, the three transforms observed on this cycle.
#[derive(Debug, Clone, Copy)]
pub struct InputData {
    /// Pose of the marker estimated by the vision system, in the root frame.
    pub vision: Isometry3<f64>,

    /// Pose of the end effector relative to the marker, from the arm calibration.
    pub offset: Isometry3<f64>,

    /// Pose of the target in the root frame.
    pub target: Isometry3<f64>,
}

/// Status report for visual servoing processing.
#[derive(Clone, Copy, Default, Serialize, Deserialize, Debug)]
pub struct StatusReport {
    /// Distance between the end effector and the target, before the gain is applied.
    ///
    /// Units: meters
    pub error_m: f64,

    /// Distance between the root frame and the target, which decides if the speed is capped.
    ///
    /// Units: meters
    pub target_dist_m: f64,

    /// True if the command was limited to the speed cap.
    pub speed_capped: bool,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl State for VisServo {
    type InitData = Params;
    type InitError = VisServoError;

    type InputData = InputData;
    type OutputData = CartesianVelocity;
    type StatusReport = StatusReport;
    type ProcError = VisServoError;

    /// Initialise the visual servoing module.
    ///
    /// Expected init data is the loaded parameters.
    fn init(&mut self, init_data: Self::InitData) -> Result<(), Self::InitError> {
        init_data.validate()?;

        self.params = Some(init_data);
        self.report = StatusReport::default();

        Ok(())
    }

    /// Compute the velocity command driving the end effector towards the target.
    ///
    /// Only the positions are servoed, rotations of both the estimated end effector and the
    /// target are discarded and the angular velocity is always zero.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        let params = self.params.as_ref().ok_or(VisServoError::NotInitialised)?;

        let target = translation_only(&input_data.target);
        let end_effector = translation_only(&(input_data.vision * input_data.offset));

        // Position of the target seen from the end effector
        let error = (end_effector.inverse() * target).translation.vector;
        let mut linear: Vector3<f64> = error * params.k;

        // The cap is checked against the target's distance from the root, not the error
        let target_dist_m = input_data.target.translation.vector.norm();
        let speed_capped = target_dist_m > params.speed_cap;

        if speed_capped {
            let norm = linear.norm();
            linear = if norm > 0.0 {
                linear * (params.speed_cap / norm)
            } else {
                Vector3::zeros()
            };
        }

        self.report = StatusReport {
            error_m: error.norm(),
            target_dist_m,
            speed_capped,
        };

        trace!(
            "VisServo error {:?} m, command {:?} m/s, report {:?}",
            error.as_slice(),
            linear.as_slice(),
            self.report
        );

        Ok((
            CartesianVelocity::linear([linear.x, linear.y, linear.z]),
            self.report,
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nalgebra::{Translation3, UnitQuaternion};

    const TOL: f64 = 1e-12;

    fn params(k: f64, speed_cap: f64) -> Params {
        util::params::from_str(&format!(
            "target_frame = \"target\"\nk = {:?}\nspeed_cap = {:?}",
            k, speed_cap
        ))
        .unwrap()
    }

    fn init(k: f64, speed_cap: f64) -> VisServo {
        let mut vs = VisServo::default();
        vs.init(params(k, speed_cap)).unwrap();
        vs
    }

    fn iso(x: f64, y: f64, z: f64, rpy: [f64; 3]) -> Isometry3<f64> {
        Isometry3::from_parts(
            Translation3::new(x, y, z),
            UnitQuaternion::from_euler_angles(rpy[0], rpy[1], rpy[2]),
        )
    }

    fn linear_norm(cmd: &CartesianVelocity) -> f64 {
        Vector3::from(cmd.linear_ms).norm()
    }

    #[test]
    fn test_uncapped_scenario() {
        // End effector at the root, target 0.4 m further along x than the end effector, but the
        // target itself is only 0.05 m from the root.
        let mut vs = init(0.5, 0.1);
        let input = InputData {
            vision: iso(-0.35, 0.0, 0.0, [0.0; 3]),
            offset: iso(0.0, 0.0, 0.0, [0.0; 3]),
            target: iso(0.05, 0.0, 0.0, [0.0; 3]),
        };

        let (cmd, report) = vs.proc(&input).unwrap();

        assert!((Vector3::from(cmd.linear_ms) - Vector3::new(0.2, 0.0, 0.0)).norm() < TOL);
        assert_eq!(cmd.angular_rads, [0.0; 3]);
        assert!(!report.speed_capped);
        assert!((report.error_m - 0.4).abs() < TOL);
        assert!((report.target_dist_m - 0.05).abs() < TOL);
    }

    #[test]
    fn test_uncapped_magnitude_is_gain_times_error() {
        let mut vs = init(0.8, 10.0);

        for (v, t) in [
            ([0.1, 0.2, 0.3], [0.5, -0.1, 0.2]),
            ([-1.0, 0.4, 0.0], [1.0, 1.0, 1.0]),
            ([0.0, 0.0, 0.0], [0.0, 0.0, 0.0]),
        ] {
            let input = InputData {
                vision: iso(v[0], v[1], v[2], [0.3, 0.0, 1.0]),
                offset: iso(0.0, 0.0, 0.1, [0.0; 3]),
                target: iso(t[0], t[1], t[2], [0.0, 0.5, 0.0]),
            };

            let (cmd, report) = vs.proc(&input).unwrap();

            assert!(!report.speed_capped);
            assert!((linear_norm(&cmd) - 0.8 * report.error_m).abs() < 1e-9);
        }
    }

    #[test]
    fn test_capped_magnitude_and_direction() {
        let mut vs = init(2.0, 0.1);
        let input = InputData {
            vision: iso(0.1, 0.0, 0.2, [0.0; 3]),
            offset: iso(0.0, 0.0, 0.0, [0.0; 3]),
            target: iso(0.4, 0.3, 0.2, [0.0; 3]),
        };

        let (cmd, report) = vs.proc(&input).unwrap();
        let linear = Vector3::from(cmd.linear_ms);

        // Error is (0.3, 0.3, 0.0), so the command points along (1, 1, 0)
        assert!(report.speed_capped);
        assert!((linear.norm() - 0.1).abs() < TOL);
        assert!((linear.normalize() - Vector3::new(1.0, 1.0, 0.0).normalize()).norm() < 1e-9);
    }

    #[test]
    fn test_capped_with_zero_error() {
        let mut vs = init(1.0, 0.1);
        let input = InputData {
            vision: iso(1.0, 0.0, 0.0, [0.0; 3]),
            offset: iso(0.0, 0.0, 0.0, [0.0; 3]),
            target: iso(1.0, 0.0, 0.0, [0.0; 3]),
        };

        let (cmd, report) = vs.proc(&input).unwrap();

        assert!(report.speed_capped);
        assert_eq!(cmd.linear_ms, [0.0; 3]);
    }

    #[test]
    fn test_rotation_discarded() {
        let mut vs = init(1.0, 10.0);
        let straight = InputData {
            vision: iso(0.1, 0.0, 0.0, [0.0; 3]),
            offset: iso(0.0, 0.0, 0.0, [0.0; 3]),
            target: iso(0.5, 0.2, 0.0, [0.0; 3]),
        };
        let rotated = InputData {
            target: iso(0.5, 0.2, 0.0, [1.0, -0.5, 2.0]),
            ..straight
        };

        let (a, _) = vs.proc(&straight).unwrap();
        let (b, _) = vs.proc(&rotated).unwrap();

        assert!((Vector3::from(a.linear_ms) - Vector3::from(b.linear_ms)).norm() < TOL);
        assert_eq!(b.angular_rads, [0.0; 3]);
    }

    #[test]
    fn test_offset_applied_in_marker_frame() {
        // Marker rotated 90 degrees about z, the end effector is 0.1 m along the marker's x axis
        // which is the root's y axis.
        let mut vs = init(1.0, 10.0);
        let input = InputData {
            vision: iso(0.0, 0.0, 0.0, [0.0, 0.0, std::f64::consts::FRAC_PI_2]),
            offset: iso(0.1, 0.0, 0.0, [0.0; 3]),
            target: iso(0.0, 0.0, 0.0, [0.0; 3]),
        };

        let (cmd, _) = vs.proc(&input).unwrap();

        assert!((Vector3::from(cmd.linear_ms) - Vector3::new(0.0, -0.1, 0.0)).norm() < TOL);
    }

    #[test]
    fn test_not_initialised() {
        let mut vs = VisServo::default();
        let input = InputData {
            vision: Isometry3::identity(),
            offset: Isometry3::identity(),
            target: Isometry3::identity(),
        };

        assert!(matches!(
            vs.proc(&input),
            Err(VisServoError::NotInitialised)
        ));
    }
}
