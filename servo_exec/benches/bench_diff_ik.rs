//! # Differential Kinematics Benchmark

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::f64::consts::{FRAC_PI_2, PI};

use comms_if::eqpt::arm::CartesianVelocity;
use servo_lib::{
    arm_model::{ArmModel, DhParams, Params},
    diff_ik::solve,
    joint_state_client::LatestJointState,
};

fn diff_ik_benchmark(c: &mut Criterion) {
    // ---- Build a six joint arm model ----

    let dh = |a_m, d_m, alpha_rad| DhParams {
        a_m,
        d_m,
        alpha_rad,
        theta_offset_rad: 0.0,
    };

    let model = ArmModel::new(
        Params {
            joint_names: (1..=6).map(|i| format!("joint_{}", i)).collect(),
            dh: vec![
                dh(0.0, 0.2755, FRAC_PI_2),
                dh(0.41, 0.0, PI),
                dh(0.0, -0.0098, FRAC_PI_2),
                dh(0.0, -0.250082, PI / 3.0),
                dh(0.0, -0.085563, PI / 3.0),
                dh(0.0, -0.202782, PI),
            ],
        },
        LatestJointState::default(),
    )
    .unwrap();

    let positions_rad = [0.3, 2.9, 1.1, -2.0, 1.4, 0.0];
    let cmd = CartesianVelocity::linear([0.05, -0.02, 0.01]);

    c.bench_function("ArmModel::jacobian_at", |b| {
        b.iter(|| model.jacobian_at(black_box(&positions_rad)).unwrap())
    });

    let jacobian = model.jacobian_at(&positions_rad).unwrap();

    c.bench_function("diff_ik::solve", |b| {
        b.iter(|| solve(black_box(&jacobian), 6, black_box(&cmd)).unwrap())
    });
}

criterion_group!(benches, diff_ik_benchmark);
criterion_main!(benches);
