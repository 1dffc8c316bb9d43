//! Arm visual servoing executable entry point.
//!
//! # Architecture
//!
//! The executable runs three control threads sharing a single shutdown signal:
//!
//!     - Visual servoing: every cycle looks up the marker, calibration and target transforms
//!       and sends a Cartesian velocity command to the differential kinematics.
//!     - Differential kinematics: solves each command against the current arm Jacobian and
//!       dispatches the joint delta to the simulated or real arm.
//!     - Broadcaster (real arm only): publishes the held joint velocity at a fixed rate.
//!
//! Transforms and joint states are received by background client threads. Any failure or panic
//! triggers the shutdown, after which every thread stops and the executable exits with the cause.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use log::{debug, error, info};
use std::{path::PathBuf, sync::mpsc, thread};
use structopt::StructOpt;

// Internal
use comms_if::{
    eqpt::arm::NUM_ARM_JOINTS,
    net::{zmq, NetParams},
};
use servo_lib::{
    arm_client::{JointVelocityPublisher, TrajectoryPublisher},
    arm_model::{self, ArmModel},
    diff_ik::{
        self, Actuate, ActuationMode, DiffIk, HeldVelocity, TrajectoryActuator, VelocityActuator,
    },
    joint_state_client::{JointStateClient, LatestJointState},
    tf_client::{TfBuffer, TfClient, TfParams},
    vis_servo,
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
    shutdown::Shutdown,
};

// ---------------------------------------------------------------------------
// CLI
// ---------------------------------------------------------------------------

#[derive(Debug, StructOpt)]
#[structopt(name = "servo_exec", about = "Arm visual servoing executable")]
struct Opt {
    /// Directory containing the parameter files, defaults to $ARM_SERVO_SW_ROOT/params
    #[structopt(long, parse(from_os_str))]
    params_dir: Option<PathBuf>,

    /// Minimum level of logged messages (off, error, warn, info, debug, trace)
    #[structopt(long, default_value = "debug")]
    log_level: LevelFilter,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<()> {
    color_eyre::install()?;

    let opt = Opt::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session =
        Session::new("servo_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(opt.log_level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Arm Visual Servoing Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    if let Some(dir) = opt.params_dir {
        util::params::set_dir(dir).wrap_err("Could not set the parameter directory")?;
    }

    let vis_servo_params: vis_servo::Params =
        util::params::load("vis_servo.toml").wrap_err("Could not load VisServo params")?;
    let diff_ik_params: diff_ik::Params =
        util::params::load("diff_ik.toml").wrap_err("Could not load DiffIk params")?;
    let arm_model_params: arm_model::Params =
        util::params::load("arm_model.toml").wrap_err("Could not load ArmModel params")?;
    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;
    let tf_params: TfParams =
        util::params::load("tf.toml").wrap_err("Could not load Tf params")?;

    vis_servo_params
        .validate()
        .wrap_err("Invalid VisServo params")?;
    diff_ik_params.validate().wrap_err("Invalid DiffIk params")?;

    let mode = diff_ik_params.actuation_mode();

    if mode.needs_broadcast() && arm_model_params.joint_names.len() != NUM_ARM_JOINTS {
        return Err(eyre!(
            "The real arm takes velocities for {} joints but the arm model has {}",
            NUM_ARM_JOINTS,
            arm_model_params.joint_names.len()
        ));
    }

    info!("Exec parameters loaded, actuation mode: {:?}", mode);

    // ---- INITIALISE MODULES ----

    let latest_joint_state = LatestJointState::default();
    let arm_model = ArmModel::new(arm_model_params, latest_joint_state.clone())
        .wrap_err("Failed to initialise the ArmModel")?;

    let shutdown = Shutdown::new();

    let tf_buffer = TfBuffer::with_shutdown(&shutdown);
    for tf in tf_params.static_transforms.iter() {
        tf_buffer.set_transform(tf).wrap_err_with(|| {
            format!(
                "Invalid static transform from {} to {}",
                tf.parent_frame, tf.child_frame
            )
        })?;
    }
    info!(
        "{} static transforms loaded",
        tf_params.static_transforms.len()
    );

    // ---- INITIALISE NETWORK ----

    info!("Initialising network");

    let zmq_ctx = zmq::Context::new();
    let held_velocity = HeldVelocity::default();

    let actuator: Box<dyn Actuate + Send> = match mode {
        ActuationMode::Simulation => Box::new(TrajectoryActuator::new(
            TrajectoryPublisher::new(&zmq_ctx, &net_params)
                .wrap_err("Failed to initialise the TrajectoryPublisher")?,
            diff_ik_params.time_to_reach_s,
        )),
        ActuationMode::Hardware { debug } => {
            Box::new(VelocityActuator::new(held_velocity.clone(), debug))
        }
    };

    let velocity_publisher = match mode.needs_broadcast() {
        true => Some(
            JointVelocityPublisher::new(&zmq_ctx, &net_params)
                .wrap_err("Failed to initialise the JointVelocityPublisher")?,
        ),
        false => None,
    };

    let tf_client = TfClient::start(&zmq_ctx, &net_params, tf_buffer.clone(), shutdown.clone())
        .wrap_err("Failed to initialise the TfClient")?;
    info!("TfClient initialised");

    let joint_state_client =
        JointStateClient::start(&zmq_ctx, &net_params, latest_joint_state, shutdown.clone())
            .wrap_err("Failed to initialise the JointStateClient")?;
    info!("JointStateClient initialised");

    // ---- START CONTROL THREADS ----

    let (cmd_tx, cmd_rx) = mpsc::channel();
    let cmd_wait = diff_ik_params.cmd_wait()?;
    let broadcast_period = diff_ik_params.broadcast_period()?;

    // Errors returned by the loops, and panics, have already been logged and recorded as the
    // shutdown cause
    let mut handles = Vec::new();

    let mut diff_ik = DiffIk::new(arm_model, actuator);
    let diff_ik_shutdown = shutdown.clone();
    handles.push(
        thread::Builder::new()
            .name("diff_ik".into())
            .spawn(move || {
                diff_ik::run_handler(&mut diff_ik, &cmd_rx, cmd_wait, &diff_ik_shutdown).ok();
            })
            .wrap_err("Failed to start the DiffIk thread")?,
    );

    if let Some(mut publisher) = velocity_publisher {
        let broadcast_shutdown = shutdown.clone();
        let held = held_velocity.clone();
        handles.push(
            thread::Builder::new()
                .name("broadcaster".into())
                .spawn(move || {
                    diff_ik::run_broadcaster(
                        &held,
                        &mut publisher,
                        broadcast_period,
                        &broadcast_shutdown,
                    )
                    .ok();
                })
                .wrap_err("Failed to start the broadcaster thread")?,
        );
    }

    let vis_servo_shutdown = shutdown.clone();
    handles.push(
        thread::Builder::new()
            .name("vis_servo".into())
            .spawn(move || {
                vis_servo::run(vis_servo_params, &tf_buffer, cmd_tx, &vis_servo_shutdown).ok();
            })
            .wrap_err("Failed to start the VisServo thread")?,
    );

    info!("Control threads started\n");

    // ---- WAIT FOR SHUTDOWN ----

    shutdown.wait();

    info!("Stopping...");

    for handle in handles {
        let name = handle.thread().name().unwrap_or("unnamed").to_string();
        if handle.join().is_err() {
            error!("The {} thread panicked", name);
        }
        debug!("{} thread stopped", name);
    }

    tf_client.join();
    joint_state_client.join();

    info!("End of execution");

    Err(eyre!(
        "Servoing stopped: {}",
        shutdown.cause().unwrap_or_default()
    ))
}
