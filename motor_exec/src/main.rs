//! # Motor Control Interface Executable
//!
//! This executable drives a single motor axis through an ODrive motor
//! controller:
//! - Pushes the controller configuration at startup and persists it to the
//!   device's own storage
//! - Optionally runs the full calibration sequence
//! - Repeatedly accepts a velocity and run duration from the operator,
//!   commands a closed-loop position move, and polls telemetry at a fixed
//!   cadence
//! - Exports each session's samples to CSV and renders a four-panel
//!   time-series plot

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Operator console prompts.
mod console;

/// Session loop, telemetry export and plotting.
mod experiment;

/// Boundary to the motor controller hardware.
mod odrive;

/// Parameters for the motor executable.
mod params;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use log::{info, warn};
use std::io::Write;
use std::thread;
use std::time::Duration;

// Internal
use console::Console;
use experiment::{export, plot, CancelToken, SessionCommand, SessionData, SessionOutcome};
use odrive::{check_axis_ok, AxisState, OdriveAxis};
use params::MotorExecParams;
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Name of the executable's parameter file
const PARAM_FILE: &str = "motor_exec.toml";

// ------------------------------------------------------------------------------------------------
// MAIN
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    // ---- EARLY INITIALISATION ----

    println!("----------------- Motor Control Interface -----------------\n");

    let params: MotorExecParams =
        util::params::load(PARAM_FILE).wrap_err("Failed to load the parameter file")?;

    // Initialise session
    let session = Session::new("motor_exec", &params.output.dir_name)
        .wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Info, &session).wrap_err("Failed to initialise logging")?;

    info!("System initiating");
    info!("Output directory: {:?}\n", session.data_root);

    // ---- DEVICE BRING-UP ----

    let mut axis = odrive::find_any().wrap_err("Failed to find an ODrive axis")?;
    axis.clear_errors()
        .wrap_err("Failed to clear axis errors")?;

    info!("Connecting...");

    // Push the static configuration and persist it on the device. The
    // second save follows an error clear, matching the controller's
    // recommended bring-up order.
    axis.apply_config(&params.axis)
        .wrap_err("Failed to push the controller configuration")?;
    thread::sleep(Duration::from_millis(params.sampling.settle_time_ms));
    axis.save_configuration()
        .wrap_err("Failed to persist the controller configuration")?;
    thread::sleep(Duration::from_secs(1));
    axis.clear_errors()
        .wrap_err("Failed to clear axis errors")?;
    axis.save_configuration()
        .wrap_err("Failed to persist the controller configuration")?;

    info!("System armed, waiting for instructions\n");

    if let Err(flags) = check_axis_ok(&mut axis) {
        return Err(eyre!(
            "System initiation failed (axis error {:#010x}). If this message persists, \
             power cycle the controller.",
            flags
        ));
    }

    // ---- CALIBRATION ----

    let mut console = Console::new().wrap_err("Failed to initialise the console")?;

    let calibrate = console.confirm(
        "Do you wish to calibrate the motor? You must calibrate the motor after a restart. (Y/N): ",
    )?;

    if calibrate {
        info!("The motor is being calibrated. Please wait.");
        axis.request_state(AxisState::FullCalibrationSequence)
            .wrap_err("Failed to start the calibration sequence")?;

        while axis
            .current_state()
            .wrap_err("Failed to read the axis state")?
            != AxisState::Idle
        {
            thread::sleep(Duration::from_millis(params.sampling.calib_poll_interval_ms));
            print!(".");
            let _ = std::io::stdout().flush();
        }
        println!();

        if let Err(flags) = check_axis_ok(&mut axis) {
            return Err(eyre!(
                "Calibration failed (axis error {:#010x}). If this message persists, \
                 power cycle the controller.",
                flags
            ));
        }

        info!("Calibration complete");
    }

    // ---- EXPERIMENT LOOP ----

    let cancel = CancelToken::new();
    {
        let token = cancel.clone();
        ctrlc::set_handler(move || token.cancel())
            .wrap_err("Failed to set the Ctrl-C handler")?;
    }

    loop {
        info!("---- Experiment Session Created ----");
        axis.request_state(AxisState::ClosedLoopControl)
            .wrap_err("Failed to enter closed loop control")?;

        let vel_limit = match console.prompt_f64("Enter the velocity (1-45 rev/s): ")? {
            Some(v) => v,
            None => break,
        };
        let run_time_s = match console.prompt_f64("Enter the run time (s): ")? {
            Some(t) => t,
            None => break,
        };

        // Operator input is pushed to the device as-is; anything above the
        // configured ceiling is flagged but not clamped
        if vel_limit > params.axis.vel_limit {
            warn!(
                "Requested velocity {} rev/s exceeds the configured limit of {} rev/s",
                vel_limit, params.axis.vel_limit
            );
        }

        let cmd = SessionCommand {
            vel_limit,
            run_time_s,
        };
        let mut data = SessionData::new();
        cancel.reset();

        let outcome = experiment::run(&mut axis, &cmd, &params.sampling, &cancel, &mut data);

        // Export and display whatever was collected before looking at how
        // the session ended, so a device fault cannot lose the data
        export::write(&session, &params.output, &data)
            .wrap_err("Failed to export the session data")?;
        plot::show(&data).wrap_err("Failed to display the session plot")?;

        match outcome.wrap_err("Device fault during the session")? {
            SessionOutcome::Completed => info!("Target position reached"),
            SessionOutcome::Cancelled => info!("Session cancelled by the operator"),
        }

        if console.prompt_quit("Press [Q] to quit. Press any other key to proceed: ")? {
            break;
        }
    }

    // Prompt-interrupt exits arrive here with the axis still armed
    axis.request_state(AxisState::Idle)
        .wrap_err("Failed to idle the axis")?;

    info!("Exiting");
    info!("Thank you for using the Motor Control Interface");

    Ok(())
}
