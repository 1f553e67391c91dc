//! # Experiment Session Module
//!
//! One experiment session is a single operator-commanded move: a velocity
//! limit and a run time are turned into a target displacement, the axis is
//! commanded to the resulting absolute position, and telemetry is sampled
//! at a fixed cadence until the move completes or the operator cancels.
//!
//! Whatever way the sampling loop ends, the axis is commanded back to idle
//! before control returns to the caller, and the collected samples stay in
//! the accumulator the caller passed in so they can be exported and
//! plotted.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// CSV export of a session's telemetry.
pub mod export;

/// Four-panel terminal plot of a session's telemetry.
pub mod plot;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use log::info;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

// Internal
use crate::odrive::{AxisState, DeviceError, OdriveAxis};
use crate::params::SamplingParams;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Motor torque constant scaling: torque (Nm) = 8.27 * Iq / 120
const TORQUE_NM_PER_A: f64 = 8.27;

/// Divisor of the torque scaling, the motor's KV rating
const TORQUE_KV_DIVISOR: f64 = 120.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The operator's inputs for one session.
#[derive(Debug, Clone, Copy)]
pub struct SessionCommand {
    /// Velocity limit for the move (rev/s)
    pub vel_limit: f64,

    /// Requested run time (s)
    pub run_time_s: f64,
}

/// One telemetry sample. Field order fixes the exported column order.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TelemetryRecord {
    #[serde(rename = "Time (s)")]
    pub time_s: f64,

    #[serde(rename = "Velocity (counts/s)")]
    pub velocity: f64,

    #[serde(rename = "Position (counts)")]
    pub position: f64,

    #[serde(rename = "Torque (Nm)")]
    pub torque_nm: f64,

    #[serde(rename = "Current (A)")]
    pub current_a: f64,
}

/// Accumulator for the samples collected over one session.
///
/// Owned by the caller so that the samples survive any way the sampling
/// loop ends, including device faults.
#[derive(Default)]
pub struct SessionData {
    pub records: Vec<TelemetryRecord>,
}

/// Cooperative cancellation flag, set from the Ctrl-C handler and checked
/// on every polling iteration.
#[derive(Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// How a session's sampling loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The stop condition was met
    Completed,

    /// The operator cancelled the session
    Cancelled,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SessionCommand {
    /// The displacement commanded by this session (revolutions).
    ///
    /// Fixed at session start and never recomputed mid-session.
    pub fn target_displacement(&self) -> f64 {
        self.vel_limit * self.run_time_s
    }
}

impl SessionData {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation of the active session.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// True once cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Clear the flag before a new session starts.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Derive shaft torque from the measured quadrature current.
pub fn derive_torque(iq_measured: f64) -> f64 {
    TORQUE_NM_PER_A * iq_measured / TORQUE_KV_DIVISOR
}

/// Run one session to completion or cancellation.
///
/// The axis is expected to already be in closed-loop control. Samples are
/// appended to `data`; on every exit path, normal or not, the axis is
/// commanded back to idle before this function returns.
pub fn run<A: OdriveAxis>(
    axis: &mut A,
    cmd: &SessionCommand,
    sampling: &SamplingParams,
    cancel: &CancelToken,
    data: &mut SessionData,
) -> Result<SessionOutcome, DeviceError> {
    let loop_result = sample_loop(axis, cmd, sampling, cancel, data);

    // The axis must end up idle whether the loop completed, was cancelled,
    // or failed partway.
    let idle_result = axis.request_state(AxisState::Idle);

    let outcome = loop_result?;
    idle_result?;

    Ok(outcome)
}

// ------------------------------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn sample_loop<A: OdriveAxis>(
    axis: &mut A,
    cmd: &SessionCommand,
    sampling: &SamplingParams,
    cancel: &CancelToken,
    data: &mut SessionData,
) -> Result<SessionOutcome, DeviceError> {
    let displacement = cmd.target_displacement();

    // The absolute target is the live estimate at session start plus the
    // commanded displacement
    axis.set_vel_limit(cmd.vel_limit)?;
    let target = axis.pos_estimate()? + displacement;
    axis.set_input_pos(target)?;

    thread::sleep(Duration::from_millis(sampling.settle_time_ms));

    info!("Data collection started. Press Ctrl+C to stop the session.");

    let epoch = Instant::now();

    loop {
        if cancel.is_cancelled() {
            info!("Data collection stopped.");
            return Ok(SessionOutcome::Cancelled);
        }

        let time_s = epoch.elapsed().as_secs_f64();
        let position = axis.pos_estimate()?;
        let velocity = axis.vel_estimate()?;
        let current_a = axis.iq_measured()?;
        let torque_nm = derive_torque(current_a);

        info!(
            "Time: {:.2}s | Pos: {:.0} | Spd: {:.2} | Torque: {:.2} Nm | Current: {:.2} A",
            time_s, position, velocity, torque_nm, current_a
        );

        data.records.push(TelemetryRecord {
            time_s,
            velocity,
            position,
            torque_nm,
            current_a,
        });

        // Stop threshold tracks the live estimate rather than the target
        // frozen above
        if position >= axis.pos_estimate()? + displacement {
            return Ok(SessionOutcome::Completed);
        }

        thread::sleep(Duration::from_millis(sampling.sample_interval_ms));
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::odrive::sim::SimAxis;

    fn test_sampling() -> SamplingParams {
        SamplingParams {
            sample_interval_ms: 1,
            settle_time_ms: 0,
            calib_poll_interval_ms: 1,
        }
    }

    #[test]
    fn test_derive_torque() {
        assert_eq!(derive_torque(0.0), 0.0);
        assert!((derive_torque(120.0) - 8.27).abs() < 1e-12);
        assert!((derive_torque(60.0) - 4.135).abs() < 1e-12);
    }

    #[test]
    fn test_target_displacement_is_product() {
        let cmd = SessionCommand {
            vel_limit: 12.5,
            run_time_s: 4.0,
        };
        assert_eq!(cmd.target_displacement(), 50.0);
    }

    #[test]
    fn test_absolute_target_offset_from_start() {
        let mut axis = SimAxis::new();
        axis.force_position(7.0);
        // Hold the rotor at its starting position so the commanded target
        // is read off a stationary axis
        axis.set_input_pos(7.0).unwrap();
        axis.request_state(AxisState::ClosedLoopControl).unwrap();

        let cmd = SessionCommand {
            vel_limit: 0.0,
            run_time_s: 3.0,
        };
        let mut data = SessionData::new();

        run(
            &mut axis,
            &cmd,
            &test_sampling(),
            &CancelToken::new(),
            &mut data,
        )
        .unwrap();

        // Target = position at start + V * T; the vel limit is pushed too
        assert!((axis.input_pos() - 7.0).abs() < 1e-6);
        assert_eq!(axis.vel_limit(), 0.0);
    }

    #[test]
    fn test_zero_velocity_session_stops_after_one_sample() {
        let mut axis = SimAxis::new();
        axis.request_state(AxisState::ClosedLoopControl).unwrap();

        let cmd = SessionCommand {
            vel_limit: 0.0,
            run_time_s: 10.0,
        };
        let mut data = SessionData::new();

        let outcome = run(
            &mut axis,
            &cmd,
            &test_sampling(),
            &CancelToken::new(),
            &mut data,
        )
        .unwrap();

        assert_eq!(outcome, SessionOutcome::Completed);
        assert_eq!(data.records.len(), 1);
        assert_eq!(axis.state(), AxisState::Idle);
    }

    #[test]
    fn test_cancelled_session_keeps_samples_and_idles_axis() {
        let mut axis = SimAxis::new();
        axis.request_state(AxisState::ClosedLoopControl).unwrap();

        let cmd = SessionCommand {
            vel_limit: 5.0,
            run_time_s: 60.0,
        };
        let mut data = SessionData::new();
        let cancel = CancelToken::new();

        // Cancel shortly after sampling begins
        let canceller = cancel.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(30));
            canceller.cancel();
        });

        let outcome = run(&mut axis, &cmd, &test_sampling(), &cancel, &mut data).unwrap();
        handle.join().unwrap();

        assert_eq!(outcome, SessionOutcome::Cancelled);
        assert!(!data.records.is_empty());
        assert_eq!(axis.state(), AxisState::Idle);
    }

    #[test]
    fn test_samples_monotonic_and_torque_pure() {
        let mut axis = SimAxis::new();
        axis.request_state(AxisState::ClosedLoopControl).unwrap();

        // While the displacement is positive the stop threshold keeps
        // tracking the live estimate, so the session only ends on
        // cancellation
        let cmd = SessionCommand {
            vel_limit: 20.0,
            run_time_s: 1.0,
        };
        let mut data = SessionData::new();
        let cancel = CancelToken::new();

        let canceller = cancel.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            canceller.cancel();
        });

        run(&mut axis, &cmd, &test_sampling(), &cancel, &mut data).unwrap();
        handle.join().unwrap();

        assert!(!data.records.is_empty());

        for pair in data.records.windows(2) {
            assert!(pair[1].time_s >= pair[0].time_s);
        }

        for record in &data.records {
            assert_eq!(record.torque_nm, derive_torque(record.current_a));
        }
    }

    #[test]
    fn test_negative_displacement_satisfies_stop_immediately() {
        let mut axis = SimAxis::new();
        axis.request_state(AxisState::ClosedLoopControl).unwrap();

        let cmd = SessionCommand {
            vel_limit: -5.0,
            run_time_s: 2.0,
        };
        let mut data = SessionData::new();

        let outcome = run(
            &mut axis,
            &cmd,
            &test_sampling(),
            &CancelToken::new(),
            &mut data,
        )
        .unwrap();

        assert_eq!(outcome, SessionOutcome::Completed);
        assert_eq!(data.records.len(), 1);
    }

    #[test]
    fn test_cancel_token_reset() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());

        token.cancel();
        assert!(token.is_cancelled());

        token.reset();
        assert!(!token.is_cancelled());
    }
}
