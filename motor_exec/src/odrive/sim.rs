//! # Bench Axis Simulator
//!
//! A deterministic stand-in for the hardware axis. The model is a
//! first-order closed-loop position response: the velocity demand is the
//! position error scaled by the position gain, saturated at the commanded
//! velocity limit, and the velocity slews towards that demand at a fixed
//! acceleration. The measured quadrature current tracks the velocity error
//! plus a friction term.
//!
//! The model advances on wall-clock time whenever the axis is read, so a
//! polling loop sees a continuously moving motor. Tests can drive the
//! model manually through [`SimAxis::advance`].

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::time::{Duration, Instant};

use super::{AxisConfig, AxisState, DeviceError, OdriveAxis};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Simulated duration of the full calibration sequence (s)
const CALIB_DURATION_S: f64 = 2.0;

/// Quadrature current drawn while calibrating (A)
const CALIB_IQ_A: f64 = 10.0;

/// Maximum acceleration of the simulated rotor (rev/s^2)
const MAX_ACCEL: f64 = 200.0;

/// Quadrature current per rev/s of velocity error (A)
const IQ_PER_VEL_ERR: f64 = 0.8;

/// Quadrature current per rev/s of velocity, a friction term (A)
const IQ_PER_VEL: f64 = 0.05;

/// Position gain used before any configuration has been applied
const DEFAULT_POS_GAIN: f64 = 3.0;

/// Velocity limit used before any configuration has been applied (rev/s)
const DEFAULT_VEL_LIMIT: f64 = 40.0;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Simulated single motor axis.
pub struct SimAxis {
    state: AxisState,
    error_flags: u32,

    config: Option<AxisConfig>,
    save_count: u32,

    vel_limit: f64,
    input_pos: f64,

    pos: f64,
    vel: f64,
    iq: f64,

    calib_remaining_s: f64,
    last_step: Instant,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SimAxis {
    pub fn new() -> Self {
        Self {
            state: AxisState::Idle,
            error_flags: 0,
            config: None,
            save_count: 0,
            vel_limit: DEFAULT_VEL_LIMIT,
            input_pos: 0.0,
            pos: 0.0,
            vel: 0.0,
            iq: 0.0,
            calib_remaining_s: 0.0,
            last_step: Instant::now(),
        }
    }

    /// Advance the model by the given timestep.
    ///
    /// Reads through the [`OdriveAxis`] trait call this with the wall-clock
    /// time elapsed since the previous step.
    pub fn advance(&mut self, dt: Duration) {
        let dt = dt.as_secs_f64();
        if dt <= 0.0 {
            return;
        }

        match self.state {
            AxisState::FullCalibrationSequence => {
                self.calib_remaining_s -= dt;
                self.iq = CALIB_IQ_A;
                self.slew_vel(0.0, dt);

                if self.calib_remaining_s <= 0.0 {
                    self.calib_remaining_s = 0.0;
                    self.state = AxisState::Idle;
                    self.iq = 0.0;
                }
            }
            AxisState::ClosedLoopControl => {
                let pos_gain = self
                    .config
                    .as_ref()
                    .map(|c| c.pos_gain)
                    .unwrap_or(DEFAULT_POS_GAIN);

                let mut vel_dem = (self.input_pos - self.pos) * pos_gain;
                if vel_dem > self.vel_limit {
                    vel_dem = self.vel_limit;
                }
                if vel_dem < -self.vel_limit {
                    vel_dem = -self.vel_limit;
                }

                self.iq = (vel_dem - self.vel) * IQ_PER_VEL_ERR + self.vel * IQ_PER_VEL;
                self.slew_vel(vel_dem, dt);
            }
            _ => {
                // Unpowered, coast down
                self.iq = 0.0;
                self.slew_vel(0.0, dt);
            }
        }

        self.pos += self.vel * dt;
    }

    /// Force the live position estimate, for bench setups starting away
    /// from zero.
    pub fn force_position(&mut self, pos: f64) {
        self.pos = pos;
    }

    /// Latch the given error flags as if the controller had raised them.
    pub fn force_error(&mut self, flags: u32) {
        self.error_flags = flags;
    }

    /// The last commanded absolute position.
    pub fn input_pos(&self) -> f64 {
        self.input_pos
    }

    /// The last commanded velocity limit.
    pub fn vel_limit(&self) -> f64 {
        self.vel_limit
    }

    /// The state the axis is in, without advancing the model.
    pub fn state(&self) -> AxisState {
        self.state
    }

    /// The configuration last applied to the axis, if any.
    pub fn config(&self) -> Option<&AxisConfig> {
        self.config.as_ref()
    }

    /// Number of times the configuration was persisted to device storage.
    pub fn save_count(&self) -> u32 {
        self.save_count
    }

    /// Advance the model by the wall-clock time since the last step.
    fn step(&mut self) {
        let dt = self.last_step.elapsed();
        self.last_step = Instant::now();
        self.advance(dt);
    }

    /// Move the velocity towards the demand, bounded by [`MAX_ACCEL`].
    fn slew_vel(&mut self, vel_dem: f64, dt: f64) {
        let max_delta = MAX_ACCEL * dt;
        let mut delta = vel_dem - self.vel;
        if delta > max_delta {
            delta = max_delta;
        }
        if delta < -max_delta {
            delta = -max_delta;
        }
        self.vel += delta;
    }
}

impl Default for SimAxis {
    fn default() -> Self {
        Self::new()
    }
}

impl OdriveAxis for SimAxis {
    fn request_state(&mut self, state: AxisState) -> Result<(), DeviceError> {
        self.step();

        match state {
            AxisState::FullCalibrationSequence => {
                if self.state != AxisState::Idle {
                    return Err(DeviceError::InvalidStateRequest(state, self.state));
                }
                self.calib_remaining_s = CALIB_DURATION_S;
                self.state = state;
            }
            _ => self.state = state,
        }

        Ok(())
    }

    fn current_state(&mut self) -> Result<AxisState, DeviceError> {
        self.step();
        Ok(self.state)
    }

    fn axis_error(&mut self) -> Result<u32, DeviceError> {
        self.step();
        Ok(self.error_flags)
    }

    fn clear_errors(&mut self) -> Result<(), DeviceError> {
        self.step();
        self.error_flags = 0;
        Ok(())
    }

    fn apply_config(&mut self, config: &AxisConfig) -> Result<(), DeviceError> {
        self.step();
        self.vel_limit = config.vel_limit;
        self.config = Some(config.clone());
        Ok(())
    }

    fn save_configuration(&mut self) -> Result<(), DeviceError> {
        self.step();
        self.save_count += 1;
        Ok(())
    }

    fn set_vel_limit(&mut self, vel_limit: f64) -> Result<(), DeviceError> {
        self.step();
        self.vel_limit = vel_limit;
        Ok(())
    }

    fn set_input_pos(&mut self, pos: f64) -> Result<(), DeviceError> {
        self.step();
        self.input_pos = pos;
        Ok(())
    }

    fn pos_estimate(&mut self) -> Result<f64, DeviceError> {
        self.step();
        Ok(self.pos)
    }

    fn vel_estimate(&mut self) -> Result<f64, DeviceError> {
        self.step();
        Ok(self.vel)
    }

    fn iq_measured(&mut self) -> Result<f64, DeviceError> {
        self.step();
        Ok(self.iq)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn advance_by_millis(axis: &mut SimAxis, total_ms: u64, step_ms: u64) {
        let mut elapsed = 0;
        while elapsed < total_ms {
            axis.advance(Duration::from_millis(step_ms));
            elapsed += step_ms;
        }
    }

    #[test]
    fn test_closed_loop_reaches_target() {
        let mut axis = SimAxis::new();
        axis.request_state(AxisState::ClosedLoopControl).unwrap();
        axis.set_vel_limit(10.0).unwrap();
        axis.set_input_pos(5.0).unwrap();

        advance_by_millis(&mut axis, 10_000, 5);

        assert!((axis.pos_estimate().unwrap() - 5.0).abs() < 0.01);
    }

    #[test]
    fn test_velocity_limit_respected() {
        let mut axis = SimAxis::new();
        axis.request_state(AxisState::ClosedLoopControl).unwrap();
        axis.set_vel_limit(8.0).unwrap();
        axis.set_input_pos(100.0).unwrap();

        let mut elapsed = 0;
        while elapsed < 2_000 {
            axis.advance(Duration::from_millis(5));
            elapsed += 5;
            assert!(axis.vel <= 8.0 + 1e-9);
        }
    }

    #[test]
    fn test_calibration_sequence_returns_to_idle() {
        let mut axis = SimAxis::new();
        axis.request_state(AxisState::FullCalibrationSequence)
            .unwrap();
        assert_eq!(axis.state(), AxisState::FullCalibrationSequence);

        advance_by_millis(&mut axis, 2_500, 100);

        assert_eq!(axis.state(), AxisState::Idle);
    }

    #[test]
    fn test_calibration_rejected_outside_idle() {
        let mut axis = SimAxis::new();
        axis.request_state(AxisState::ClosedLoopControl).unwrap();

        let result = axis.request_state(AxisState::FullCalibrationSequence);
        assert!(matches!(
            result,
            Err(DeviceError::InvalidStateRequest(_, _))
        ));
    }

    #[test]
    fn test_idle_coasts_to_rest() {
        let mut axis = SimAxis::new();
        axis.request_state(AxisState::ClosedLoopControl).unwrap();
        axis.set_input_pos(50.0).unwrap();
        advance_by_millis(&mut axis, 500, 5);
        assert!(axis.vel > 0.0);

        axis.request_state(AxisState::Idle).unwrap();
        advance_by_millis(&mut axis, 2_000, 5);

        assert!(axis.vel.abs() < 1e-6);
        assert_eq!(axis.iq_measured().unwrap(), 0.0);
    }
}
