//! # ODrive Axis Boundary
//!
//! This module defines the boundary to the motor controller hardware. The
//! controller's firmware and wire protocol are an external concern, so the
//! boundary is expressed as the [`OdriveAxis`] trait and the executable is
//! written against that seam. The [`sim`] module provides a bench
//! simulator implementation used when no hardware transport is available.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Bench simulator implementation of [`OdriveAxis`].
pub mod sim;

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ------------------------------------------------------------------------------------------------
// ENUMERATIONS
// ------------------------------------------------------------------------------------------------

/// Axis states understood by the controller, numbered per the ODrive
/// axis-state enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisState {
    /// Undefined state
    Undefined = 0x0,

    /// Idle, motor unpowered
    Idle = 0x1,

    /// Full calibration sequence (motor and encoder offset)
    FullCalibrationSequence = 0x3,

    /// Closed loop position control using encoder feedback
    ClosedLoopControl = 0x8,
}

/// Possible errors raised at the device boundary.
#[derive(Debug, Error)]
pub enum DeviceError {
    #[error("No ODrive axis could be found")]
    NotFound,

    #[error("The axis rejected the requested state {0:?} while in {1:?}")]
    InvalidStateRequest(AxisState, AxisState),

    #[error("Communication with the axis failed: {0}")]
    Comms(String),
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// The fixed set of controller parameters pushed to the device once at
/// startup and persisted to its non-volatile storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxisConfig {
    /// Motor phase current limit (A)
    pub current_lim: f64,

    /// Configured velocity limit ceiling (rev/s)
    pub vel_limit: f64,

    /// DC bus undervoltage trip level (V)
    pub dc_bus_undervoltage_trip_level: f64,

    /// DC bus overvoltage trip level (V)
    pub dc_bus_overvoltage_trip_level: f64,

    /// Number of motor pole pairs
    pub pole_pairs: u32,

    /// Motor torque constant (Nm/A)
    pub torque_constant: f64,

    /// Encoder counts per revolution
    pub encoder_cpr: u32,

    /// Position loop gain
    pub pos_gain: f64,

    /// Velocity loop gain
    pub vel_gain: f64,

    /// Velocity loop integrator gain
    pub vel_integrator_gain: f64,
}

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// Boundary trait for a single controlled motor axis.
///
/// All operations are fallible since each one maps to an exchange with the
/// controller hardware.
pub trait OdriveAxis {
    /// Command the axis into the given state.
    fn request_state(&mut self, state: AxisState) -> Result<(), DeviceError>;

    /// Read the state the axis is currently in.
    fn current_state(&mut self) -> Result<AxisState, DeviceError>;

    /// Read the axis error flags. Zero means no active error.
    fn axis_error(&mut self) -> Result<u32, DeviceError>;

    /// Clear any latched axis error flags.
    fn clear_errors(&mut self) -> Result<(), DeviceError>;

    /// Push the controller configuration to the device.
    fn apply_config(&mut self, config: &AxisConfig) -> Result<(), DeviceError>;

    /// Persist the current configuration to the device's own storage.
    fn save_configuration(&mut self) -> Result<(), DeviceError>;

    /// Set the velocity limit used by the position controller (rev/s).
    fn set_vel_limit(&mut self, vel_limit: f64) -> Result<(), DeviceError>;

    /// Set the commanded absolute position (revolutions).
    fn set_input_pos(&mut self, pos: f64) -> Result<(), DeviceError>;

    /// Read the live position estimate (encoder counts).
    fn pos_estimate(&mut self) -> Result<f64, DeviceError>;

    /// Read the live velocity estimate (counts/s).
    fn vel_estimate(&mut self) -> Result<f64, DeviceError>;

    /// Read the measured quadrature current (A).
    fn iq_measured(&mut self) -> Result<f64, DeviceError>;
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Find and connect to the single controller instance.
///
/// The hardware transport is out of scope for this executable, so the
/// returned axis is backed by the bench simulator.
pub fn find_any() -> Result<sim::SimAxis, DeviceError> {
    Ok(sim::SimAxis::new())
}

/// Check that the axis reports no active error condition.
///
/// Returns the raw error flags so the caller can include them in its
/// failure message.
pub fn check_axis_ok(axis: &mut impl OdriveAxis) -> Result<(), u32> {
    match axis.axis_error() {
        Ok(0) => Ok(()),
        Ok(flags) => Err(flags),
        Err(_) => Err(u32::MAX),
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_check_axis_ok() {
        let mut axis = find_any().unwrap();
        assert!(check_axis_ok(&mut axis).is_ok());

        axis.force_error(0x40);
        assert_eq!(check_axis_ok(&mut axis), Err(0x40));

        axis.clear_errors().unwrap();
        assert!(check_axis_ok(&mut axis).is_ok());
    }
}
