//! # Motor Executable Parameters

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Deserialize;

use crate::odrive::AxisConfig;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct MotorExecParams {
    /// Controller configuration pushed to the device at startup
    pub axis: AxisConfig,

    /// Cadence of the polling and calibration loops
    pub sampling: SamplingParams,

    /// Output directory and file naming
    pub output: OutputParams,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplingParams {
    /// Interval between telemetry samples (ms)
    pub sample_interval_ms: u64,

    /// Settle time after commanding a move before sampling starts (ms)
    pub settle_time_ms: u64,

    /// Interval between calibration status checks (ms)
    pub calib_poll_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OutputParams {
    /// Name of the output directory under the user's home directory
    pub dir_name: String,

    /// Prefix of exported data file names
    pub file_prefix: String,
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_shipped_params_deserialise() {
        // The file shipped in the repository must stay loadable
        let params: MotorExecParams = util::params::load_from_path(
            concat!(env!("CARGO_MANIFEST_DIR"), "/../params/motor_exec.toml"),
        )
        .unwrap();

        assert_eq!(params.axis.pole_pairs, 7);
        assert_eq!(params.axis.encoder_cpr, 4000);
        assert_eq!(params.sampling.sample_interval_ms, 5);
        assert_eq!(params.output.file_prefix, "motor_data");
    }
}
