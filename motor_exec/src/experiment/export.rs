//! # Telemetry Export
//!
//! Writes one CSV file per session into the session's output directory,
//! named `{prefix}_{unix seconds}.csv`, one row per telemetry sample.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

// External
use chrono::Utc;
use log::info;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal
use super::SessionData;
use crate::params::OutputParams;
use util::archive::{ArchiveError, Archiver};
use util::session::Session;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to write the data file: {0}")]
    Archive(#[from] ArchiveError),
}

// ------------------------------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Export a session's telemetry into the session's output directory.
///
/// Returns the path of the written file.
pub fn write(
    session: &Session,
    output: &OutputParams,
    data: &SessionData,
) -> Result<PathBuf, ExportError> {
    let filename = format!("{}_{}.csv", output.file_prefix, Utc::now().timestamp());
    let path = session.data_root.join(filename);

    write_to_path(&path, data)?;

    info!("Data saved to {:?}", path);

    Ok(path)
}

/// Export a session's telemetry to an explicit path.
pub fn write_to_path<P: AsRef<Path>>(path: P, data: &SessionData) -> Result<(), ExportError> {
    let mut archiver = Archiver::create(path)?;

    for record in &data.records {
        archiver.serialise(record)?;
    }

    archiver.flush()?;

    Ok(())
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;
    use crate::experiment::TelemetryRecord;

    fn record(time_s: f64) -> TelemetryRecord {
        TelemetryRecord {
            time_s,
            velocity: 2.0,
            position: 10.0,
            torque_nm: 0.5,
            current_a: 1.25,
        }
    }

    #[test]
    fn test_export_columns_and_row_count() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("motor_data_0.csv");

        let data = SessionData {
            records: vec![record(0.0), record(0.005), record(0.01)],
        };

        write_to_path(&path, &data).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        // Header plus one row per sample, columns in fixed order
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "Time (s),Velocity (counts/s),Position (counts),Torque (Nm),Current (A)"
        );
        assert_eq!(lines[1], "0.0,2.0,10.0,0.5,1.25");
    }

    #[test]
    fn test_export_empty_session_writes_empty_file() {
        // The csv writer only emits the header alongside the first record,
        // so a session cancelled before any sample produces an empty file
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("motor_data_1.csv");

        write_to_path(&path, &SessionData::new()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 0);
    }

    #[test]
    fn test_export_names_file_with_prefix() {
        let root = tempfile::tempdir().unwrap();
        let session = Session::new_in(root.path(), "motor_exec", "motor_data_logs").unwrap();
        let output = OutputParams {
            dir_name: "motor_data_logs".into(),
            file_prefix: "motor_data".into(),
        };

        let data = SessionData {
            records: vec![record(0.0)],
        };

        let path = write(&session, &output, &data).unwrap();

        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("motor_data_"));
        assert!(name.ends_with(".csv"));
    }
}
