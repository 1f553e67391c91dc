//! Session management
//!
//! A session ties one execution of the interface to its output directory
//! (a fixed home-relative folder holding exported data and the run's log
//! file) and to the epoch used for elapsed-time log stamps.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use directories::UserDirs;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal imports
use crate::time;

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// A chrono format string which displays a timestamp. See
/// https://docs.rs/chrono/0.4.11/chrono/format/strftime/index.html for more
/// information.
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A struct storing information about the current session
#[derive(Clone, Debug)]
pub struct Session {
    /// The directory exported data files are written into
    pub data_root: PathBuf,

    /// The path to the session's log file
    pub log_file_path: PathBuf,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors associated with the session module.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Cannot determine the user's home directory")]
    NoHomeDir,

    #[error("Cannot create the output directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error("Cannot get the epoch time, did you forget to initialise the session?")]
    CannotGetEpoch,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start a new session rooted in the user's home directory.
    ///
    /// Creates `~/{data_dir_name}` if it does not exist and places a log
    /// file named `{exec_name}_{timestamp}.log` inside it.
    pub fn new(exec_name: &str, data_dir_name: &str) -> Result<Self, SessionError> {
        let home = match UserDirs::new() {
            Some(d) => d.home_dir().to_path_buf(),
            None => return Err(SessionError::NoHomeDir),
        };

        Self::new_in(&home, exec_name, data_dir_name)
    }

    /// Start a new session rooted in the given directory.
    pub fn new_in<P: AsRef<Path>>(
        root: P,
        exec_name: &str,
        data_dir_name: &str,
    ) -> Result<Self, SessionError> {
        // Set the session epoch. An already initialised epoch is kept, so
        // that elapsed times remain continuous over the whole execution.
        let _ = SESSION_EPOCH.try_init_once(Utc::now);

        // Format the session epoch as a timestamp
        let timestamp = match SESSION_EPOCH.get() {
            Some(e) => e.format(TIMESTAMP_FORMAT),
            None => return Err(SessionError::CannotGetEpoch),
        };

        // Create the output directory
        let data_root = root.as_ref().join(data_dir_name);
        match fs::create_dir_all(&data_root) {
            Ok(_) => (),
            Err(e) => return Err(SessionError::CannotCreateDir(e)),
        };

        // Create the log file path
        let log_file_path = data_root.join(format!("{}_{}.log", exec_name, timestamp));

        Ok(Session {
            data_root,
            log_file_path,
        })
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Get the number of seconds elapsed since the start of the session.
///
/// # Panics
/// - This function will panic if the session epoch has not been
///   initialised, which is performed on creating a new Session instance.
pub fn get_elapsed_seconds() -> f64 {
    match SESSION_EPOCH.get() {
        Some(e) => {
            let elapsed = Utc::now() - *e;
            match time::duration_to_seconds(elapsed) {
                Some(s) => s,
                None => std::f64::NAN,
            }
        }
        None => panic!("Cannot get the session epoch!"),
    }
}

/// Return a reference to the session's epoch.
///
/// # Panics
/// - This function will panic if the session epoch has not been
///   initialised, which is performed on creating a new Session instance.
pub fn get_epoch() -> &'static DateTime<Utc> {
    match SESSION_EPOCH.get() {
        Some(e) => e,
        None => panic!("Cannot get the session epoch!"),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_new_in_creates_output_dir() {
        let root = tempfile::tempdir().unwrap();

        let session = Session::new_in(root.path(), "motor_exec", "motor_data_logs").unwrap();

        assert!(session.data_root.is_dir());
        assert_eq!(session.data_root, root.path().join("motor_data_logs"));

        let name = session
            .log_file_path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .into_owned();
        assert!(name.starts_with("motor_exec_"));
        assert!(name.ends_with(".log"));
    }

    #[test]
    fn test_second_session_reuses_epoch() {
        let root = tempfile::tempdir().unwrap();

        let first = Session::new_in(root.path(), "motor_exec", "logs_a").unwrap();
        let second = Session::new_in(root.path(), "motor_exec", "logs_b").unwrap();

        // Epoch is process wide, so both log files carry the same timestamp
        assert_eq!(
            first.log_file_path.file_name(),
            second
                .log_file_path
                .file_name()
        );
        assert!(get_elapsed_seconds() >= 0.0);
    }
}
