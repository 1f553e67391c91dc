//! Struct archiving functionality
//!
//! An [`Archiver`] writes serialisable records into a CSV file, one row per
//! record, with a header row derived from the record's field names.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use csv::WriterBuilder;
pub use csv::Writer;
use serde::Serialize;
use std::fs::{self, File};
use std::path::Path;
use thiserror::Error;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// An object used to write CSV archive files.
pub struct Archiver {
    writer: Writer<File>,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Possible errors raised while archiving.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("Cannot create the archive file: {0}")]
    FileCreateError(std::io::Error),

    #[error("Cannot serialise the record: {0}")]
    SerialiseError(#[from] csv::Error),

    #[error("Cannot flush the archive file: {0}")]
    FlushError(std::io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Archiver {
    /// Create a new archiver writing to the given path.
    ///
    /// Parent directories are created if they do not exist.
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self, ArchiveError> {
        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent).map_err(ArchiveError::FileCreateError)?;
        }

        let file = File::create(path).map_err(ArchiveError::FileCreateError)?;

        let writer = WriterBuilder::new().has_headers(true).from_writer(file);

        Ok(Self { writer })
    }

    /// Serialise a record into the archive.
    pub fn serialise<T: Serialize>(&mut self, record: &T) -> Result<(), ArchiveError> {
        self.writer.serialize(record)?;
        Ok(())
    }

    /// Flush any buffered records to disk.
    pub fn flush(&mut self) -> Result<(), ArchiveError> {
        self.writer.flush().map_err(ArchiveError::FlushError)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[derive(Serialize)]
    struct TestRecord {
        #[serde(rename = "Time (s)")]
        time_s: f64,

        #[serde(rename = "Value")]
        value: f64,
    }

    #[test]
    fn test_archive_rows_and_headers() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("archive.csv");

        let mut archiver = Archiver::create(&path).unwrap();
        archiver
            .serialise(&TestRecord {
                time_s: 0.0,
                value: 1.5,
            })
            .unwrap();
        archiver
            .serialise(&TestRecord {
                time_s: 0.005,
                value: 2.5,
            })
            .unwrap();
        archiver.flush().unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Time (s),Value");
        assert_eq!(lines[1], "0.0,1.5");
    }
}
