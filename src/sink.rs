//! CSV Log Sink
//!
//! Append-only CSV file holding every reading the bridge accepts.
//!
//! Format:
//! - header `timestamp,temperatura,umidade`, written once when the file is new
//! - one row per reading, temperature and humidity with two decimals
//!
//! Writers are serialised by a mutex and every row is flushed before the lock
//! is released, so a row is visible to readers of the file before the next
//! append starts.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use thiserror::Error;

use crate::reading::Reading;

/// Header row of the log file
pub const HEADER: [&str; 3] = ["timestamp", "temperatura", "umidade"];

/// Errors from the log sink
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Log writer lock poisoned")]
    Poisoned,
}

pub type SinkResult<T> = Result<T, SinkError>;

/// Append-only CSV log of readings
pub struct CsvLog {
    path: PathBuf,
    writer: Mutex<csv::Writer<File>>,
    /// Fsync after every row instead of only flushing to the OS
    fsync: bool,
}

impl CsvLog {
    /// Open or create the log file
    pub fn open(path: impl AsRef<Path>, fsync: bool) -> SinkResult<Self> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let is_new = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);

        if is_new {
            writer.write_record(HEADER)?;
            writer.flush()?;
            tracing::debug!(path = %path.display(), "Created reading log");
        }

        Ok(Self {
            path,
            writer: Mutex::new(writer),
            fsync,
        })
    }

    /// Append one reading and flush it
    pub fn append(&self, reading: &Reading) -> SinkResult<()> {
        let temperature = format!("{:.2}", reading.temperature);
        let humidity = format!("{:.2}", reading.humidity);

        let mut writer = self.writer.lock().map_err(|_| SinkError::Poisoned)?;
        writer.write_record([
            reading.timestamp.as_str(),
            temperature.as_str(),
            humidity.as_str(),
        ])?;
        writer.flush()?;
        if self.fsync {
            writer.get_ref().sync_data()?;
        }

        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
