//! Event-file backed run source

use std::fs;
use std::path::{Path, PathBuf};

use prost::Message;
use tracing::debug;

use super::proto::Event;
use super::tfrecord::RecordReader;
use super::{RunSource, ScalarRecord};
use crate::{Error, Result};

/// Reads scalar records from TensorBoard event files on disk.
///
/// A run directory may hold several event files (e.g. a resumed run). They
/// are read in file name order, which for TensorBoard's
/// `events.out.tfevents.<unix-secs>...` naming is creation order, and their
/// records are concatenated. Sub-directories are not descended into.
#[derive(Debug, Default, Clone, Copy)]
pub struct EventFileSource;

impl EventFileSource {
    /// Create a new event-file source.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl RunSource for EventFileSource {
    fn read_run(&self, dir: &Path) -> Result<Vec<ScalarRecord>> {
        let files = event_files(dir)?;
        let mut records = Vec::new();
        for file in &files {
            let before = records.len();
            read_event_file_into(file, &mut records)?;
            debug!(
                file = %file.display(),
                scalars = records.len() - before,
                "read event file"
            );
        }
        Ok(records)
    }
}

/// List the event files of a run, sorted by file name.
///
/// `path` may also point at a single event file.
///
/// # Errors
///
/// Returns error if `path` does not exist or cannot be listed
pub fn event_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        return Err(Error::Configuration(format!(
            "run directory '{}' does not exist",
            path.display()
        )));
    }

    let mut files = Vec::new();
    for entry in fs::read_dir(path)? {
        let entry = entry?;
        let is_event_file = entry.file_name().to_string_lossy().contains("tfevents");
        if is_event_file && entry.file_type()?.is_file() {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Read every scalar of one event file, in record order.
///
/// # Errors
///
/// Returns error if the file cannot be read, fails checksum validation or
/// holds a record that is not a valid `Event`
pub fn read_event_file(path: &Path) -> Result<Vec<ScalarRecord>> {
    let mut records = Vec::new();
    read_event_file_into(path, &mut records)?;
    Ok(records)
}

fn read_event_file_into(path: &Path, records: &mut Vec<ScalarRecord>) -> Result<()> {
    let buf = fs::read(path)?;
    for payload in RecordReader::new(path, &buf) {
        let event = Event::decode(payload?)?;
        let Some(summary) = event.summary else {
            continue;
        };
        for value in summary.value {
            if let Some(simple_value) = value.simple_value {
                records.push(
                    ScalarRecord::builder(value.tag, event.step, f64::from(simple_value))
                        .wall_time(event.wall_time)
                        .build(),
                );
            }
        }
    }
    Ok(())
}
