//! TensorBoard event-file writer

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::Utc;
use prost::Message;

use super::proto::Event;
use super::record::unix_seconds;
use super::tfrecord::write_record;
use crate::Result;

/// Header written as the first event of every file
pub const FILE_VERSION: &str = "brain.Event:2";

static FILE_SEQ: AtomicUsize = AtomicUsize::new(0);

/// Writes scalars into a new event file inside a run directory.
///
/// ```rust,no_run
/// use tb_reducer::events::EventFileWriter;
///
/// # fn main() -> tb_reducer::Result<()> {
/// let mut writer = EventFileWriter::create("runs/reduced-mean")?;
/// for step in 0..10 {
///     writer.add_scalar("train/loss", 1.0 / f64::from(step + 1), i64::from(step))?;
/// }
/// writer.close()?;
/// # Ok(())
/// # }
/// ```
pub struct EventFileWriter {
    path: PathBuf,
    out: BufWriter<File>,
}

impl EventFileWriter {
    /// Create `dir` if needed and open a fresh event file inside it.
    ///
    /// # Errors
    ///
    /// Returns error if the directory or file cannot be created
    pub fn create(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        let now = Utc::now();
        let name = event_file_name(
            now.timestamp(),
            &host_name(),
            std::process::id(),
            FILE_SEQ.fetch_add(1, Ordering::Relaxed),
        );
        let path = dir.join(name);
        let out = BufWriter::new(File::create(&path)?);

        let mut writer = Self { path, out };
        writer.write_event(&Event {
            wall_time: unix_seconds(now),
            step: 0,
            file_version: Some(FILE_VERSION.to_string()),
            summary: None,
        })?;
        Ok(writer)
    }

    /// Path of the event file being written.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one scalar event, stamped with the current wall time.
    ///
    /// Values are stored as `f32`, the precision of TensorBoard's `simple_value`.
    ///
    /// # Errors
    ///
    /// Returns error if the write fails
    #[allow(clippy::cast_possible_truncation)]
    pub fn add_scalar(&mut self, tag: &str, value: f64, step: i64) -> Result<()> {
        let event = Event::scalar(unix_seconds(Utc::now()), step, tag, value as f32);
        self.write_event(&event)
    }

    fn write_event(&mut self, event: &Event) -> Result<()> {
        write_record(&mut self.out, &event.encode_to_vec())?;
        Ok(())
    }

    /// Flush buffered events and sync the file to disk.
    ///
    /// # Errors
    ///
    /// Returns error if flushing or syncing fails
    pub fn close(mut self) -> Result<()> {
        self.out.flush()?;
        self.out.get_ref().sync_all()?;
        Ok(())
    }
}

/// File name of a new event file.
///
/// The sequence number is zero-padded to the width of `usize::MAX` so that
/// name order stays creation order within one process and second.
fn event_file_name(secs: i64, host: &str, pid: u32, seq: usize) -> String {
    format!("events.out.tfevents.{secs:010}.{host}.{pid}.{seq:020}")
}

fn host_name() -> String {
    ["/proc/sys/kernel/hostname", "/etc/hostname"]
        .iter()
        .filter_map(|path| fs::read_to_string(path).ok())
        .chain(["HOSTNAME", "COMPUTERNAME"].iter().filter_map(|var| std::env::var(var).ok()))
        .map(|host| host.trim().replace(['/', '\\'], "_"))
        .find(|host| !host.is_empty())
        .unwrap_or_else(|| "localhost".to_string())
}
