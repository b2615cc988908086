//! Run log reading and writing
//!
//! The alignment engine sees a run only through [`RunSource`]: an ordered
//! list of [`ScalarRecord`]s per run directory, duplicates included.
//!
//! ## Backends
//!
//! - [`EventFileSource`]: TensorBoard event files on disk
//! - [`MemoryRunSource`]: records held in memory
//!
//! ## Usage
//!
//! ```rust
//! use std::path::Path;
//! use tb_reducer::events::{MemoryRunSource, RunSource, ScalarRecord};
//!
//! let mut source = MemoryRunSource::new();
//! source.push("runs/seed-1", ScalarRecord::new("loss", 0, 0.9));
//! source.push("runs/seed-1", ScalarRecord::new("loss", 1, 0.7));
//!
//! let records = source.read_run(Path::new("runs/seed-1")).unwrap();
//! assert_eq!(records.len(), 2);
//! ```

mod memory;
pub mod proto;
mod reader;
mod record;
pub mod tfrecord;
mod writer;

use std::path::Path;

use crate::Result;

pub use memory::MemoryRunSource;
pub use reader::{event_files, read_event_file, EventFileSource};
pub use record::{unix_seconds, ScalarRecord, ScalarRecordBuilder};
pub use writer::{EventFileWriter, FILE_VERSION};

/// Source of per-run scalar records.
///
/// Implementations must return every record of the run, duplicates
/// included, in a stable order: first/last duplicate resolution depends on
/// it.
pub trait RunSource: Send + Sync {
    /// Read all scalar records of the run stored at `dir`.
    ///
    /// # Errors
    ///
    /// Returns error if the run does not exist or its logs cannot be decoded
    fn read_run(&self, dir: &Path) -> Result<Vec<ScalarRecord>>;
}
