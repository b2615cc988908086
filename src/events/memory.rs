//! In-memory run source

use std::path::{Path, PathBuf};

use rustc_hash::FxHashMap;

use super::{RunSource, ScalarRecord};
use crate::{Error, Result};

/// In-memory run source keyed by run directory.
///
/// Serves records in insertion order, exactly like a reader would. Useful
/// for library callers that already hold their scalars and for tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryRunSource {
    runs: FxHashMap<PathBuf, Vec<ScalarRecord>>,
}

impl MemoryRunSource {
    /// Create an empty source.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a run (an empty record list is a run without scalars).
    pub fn insert_run(&mut self, dir: impl Into<PathBuf>, records: Vec<ScalarRecord>) {
        self.runs.insert(dir.into(), records);
    }

    /// Append one record to a run, registering the run if needed.
    pub fn push(&mut self, dir: impl Into<PathBuf>, record: ScalarRecord) {
        self.runs.entry(dir.into()).or_default().push(record);
    }

    /// Number of registered runs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.runs.len()
    }

    /// Whether no run is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty()
    }
}

impl RunSource for MemoryRunSource {
    fn read_run(&self, dir: &Path) -> Result<Vec<ScalarRecord>> {
        self.runs.get(dir).cloned().ok_or_else(|| {
            Error::Configuration(format!("run directory '{}' does not exist", dir.display()))
        })
    }
}
