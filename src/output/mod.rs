//! Output adapter
//!
//! Persists a [`ReducedTable`] either as TensorBoard event directories (one
//! per operator) or as a single flat data file, chosen by the output path's
//! extension:
//!
//! | extension  | layout                                          |
//! |------------|-------------------------------------------------|
//! | `.csv`     | two header rows `(tag, op)`, step index column   |
//! | `.json`    | `{tag: {op: {step: value}}}`                     |
//! | `.parquet` | `step` column plus one column per `(tag, op)`    |
//! | other      | event directories `{outpath}-{op}`               |
//!
//! CSV and JSON files may carry a `.gz` or `.zst` suffix (`reduced.csv.gz`)
//! and are then compressed, see [`Codec`]. Excel files and other data-file
//! suffixes are rejected instead of being taken as a directory prefix.
//!
//! Existing outputs are only replaced when `overwrite` is set. Event
//! directories are only deleted if they carry the [`MANIFEST_FILE`] marker
//! written alongside every event directory this crate produces.

mod codec;
mod envelope;
mod events;
mod flat;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::reduce::{ReduceOp, ReducedTable};
use crate::{Error, Result};

pub use codec::{detect, Codec};
pub use envelope::Envelope;
pub use events::{event_dir_path, write_event_dirs};
pub use flat::write_data_file;

/// Marker file identifying event directories written by this crate
pub const MANIFEST_FILE: &str = ".tb-reducer.json";

/// Output layout selected from the output path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// One TensorBoard event directory per operator
    EventDirs,
    /// Comma-separated values
    Csv,
    /// Nested JSON object
    Json,
    /// Apache Parquet
    Parquet,
}

impl OutputFormat {
    /// Infer the layout from the extension of `path`, looking through a
    /// trailing compression suffix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] for data-file names that cannot be
    /// written, see [`detect`]
    pub fn from_path(path: &Path) -> Result<Self> {
        detect(path).map(|(format, _)| format)
    }

    /// Whether the layout is a single data file.
    #[must_use]
    pub const fn is_flat(self) -> bool {
        !matches!(self, Self::EventDirs)
    }
}

/// Contents of [`MANIFEST_FILE`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    /// Operator the directory holds
    pub op: String,
    /// Tags logged in the directory
    pub tags: Vec<String>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Version of the writing crate
    pub version: String,
}

impl Manifest {
    /// Manifest for a directory holding `op` over `tags`, stamped now.
    #[must_use]
    pub fn new(op: ReduceOp, tags: Vec<String>) -> Self {
        Self {
            op: op.name().to_string(),
            tags,
            created_at: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    /// Write the manifest into `dir`.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written
    pub fn write(&self, dir: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(dir.join(MANIFEST_FILE), json)?;
        Ok(())
    }

    /// Read the manifest of `dir`, `None` if it has none.
    ///
    /// # Errors
    ///
    /// Returns error if the manifest exists but cannot be read or parsed
    pub fn read(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(MANIFEST_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let json = fs::read_to_string(path)?;
        Ok(Some(serde_json::from_str(&json)?))
    }
}

/// Write `reduced` to `outpath` in the layout its extension selects.
///
/// Returns the paths written: the data file, or one event directory per
/// operator.
///
/// # Errors
///
/// Returns [`Error::Configuration`] if `outpath` names an unsupported data
/// file, [`Error::OutputConflict`] if a target exists and may not be
/// replaced (nothing is written in either case), or an I/O or encoding error
pub fn write_reduced(
    reduced: &ReducedTable,
    outpath: impl AsRef<Path>,
    overwrite: bool,
) -> Result<Vec<PathBuf>> {
    let outpath = outpath.as_ref();
    let format = OutputFormat::from_path(outpath)?;
    info!(
        "Writing {} reductions to '{}' as {format:?}",
        reduced.len(),
        outpath.display()
    );
    if format.is_flat() {
        write_data_file(reduced, outpath, overwrite)?;
        Ok(vec![outpath.to_path_buf()])
    } else {
        write_event_dirs(reduced, outpath, overwrite)
    }
}

/// A path about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Target {
    File(PathBuf),
    EventDir(PathBuf),
}

/// Check every target, then clear the ones that may be replaced.
///
/// Nothing is removed unless every target passes.
pub(crate) fn prepare_targets(targets: &[Target], overwrite: bool) -> Result<()> {
    let mut stale_dirs = Vec::new();
    for target in targets {
        match target {
            Target::File(path) => {
                if !path.exists() {
                    continue;
                }
                if !overwrite {
                    return Err(conflict(path, "pass overwrite to replace it"));
                }
                if !path.is_file() {
                    return Err(conflict(path, "not a regular file"));
                }
            }
            Target::EventDir(path) => {
                if !path.exists() {
                    continue;
                }
                if !overwrite {
                    return Err(conflict(path, "pass overwrite to replace it"));
                }
                if !path.is_dir() {
                    return Err(conflict(path, "not a directory, refusing to delete"));
                }
                match Manifest::read(path) {
                    Ok(Some(_)) => stale_dirs.push(path),
                    Ok(None) => {
                        return Err(conflict(
                            path,
                            &format!("not written by tb-reducer (no {MANIFEST_FILE}), refusing to delete"),
                        ));
                    }
                    Err(Error::Json(e)) => {
                        return Err(conflict(
                            path,
                            &format!("unreadable {MANIFEST_FILE} ({e}), refusing to delete"),
                        ));
                    }
                    Err(e) => return Err(e),
                }
            }
        }
    }
    for dir in stale_dirs {
        debug!(dir = %dir.display(), "removing previous output");
        fs::remove_dir_all(dir)?;
    }
    Ok(())
}

fn conflict(path: &Path, detail: &str) -> Error {
    Error::OutputConflict {
        path: path.to_path_buf(),
        detail: detail.to_string(),
    }
}
