//! Error types for tb-reducer
//!
//! Every data-integrity violation is its own variant so callers (and the CLI)
//! can tell a tag mismatch from a corrupt file without string matching.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::PathBuf;

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// tb-reducer error types
#[derive(Error, Debug)]
pub enum Error {
    /// Empty or invalid caller-supplied arguments
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// Runs disagree on their tag sets under the strict tag policy
    #[error(
        "Some tags appear only in some runs but not others:\n{}\nIf this is intentional, \
         pass --lax-tags to the CLI or TagPolicy::Lax to the library. Each tag will then be \
         reduced over however many runs contain it, even if that's just one.",
        render_missing_tags(.missing)
    )]
    TagMismatch {
        /// Run directory -> tags of the union that the run lacks
        missing: BTreeMap<String, Vec<String>>,
    },

    /// Runs disagree on the number of steps for a shared tag under the strict step policy
    #[error(
        "Unequal number of steps {counts:?} across runs for tag '{tag}'. If this is \
         intentional, pass --lax-steps to the CLI or StepPolicy::Lax to the library. Each \
         reduction will then only use the steps present in every run."
    )]
    StepMismatch {
        /// Offending tag
        tag: String,
        /// Deduplicated step count per contributing run, in input order
        counts: Vec<usize>,
    },

    /// Duplicate steps within one run while duplicates are rejected
    #[error(
        "Tag '{tag}' from run directory '{run}' contains duplicate steps (first repeat at \
         step {step}). Pass --handle-dup-steps keep-first|keep-last|mean to the CLI or a \
         DuplicatePolicy to the library to resolve them."
    )]
    DuplicateSteps {
        /// Offending tag
        tag: String,
        /// Run directory the tag was read from
        run: String,
        /// First step found twice
        step: i64,
    },

    /// No tags survived loading
    #[error("Got {n_dirs} input directories but no scalar data was found inside them")]
    EmptyResult {
        /// Number of run directories that were read
        n_dirs: usize,
    },

    /// Unknown reduction operator
    #[error("Unsupported reduce operation '{op}', expected one of: {supported}")]
    UnsupportedOperation {
        /// Requested operator name
        op: String,
        /// Comma-separated registered operator names
        supported: String,
    },

    /// A tag frame without run columns reached the reduction engine
    #[error("Tag '{tag}' has no run columns to reduce over")]
    NoRuns {
        /// Offending tag
        tag: String,
    },

    /// Output target already exists and may not be replaced
    #[error("Output path '{}' already exists: {detail}", .path.display())]
    OutputConflict {
        /// Conflicting path
        path: PathBuf,
        /// Why the path cannot be replaced
        detail: String,
    },

    /// Event file failed framing or checksum validation
    #[error("Corrupt event file '{}': {detail}", .path.display())]
    CorruptEventFile {
        /// Event file path
        path: PathBuf,
        /// What went wrong
        detail: String,
    },

    /// Protobuf decode error
    #[error("Event decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Arrow error
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Parquet error
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

fn render_missing_tags(missing: &BTreeMap<String, Vec<String>>) -> String {
    let mut out = String::new();
    for (run, tags) in missing {
        let _ = writeln!(out, "- {run} missing tags: {}", tags.join(", "));
    }
    out
}
