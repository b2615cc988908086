//! # tb-reducer: aggregate TensorBoard runs
//!
//! Reads scalar series from several TensorBoard run directories (typically
//! the same experiment repeated with different seeds), aligns them by tag
//! and step, reduces across runs with statistics such as mean, std or
//! median, and writes the result back as event directories or a flat file.
//!
//! ## Pipeline
//!
//! - [`events`]: event-file reader/writer and the [`events::RunSource`] seam
//! - [`align`]: tag/step alignment with configurable strictness
//! - [`reduce`]: the operator registry ([`ReduceOp`])
//! - [`output`]: event directories, CSV, JSON (optionally compressed) and Parquet
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use tb_reducer::{load, reduce, write_reduced, LoadOptions};
//!
//! let runs = ["runs/seed-1", "runs/seed-2", "runs/seed-3"];
//! let aligned = load(&runs, &LoadOptions::default())?;
//! let reduced = reduce(&aligned, &["mean", "std"])?;
//! write_reduced(&reduced, "runs/reduced", false)?;
//! # Ok::<(), tb_reducer::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod align;
pub mod error;
pub mod events;
pub mod output;
pub mod reduce;

pub use align::{
    load, load_from, AlignedTable, DuplicatePolicy, LoadOptions, StepPolicy, TagFrame, TagPolicy,
};
pub use error::{Error, Result};
pub use output::{write_reduced, OutputFormat};
pub use reduce::{reduce, reduce_with, ReduceOp, ReducedTable, Series};
