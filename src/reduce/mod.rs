//! Reduction engine
//!
//! Applies named statistics across the run axis of every aligned tag. The
//! operator set is a closed registry ([`ReduceOp`]); names outside it are
//! rejected with [`Error::UnsupportedOperation`].
//!
//! ```rust
//! use tb_reducer::align::{AlignedTable, TagFrame};
//! use tb_reducer::reduce::{reduce, ReduceOp};
//!
//! # fn main() -> tb_reducer::Result<()> {
//! let frame = TagFrame::from_columns(
//!     vec![0, 1],
//!     vec![("run_1".into(), vec![1.0, 2.0]), ("run_2".into(), vec![3.0, 6.0])],
//! )?;
//! let aligned: AlignedTable = [("loss".to_string(), frame)].into_iter().collect();
//!
//! let reduced = reduce(&aligned, &["mean", "max"])?;
//! assert_eq!(reduced.series(ReduceOp::Mean, "loss").unwrap().values(), &[2.0, 4.0]);
//! assert_eq!(reduced.series(ReduceOp::Max, "loss").unwrap().values(), &[3.0, 6.0]);
//! # Ok(())
//! # }
//! ```

mod stats;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

#[cfg(feature = "rayon")]
use rayon::prelude::*;
use tracing::info;

use crate::align::{AlignedTable, TagFrame};
use crate::{Error, Result};

pub use stats::Welford;

/// Registered reduction operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ReduceOp {
    /// Arithmetic mean
    Mean,
    /// Sample standard deviation (ddof = 1)
    Std,
    /// Sample variance (ddof = 1)
    Var,
    /// Standard error of the mean
    Sem,
    /// Minimum
    Min,
    /// Maximum
    Max,
    /// Median
    Median,
    /// Sum
    Sum,
    /// Product
    Prod,
    /// Number of non-missing values
    Count,
}

impl ReduceOp {
    /// Every registered operator.
    pub const ALL: [Self; 10] = [
        Self::Mean,
        Self::Std,
        Self::Var,
        Self::Sem,
        Self::Min,
        Self::Max,
        Self::Median,
        Self::Sum,
        Self::Prod,
        Self::Count,
    ];

    /// Registered name of the operator.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mean => "mean",
            Self::Std => "std",
            Self::Var => "var",
            Self::Sem => "sem",
            Self::Min => "min",
            Self::Max => "max",
            Self::Median => "median",
            Self::Sum => "sum",
            Self::Prod => "prod",
            Self::Count => "count",
        }
    }

    /// Reduce one row of run values. Missing (`NaN`) values are skipped.
    #[must_use]
    pub fn apply(self, row: &[f64]) -> f64 {
        match self {
            Self::Mean => stats::mean(row),
            Self::Std => stats::std(row),
            Self::Var => stats::var(row),
            Self::Sem => stats::sem(row),
            Self::Min => stats::min(row),
            Self::Max => stats::max(row),
            Self::Median => stats::median(row),
            Self::Sum => stats::sum(row),
            Self::Prod => stats::prod(row),
            Self::Count => stats::count(row),
        }
    }

    /// Comma-separated names of all registered operators.
    #[must_use]
    pub fn supported() -> String {
        Self::ALL.map(Self::name).join(", ")
    }
}

impl fmt::Display for ReduceOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReduceOp {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.name() == s)
            .ok_or_else(|| Error::UnsupportedOperation {
                op: s.to_string(),
                supported: Self::supported(),
            })
    }
}

/// A single reduced column indexed by step.
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    steps: Vec<i64>,
    values: Vec<f64>,
}

impl Series {
    /// Create a series; `steps` and `values` are paired by position.
    ///
    /// # Errors
    ///
    /// Returns error if the lengths differ
    pub fn new(steps: Vec<i64>, values: Vec<f64>) -> Result<Self> {
        if steps.len() != values.len() {
            return Err(Error::Configuration(format!(
                "series has {} steps but {} values",
                steps.len(),
                values.len()
            )));
        }
        Ok(Self { steps, values })
    }

    /// Step index.
    #[must_use]
    pub fn steps(&self) -> &[i64] {
        &self.steps
    }

    /// Values, one per step.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.values
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the series has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Iterate over `(step, value)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (i64, f64)> + '_ {
        self.steps.iter().copied().zip(self.values.iter().copied())
    }

    /// Value at `step`, if the step is present.
    #[must_use]
    pub fn value_at(&self, step: i64) -> Option<f64> {
        self.steps
            .iter()
            .position(|s| *s == step)
            .map(|i| self.values[i])
    }
}

/// Reduced series per operator (request order) and tag (sorted).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReducedTable {
    by_op: Vec<(ReduceOp, BTreeMap<String, Series>)>,
}

impl ReducedTable {
    /// Operators in request order.
    pub fn ops(&self) -> impl Iterator<Item = ReduceOp> + '_ {
        self.by_op.iter().map(|(op, _)| *op)
    }

    /// Tag -> series mapping of one operator.
    #[must_use]
    pub fn get(&self, op: ReduceOp) -> Option<&BTreeMap<String, Series>> {
        self.by_op
            .iter()
            .find(|(candidate, _)| *candidate == op)
            .map(|(_, series)| series)
    }

    /// Series of one `(op, tag)` pair.
    #[must_use]
    pub fn series(&self, op: ReduceOp, tag: &str) -> Option<&Series> {
        self.get(op)?.get(tag)
    }

    /// Whether `op` was requested.
    #[must_use]
    pub fn contains(&self, op: ReduceOp) -> bool {
        self.get(op).is_some()
    }

    /// Iterate over `(op, tag -> series)` in request order.
    pub fn iter(&self) -> impl Iterator<Item = (ReduceOp, &BTreeMap<String, Series>)> + '_ {
        self.by_op.iter().map(|(op, series)| (*op, series))
    }

    /// Sorted union of tags across operators.
    #[must_use]
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self
            .by_op
            .iter()
            .flat_map(|(_, series)| series.keys().map(String::as_str))
            .collect();
        tags.sort_unstable();
        tags.dedup();
        tags
    }

    /// Number of operators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_op.len()
    }

    /// Whether no operator was requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_op.is_empty()
    }
}

/// Parse operator names, keeping their order.
///
/// # Errors
///
/// Returns error if the list is empty, a name repeats
/// ([`Error::Configuration`]) or a name is not registered
/// ([`Error::UnsupportedOperation`])
pub fn parse_ops<S: AsRef<str>>(names: &[S]) -> Result<Vec<ReduceOp>> {
    let mut ops: Vec<ReduceOp> = Vec::with_capacity(names.len());
    for name in names {
        let op: ReduceOp = name.as_ref().trim().parse()?;
        if ops.contains(&op) {
            return Err(Error::Configuration(format!(
                "reduce operation '{op}' requested more than once"
            )));
        }
        ops.push(op);
    }
    if ops.is_empty() {
        return Err(Error::Configuration(
            "expected at least one reduce operation".to_string(),
        ));
    }
    Ok(ops)
}

/// Reduce every tag of `aligned` with every named operator.
///
/// # Errors
///
/// See [`parse_ops`] and [`reduce_with`]
pub fn reduce<S: AsRef<str>>(aligned: &AlignedTable, ops: &[S]) -> Result<ReducedTable> {
    reduce_with(aligned, &parse_ops(ops)?)
}

/// Reduce every tag of `aligned` with every operator of `ops`.
///
/// Each output series has as many rows as its tag frame. An empty aligned
/// table yields one empty mapping per operator.
///
/// # Errors
///
/// Returns error if `ops` is empty or repeats an operator
/// ([`Error::Configuration`]), or a tag frame has no run columns
/// ([`Error::NoRuns`])
pub fn reduce_with(aligned: &AlignedTable, ops: &[ReduceOp]) -> Result<ReducedTable> {
    let names: Vec<&str> = ops.iter().map(|op| op.name()).collect();
    parse_ops(&names)?;

    if let Some((tag, _)) = aligned.iter().find(|(_, frame)| frame.n_runs() == 0) {
        return Err(Error::NoRuns {
            tag: tag.to_string(),
        });
    }

    let jobs: Vec<(usize, &str, &TagFrame)> = (0..ops.len())
        .flat_map(|op_idx| aligned.iter().map(move |(tag, frame)| (op_idx, tag, frame)))
        .collect();

    #[cfg(feature = "rayon")]
    let jobs = jobs.into_par_iter();
    #[cfg(not(feature = "rayon"))]
    let jobs = jobs.into_iter();
    let results: Vec<(usize, &str, Series)> = jobs
        .map(|(op_idx, tag, frame)| (op_idx, tag, reduce_frame(ops[op_idx], frame)))
        .collect();

    let mut by_op: Vec<(ReduceOp, BTreeMap<String, Series>)> =
        ops.iter().map(|op| (*op, BTreeMap::new())).collect();
    for (op_idx, tag, series) in results {
        by_op[op_idx].1.insert(tag.to_string(), series);
    }

    info!(
        "Reduced {} scalars with {} operations: ({})",
        aligned.len(),
        ops.len(),
        names.join(", ")
    );
    Ok(ReducedTable { by_op })
}

fn reduce_frame(op: ReduceOp, frame: &TagFrame) -> Series {
    let values = frame.rows().map(|(_, row)| op.apply(row)).collect();
    Series {
        steps: frame.steps().to_vec(),
        values,
    }
}
