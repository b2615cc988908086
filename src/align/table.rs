//! Aligned tables: steps × runs per tag

use std::collections::BTreeMap;

use rustc_hash::FxHashSet;

use crate::{Error, Result};

/// Aligned values of one tag: one row per step, one column per run.
///
/// Values are stored row-major. A missing value (a run that did not log the
/// step under an outer join) is `NaN`.
#[derive(Debug, Clone, PartialEq)]
pub struct TagFrame {
    steps: Vec<i64>,
    runs: Vec<String>,
    values: Vec<f64>,
}

impl TagFrame {
    /// Build a frame from per-step rows.
    ///
    /// # Errors
    ///
    /// Returns error if the row count differs from the step count, a row's
    /// width differs from the run count, or a step appears twice
    pub fn new(steps: Vec<i64>, runs: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if rows.len() != steps.len() {
            return Err(Error::Configuration(format!(
                "got {} rows for {} steps",
                rows.len(),
                steps.len()
            )));
        }
        let mut seen = FxHashSet::default();
        if let Some(step) = steps.iter().find(|step| !seen.insert(**step)) {
            return Err(Error::Configuration(format!(
                "step {step} appears more than once in an aligned frame"
            )));
        }

        let width = runs.len();
        let mut values = Vec::with_capacity(steps.len() * width);
        for (row, step) in rows.into_iter().zip(&steps) {
            if row.len() != width {
                return Err(Error::Configuration(format!(
                    "row for step {step} has {} values, expected {width}",
                    row.len()
                )));
            }
            values.extend(row);
        }
        Ok(Self {
            steps,
            runs,
            values,
        })
    }

    /// Build a frame from run columns sharing one step index.
    ///
    /// # Errors
    ///
    /// Returns error if a column's length differs from the step count or a
    /// step appears twice
    pub fn from_columns(steps: Vec<i64>, columns: Vec<(String, Vec<f64>)>) -> Result<Self> {
        let (runs, columns): (Vec<String>, Vec<Vec<f64>>) = columns.into_iter().unzip();
        if let Some(col) = columns.iter().find(|col| col.len() != steps.len()) {
            return Err(Error::Configuration(format!(
                "column has {} values for {} steps",
                col.len(),
                steps.len()
            )));
        }
        let rows = (0..steps.len())
            .map(|i| columns.iter().map(|col| col[i]).collect())
            .collect();
        Self::new(steps, runs, rows)
    }

    /// Step index of each row.
    #[must_use]
    pub fn steps(&self) -> &[i64] {
        &self.steps
    }

    /// Column labels (run directories).
    #[must_use]
    pub fn runs(&self) -> &[String] {
        &self.runs
    }

    /// Number of rows.
    #[must_use]
    pub fn n_steps(&self) -> usize {
        self.steps.len()
    }

    /// Number of run columns.
    #[must_use]
    pub fn n_runs(&self) -> usize {
        self.runs.len()
    }

    /// Whether the frame has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Values of row `i`, one per run.
    ///
    /// # Panics
    ///
    /// Panics if `i >= self.n_steps()`
    #[must_use]
    pub fn row(&self, i: usize) -> &[f64] {
        let width = self.runs.len();
        &self.values[i * width..(i + 1) * width]
    }

    /// Iterate over `(step, row)` pairs.
    pub fn rows(&self) -> impl Iterator<Item = (i64, &[f64])> + '_ {
        self.steps
            .iter()
            .enumerate()
            .map(move |(i, step)| (*step, self.row(i)))
    }

    /// Values of run column `j`, one per step.
    #[must_use]
    pub fn column(&self, j: usize) -> Vec<f64> {
        (0..self.steps.len()).map(|i| self.row(i)[j]).collect()
    }

    /// Number of non-missing values in row `i`.
    #[must_use]
    pub fn present_count(&self, i: usize) -> usize {
        self.row(i).iter().filter(|v| !v.is_nan()).count()
    }

    /// Value logged by run column `run` at `step`, `None` if absent.
    #[must_use]
    pub fn value(&self, step: i64, run: usize) -> Option<f64> {
        let i = self.steps.iter().position(|s| *s == step)?;
        self.row(i).get(run).copied().filter(|v| !v.is_nan())
    }
}

/// Aligned frames keyed by tag, in tag order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AlignedTable {
    frames: BTreeMap<String, TagFrame>,
}

impl AlignedTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the frame of a tag, returning the frame it replaced.
    pub fn insert(&mut self, tag: impl Into<String>, frame: TagFrame) -> Option<TagFrame> {
        self.frames.insert(tag.into(), frame)
    }

    /// Frame of one tag.
    #[must_use]
    pub fn get(&self, tag: &str) -> Option<&TagFrame> {
        self.frames.get(tag)
    }

    /// Number of tags.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether the table holds no tags.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Tags in sorted order.
    pub fn tags(&self) -> impl Iterator<Item = &str> + '_ {
        self.frames.keys().map(String::as_str)
    }

    /// Iterate over `(tag, frame)` pairs in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TagFrame)> + '_ {
        self.frames.iter().map(|(tag, frame)| (tag.as_str(), frame))
    }
}

impl FromIterator<(String, TagFrame)> for AlignedTable {
    fn from_iter<I: IntoIterator<Item = (String, TagFrame)>>(iter: I) -> Self {
        Self {
            frames: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for AlignedTable {
    type Item = (String, TagFrame);
    type IntoIter = std::collections::btree_map::IntoIter<String, TagFrame>;

    fn into_iter(self) -> Self::IntoIter {
        self.frames.into_iter()
    }
}
