//! Alignment engine
//!
//! Turns one record stream per run into one [`TagFrame`] per tag:
//!
//! 1. group each run's records by tag
//! 2. check that runs agree on their tags ([`TagPolicy`])
//! 3. resolve repeated steps inside each run ([`DuplicatePolicy`])
//! 4. check that runs agree on step counts per tag ([`StepPolicy`])
//! 5. join the runs of each tag: inner join by default, outer join filtered
//!    by `min_runs_per_step` when set
//!
//! ## Example
//!
//! ```rust
//! use tb_reducer::align::{load_from, LoadOptions, TagPolicy};
//! use tb_reducer::events::{MemoryRunSource, ScalarRecord};
//!
//! # fn main() -> tb_reducer::Result<()> {
//! let mut source = MemoryRunSource::new();
//! for (run, offset) in [("run_a", 0.0), ("run_b", 1.0)] {
//!     for step in 0..10 {
//!         source.push(run, ScalarRecord::new("loss", step, offset + 1.0 / (step as f64 + 1.0)));
//!     }
//! }
//! source.push("run_b", ScalarRecord::new("lr", 0, 0.1));
//!
//! let options = LoadOptions::new().tag_policy(TagPolicy::Lax);
//! let aligned = load_from(&source, &["run_a", "run_b"], &options)?;
//!
//! assert_eq!(aligned.get("loss").unwrap().n_runs(), 2);
//! assert_eq!(aligned.get("lr").unwrap().n_runs(), 1);
//! # Ok(())
//! # }
//! ```

mod dedup;
mod table;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

#[cfg(feature = "rayon")]
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::events::{EventFileSource, RunSource};
use crate::{Error, Result};
use dedup::{resolve_duplicates, RunTable};

pub use table::{AlignedTable, TagFrame};

/// Whether all runs must log the same set of tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TagPolicy {
    /// Identical tag sets required
    #[default]
    Strict,
    /// Each tag is aligned over the runs that contain it
    Lax,
}

/// Whether all runs must log the same number of steps for a shared tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StepPolicy {
    /// Equal step counts required
    #[default]
    Strict,
    /// Unequal step counts accepted
    Lax,
}

/// How to treat several values logged for the same tag and step in one run.
///
/// "First" and "last" follow the reader's record order (event files in name
/// order, records in file order), not wall-clock time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DuplicatePolicy {
    /// Fail with [`Error::DuplicateSteps`]
    #[default]
    Reject,
    /// Keep the first value
    KeepFirst,
    /// Keep the last value
    KeepLast,
    /// Keep the arithmetic mean of the values
    Mean,
}

impl DuplicatePolicy {
    /// CLI spelling of the policy.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Reject => "none",
            Self::KeepFirst => "keep-first",
            Self::KeepLast => "keep-last",
            Self::Mean => "mean",
        }
    }
}

impl fmt::Display for DuplicatePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DuplicatePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "none" => Ok(Self::Reject),
            "keep-first" => Ok(Self::KeepFirst),
            "keep-last" => Ok(Self::KeepLast),
            "mean" => Ok(Self::Mean),
            other => Err(Error::Configuration(format!(
                "unknown duplicate-step policy '{other}', expected one of: none, keep-first, keep-last, mean"
            ))),
        }
    }
}

/// Alignment settings. The default is strict tags, strict steps, duplicate
/// steps rejected and inner join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoadOptions {
    /// Tag consistency policy
    pub tag_policy: TagPolicy,
    /// Step consistency policy
    pub step_policy: StepPolicy,
    /// Duplicate-step policy
    pub duplicate_policy: DuplicatePolicy,
    /// Outer-join threshold; `None` means inner join
    pub min_runs_per_step: Option<usize>,
}

impl LoadOptions {
    /// Strict defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            tag_policy: TagPolicy::Strict,
            step_policy: StepPolicy::Strict,
            duplicate_policy: DuplicatePolicy::Reject,
            min_runs_per_step: None,
        }
    }

    /// Set the tag consistency policy
    #[must_use]
    pub const fn tag_policy(mut self, policy: TagPolicy) -> Self {
        self.tag_policy = policy;
        self
    }

    /// Set the step consistency policy
    #[must_use]
    pub const fn step_policy(mut self, policy: StepPolicy) -> Self {
        self.step_policy = policy;
        self
    }

    /// Set the duplicate-step policy
    #[must_use]
    pub const fn duplicate_policy(mut self, policy: DuplicatePolicy) -> Self {
        self.duplicate_policy = policy;
        self
    }

    /// Keep the union of steps and drop rows logged by fewer than `min_runs` runs.
    ///
    /// **Warning**: the number of runs behind each reduced value then changes
    /// along the series, e.g. a mean over 10 runs that drops to 4 once the
    /// shorter runs end.
    #[must_use]
    pub const fn min_runs_per_step(mut self, min_runs: usize) -> Self {
        self.min_runs_per_step = Some(min_runs);
        self
    }

    fn validate(&self) -> Result<()> {
        if self.min_runs_per_step == Some(0) {
            return Err(Error::Configuration(
                "got min_runs_per_step=0, expected a positive integer".to_string(),
            ));
        }
        Ok(())
    }
}

/// Load and align the TensorBoard event files of `run_dirs`.
///
/// # Errors
///
/// See [`load_from`]
pub fn load<P: AsRef<Path> + Sync>(run_dirs: &[P], options: &LoadOptions) -> Result<AlignedTable> {
    load_from(&EventFileSource::new(), run_dirs, options)
}

/// Read `run_dirs` through `source` and align them per tag.
///
/// # Errors
///
/// Returns error if:
/// - `run_dirs` is empty or `min_runs_per_step` is zero ([`Error::Configuration`])
/// - a run cannot be read
/// - tag sets differ under [`TagPolicy::Strict`] ([`Error::TagMismatch`])
/// - a run repeats a step under [`DuplicatePolicy::Reject`] ([`Error::DuplicateSteps`])
/// - step counts differ under [`StepPolicy::Strict`] ([`Error::StepMismatch`])
/// - no run holds any scalar ([`Error::EmptyResult`])
pub fn load_from<S, P>(source: &S, run_dirs: &[P], options: &LoadOptions) -> Result<AlignedTable>
where
    S: RunSource + ?Sized,
    P: AsRef<Path> + Sync,
{
    if run_dirs.is_empty() {
        return Err(Error::Configuration(
            "expected a non-empty list of run directories".to_string(),
        ));
    }
    options.validate()?;

    let runs = read_runs(source, run_dirs)?;

    if options.tag_policy == TagPolicy::Strict {
        check_tags(&runs)?;
    }

    let n_runs = runs.len();
    let mut by_tag: BTreeMap<String, Vec<(String, BTreeMap<i64, f64>)>> = BTreeMap::new();
    for run in runs {
        for (tag, points) in &run.tags {
            let resolved = resolve_duplicates(points, options.duplicate_policy, tag, &run.label)?;
            by_tag
                .entry(tag.clone())
                .or_default()
                .push((run.label.clone(), resolved));
        }
    }

    if options.step_policy == StepPolicy::Strict {
        check_steps(&by_tag)?;
    }

    if by_tag.is_empty() {
        return Err(Error::EmptyResult { n_dirs: n_runs });
    }

    let aligned: AlignedTable = by_tag
        .into_iter()
        .map(|(tag, columns)| {
            if columns.len() < n_runs {
                warn!(
                    tag = %tag,
                    runs = columns.len(),
                    of = n_runs,
                    "tag is aligned over a subset of runs"
                );
            }
            let frame = join(columns, options.min_runs_per_step)?;
            Ok((tag, frame))
        })
        .collect::<Result<_>>()?;

    log_summary(&aligned, n_runs);
    Ok(aligned)
}

fn read_runs<S, P>(source: &S, run_dirs: &[P]) -> Result<Vec<RunTable>>
where
    S: RunSource + ?Sized,
    P: AsRef<Path> + Sync,
{
    let read_one = |dir: &P| -> Result<RunTable> {
        let dir = dir.as_ref();
        let records = source.read_run(dir)?;
        debug!(run = %dir.display(), scalars = records.len(), "loaded run");
        Ok(RunTable::from_records(dir.display().to_string(), records))
    };

    #[cfg(feature = "rayon")]
    let runs = run_dirs.par_iter().map(read_one).collect();
    #[cfg(not(feature = "rayon"))]
    let runs = run_dirs.iter().map(read_one).collect();

    runs
}

fn check_tags(runs: &[RunTable]) -> Result<()> {
    let tag_sets: Vec<BTreeSet<&str>> = runs.iter().map(RunTable::tag_set).collect();
    let union: BTreeSet<&str> = tag_sets.iter().flatten().copied().collect();

    let missing: BTreeMap<String, Vec<String>> = runs
        .iter()
        .zip(&tag_sets)
        .filter(|(_, tags)| tags.len() < union.len())
        .map(|(run, tags)| {
            let lacking = union
                .difference(tags)
                .map(|tag| (*tag).to_string())
                .collect();
            (run.label.clone(), lacking)
        })
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::TagMismatch { missing })
    }
}

fn check_steps(by_tag: &BTreeMap<String, Vec<(String, BTreeMap<i64, f64>)>>) -> Result<()> {
    for (tag, columns) in by_tag {
        let counts: Vec<usize> = columns.iter().map(|(_, steps)| steps.len()).collect();
        if counts.windows(2).any(|pair| pair[0] != pair[1]) {
            return Err(Error::StepMismatch {
                tag: tag.clone(),
                counts,
            });
        }
    }
    Ok(())
}

/// Join deduplicated run columns of one tag on their steps.
fn join(columns: Vec<(String, BTreeMap<i64, f64>)>, min_runs: Option<usize>) -> Result<TagFrame> {
    let (runs, maps): (Vec<String>, Vec<BTreeMap<i64, f64>>) = columns.into_iter().unzip();

    let (steps, rows): (Vec<i64>, Vec<Vec<f64>>) = match min_runs {
        None => {
            // inner join: steps logged by every run
            let Some((first, rest)) = maps.split_first() else {
                return TagFrame::new(Vec::new(), runs, Vec::new());
            };
            first
                .keys()
                .filter(|step| rest.iter().all(|m| m.contains_key(*step)))
                .map(|step| (*step, maps.iter().map(|m| m[step]).collect::<Vec<f64>>()))
                .unzip()
        }
        Some(k) => {
            // outer join: union of steps, thresholded on present values
            let union: BTreeSet<i64> = maps.iter().flat_map(|m| m.keys().copied()).collect();
            union
                .into_iter()
                .map(|step| {
                    let row: Vec<f64> = maps
                        .iter()
                        .map(|m| m.get(&step).copied().unwrap_or(f64::NAN))
                        .collect();
                    (step, row)
                })
                .filter(|(_, row)| row.iter().filter(|v| !v.is_nan()).count() >= k)
                .unzip()
        }
    };

    TagFrame::new(steps, runs, rows)
}

fn log_summary(aligned: &AlignedTable, n_runs: usize) {
    let mut lengths = aligned.iter().map(|(_, frame)| frame.n_steps());
    let first = lengths.next().unwrap_or(0);
    if lengths.all(|n| n == first) {
        info!(
            "Loaded {n_runs} runs with {} scalars and {first} steps each",
            aligned.len()
        );
    } else {
        info!("Loaded {n_runs} runs with {} scalars", aligned.len());
    }
}
