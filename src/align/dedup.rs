//! Per-run tag grouping and duplicate-step resolution

use std::collections::{BTreeMap, BTreeSet};

use rustc_hash::FxHashMap;

use super::DuplicatePolicy;
use crate::events::ScalarRecord;
use crate::{Error, Result};

/// One run's records grouped by tag, in reader order, duplicates kept.
#[derive(Debug)]
pub(crate) struct RunTable {
    pub(crate) label: String,
    pub(crate) tags: BTreeMap<String, Vec<(i64, f64)>>,
}

impl RunTable {
    pub(crate) fn from_records(label: String, records: Vec<ScalarRecord>) -> Self {
        let mut tags: BTreeMap<String, Vec<(i64, f64)>> = BTreeMap::new();
        for record in records {
            let point = (record.step(), record.value());
            match tags.get_mut(record.tag()) {
                Some(points) => points.push(point),
                None => {
                    tags.insert(record.tag().to_string(), vec![point]);
                }
            }
        }
        Self { label, tags }
    }

    pub(crate) fn tag_set(&self) -> BTreeSet<&str> {
        self.tags.keys().map(String::as_str).collect()
    }
}

/// Collapse repeated steps of one tag of one run into a step -> value map.
pub(crate) fn resolve_duplicates(
    points: &[(i64, f64)],
    policy: DuplicatePolicy,
    tag: &str,
    run: &str,
) -> Result<BTreeMap<i64, f64>> {
    let mut resolved = BTreeMap::new();
    match policy {
        DuplicatePolicy::Reject => {
            for &(step, value) in points {
                if resolved.insert(step, value).is_some() {
                    return Err(Error::DuplicateSteps {
                        tag: tag.to_string(),
                        run: run.to_string(),
                        step,
                    });
                }
            }
        }
        DuplicatePolicy::KeepFirst => {
            for &(step, value) in points {
                resolved.entry(step).or_insert(value);
            }
        }
        DuplicatePolicy::KeepLast => {
            for &(step, value) in points {
                resolved.insert(step, value);
            }
        }
        DuplicatePolicy::Mean => {
            let mut sums: FxHashMap<i64, (f64, u32)> = FxHashMap::default();
            for &(step, value) in points {
                let acc = sums.entry(step).or_insert((0.0, 0));
                acc.0 += value;
                acc.1 += 1;
            }
            resolved.extend(
                sums.into_iter()
                    .map(|(step, (sum, n))| (step, sum / f64::from(n))),
            );
        }
    }
    Ok(resolved)
}
