//! Run-directory fixtures written with `EventFileWriter`
//!
//! Every test builds its own fixture inside a fresh temporary directory.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tb_reducer::events::EventFileWriter;

/// Tag logged by [`write_strict_runs`]
pub const STRICT_TAG: &str = "strict/foo";

/// Tag logged by [`write_duplicate_step_runs`]
pub const DUP_TAG: &str = "dup_steps/foo";

/// Three runs logging one tag at steps `0..100` with values `rand() + run`.
pub fn write_strict_runs(root: &Path) -> Vec<PathBuf> {
    let mut rng = StdRng::seed_from_u64(42);
    (1..=3)
        .map(|run| {
            let dir = root.join(format!("strict/run_{run}"));
            let mut writer = EventFileWriter::create(&dir).unwrap();
            for step in 0..100 {
                let value = rng.gen::<f64>() + f64::from(run);
                writer.add_scalar(STRICT_TAG, value, step).unwrap();
            }
            writer.close().unwrap();
            dir
        })
        .collect()
}

/// Three runs with unequal steps (`100 + 10 * run`) and partly shared tags:
/// `lax/foo`, `lax/bar_{run}` and `lax/bar_{run + 1}`.
pub fn write_lax_runs(root: &Path) -> Vec<PathBuf> {
    let mut rng = StdRng::seed_from_u64(7);
    (1..=3)
        .map(|run: i64| {
            let dir = root.join(format!("lax/run_{run}"));
            let mut writer = EventFileWriter::create(&dir).unwrap();
            let tags = [
                "lax/foo".to_string(),
                format!("lax/bar_{run}"),
                format!("lax/bar_{}", run + 1),
            ];
            for step in 0..(100 + 10 * run) {
                for tag in &tags {
                    writer.add_scalar(tag, rng.gen::<f64>(), step).unwrap();
                }
            }
            writer.close().unwrap();
            dir
        })
        .collect()
}

/// Two runs logging steps `0..50`, then steps `20..30` again into a second
/// event file, so every repeated step has exactly two values.
pub fn write_duplicate_step_runs(root: &Path) -> Vec<PathBuf> {
    let mut rng = StdRng::seed_from_u64(3);
    (1..=2)
        .map(|run| {
            let dir = root.join(format!("duplicate_steps/run_{run}"));
            let mut first = EventFileWriter::create(&dir).unwrap();
            for step in 0..50 {
                first.add_scalar(DUP_TAG, rng.gen::<f64>(), step).unwrap();
            }
            first.close().unwrap();

            let mut restart = EventFileWriter::create(&dir).unwrap();
            for step in 20..30 {
                restart.add_scalar(DUP_TAG, 10.0 + rng.gen::<f64>(), step).unwrap();
            }
            restart.close().unwrap();
            dir
        })
        .collect()
}

/// Sorted row counts of every aligned tag.
pub fn sorted_lengths(aligned: &tb_reducer::AlignedTable) -> Vec<usize> {
    let mut lengths: Vec<usize> = aligned.iter().map(|(_, frame)| frame.n_steps()).collect();
    lengths.sort_unstable();
    lengths
}
