//! Event-directory output

use std::path::{Path, PathBuf};

use tracing::info;

use super::envelope::{tag_dir_name, Envelope};
use super::{prepare_targets, Manifest, Target};
use crate::events::EventFileWriter;
use crate::reduce::{ReduceOp, ReducedTable, Series};
use crate::Result;

/// Directory holding the reduction `op` for output path `outpath`.
#[must_use]
pub fn event_dir_path(outpath: &Path, op: ReduceOp) -> PathBuf {
    let mut name = outpath.as_os_str().to_owned();
    name.push(format!("-{op}"));
    PathBuf::from(name)
}

/// Write one TensorBoard event directory per operator.
///
/// Every directory gets a [`Manifest`](super::Manifest). When both `mean`
/// and `std` were computed, the `std` directory holds the mean ± std
/// envelope in sub-directories `{tag}_mean+std` and `{tag}_mean-std`.
///
/// # Errors
///
/// Returns [`Error::OutputConflict`](crate::Error::OutputConflict) if a
/// directory exists and may not be replaced, or an I/O error
pub fn write_event_dirs(
    reduced: &ReducedTable,
    outpath: impl AsRef<Path>,
    overwrite: bool,
) -> Result<Vec<PathBuf>> {
    let outpath = outpath.as_ref();
    let targets: Vec<Target> = reduced
        .ops()
        .map(|op| Target::EventDir(event_dir_path(outpath, op)))
        .collect();
    prepare_targets(&targets, overwrite)?;

    let mean = reduced.get(ReduceOp::Mean);
    let mut written = Vec::with_capacity(reduced.len());
    for (op, series_by_tag) in reduced.iter() {
        let dir = event_dir_path(outpath, op);
        match (op, mean) {
            (ReduceOp::Std, Some(mean)) => {
                for (tag, std) in series_by_tag {
                    let Some(mean) = mean.get(tag) else {
                        continue;
                    };
                    let band = Envelope::new(mean, std)?;
                    let base = tag_dir_name(tag);
                    write_series(&dir.join(format!("{base}_mean+std")), [(tag.as_str(), &band.upper)])?;
                    write_series(&dir.join(format!("{base}_mean-std")), [(tag.as_str(), &band.lower)])?;
                }
                if series_by_tag.is_empty() {
                    std::fs::create_dir_all(&dir)?;
                }
            }
            _ => {
                write_series(
                    &dir,
                    series_by_tag.iter().map(|(tag, series)| (tag.as_str(), series)),
                )?;
            }
        }
        Manifest::new(op, series_by_tag.keys().cloned().collect()).write(&dir)?;
        info!("Wrote '{op}' reduction of {} tags to '{}'", series_by_tag.len(), dir.display());
        written.push(dir);
    }
    Ok(written)
}

fn write_series<'a>(
    dir: &Path,
    series: impl IntoIterator<Item = (&'a str, &'a Series)>,
) -> Result<()> {
    let mut writer = EventFileWriter::create(dir)?;
    for (tag, series) in series {
        for (step, value) in series.iter() {
            writer.add_scalar(tag, value, step)?;
        }
    }
    writer.close()
}
