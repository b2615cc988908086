//! Integration tests for event-directory and flat-file outputs

mod common;

use std::fs::{self, File};
use std::path::Path;

use arrow::array::{Array, Float64Array, Int64Array};
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use tb_reducer::output::{event_dir_path, Manifest, MANIFEST_FILE};
use tb_reducer::{load, reduce, write_reduced, Error, LoadOptions, ReduceOp, ReducedTable};

fn strict_reduced(root: &Path, ops: &[&str]) -> ReducedTable {
    let runs = common::write_strict_runs(&root.join("runs"));
    let aligned = load(&runs, &LoadOptions::default()).unwrap();
    reduce(&aligned, ops).unwrap()
}

#[test]
fn test_event_dirs_per_operator() {
    let root = tempfile::tempdir().unwrap();
    let reduced = strict_reduced(root.path(), &["mean", "max", "median"]);
    let outpath = root.path().join("reduced");

    let written = write_reduced(&reduced, &outpath, false).unwrap();
    assert_eq!(written.len(), 3);
    for op in [ReduceOp::Mean, ReduceOp::Max, ReduceOp::Median] {
        let dir = event_dir_path(&outpath, op);
        assert!(written.contains(&dir));
        let manifest = Manifest::read(&dir).unwrap().unwrap();
        assert_eq!(manifest.op, op.name());
        assert_eq!(manifest.tags, vec![common::STRICT_TAG.to_string()]);
    }

    // written series read back at f32 precision
    let mean_dir = event_dir_path(&outpath, ReduceOp::Mean);
    let read_back = load(&[mean_dir], &LoadOptions::default()).unwrap();
    let frame = read_back.get(common::STRICT_TAG).unwrap();
    let expected = reduced.series(ReduceOp::Mean, common::STRICT_TAG).unwrap();
    assert_eq!(frame.steps(), expected.steps());
    for (got, want) in frame.column(0).iter().zip(expected.values()) {
        assert!((got - want).abs() < 1e-5);
    }
}

#[test]
fn test_mean_std_envelope() {
    let root = tempfile::tempdir().unwrap();
    let reduced = strict_reduced(root.path(), &["mean", "std"]);
    let outpath = root.path().join("reduced");
    write_reduced(&reduced, &outpath, false).unwrap();

    let std_dir = event_dir_path(&outpath, ReduceOp::Std);
    let upper_dir = std_dir.join("strict_foo_mean+std");
    let lower_dir = std_dir.join("strict_foo_mean-std");
    let upper = load(&[upper_dir], &LoadOptions::default()).unwrap();
    let lower = load(&[lower_dir], &LoadOptions::default()).unwrap();

    let mean = reduced.series(ReduceOp::Mean, common::STRICT_TAG).unwrap();
    let std = reduced.series(ReduceOp::Std, common::STRICT_TAG).unwrap();
    let upper = upper.get(common::STRICT_TAG).unwrap().column(0);
    let lower = lower.get(common::STRICT_TAG).unwrap().column(0);
    for i in 0..mean.len() {
        assert!((upper[i] - (mean.values()[i] + std.values()[i])).abs() < 1e-5);
        assert!((lower[i] - (mean.values()[i] - std.values()[i])).abs() < 1e-5);
    }
    // the reduced table still holds the plain std
    assert!(std.values().iter().all(|s| *s > 0.0));
}

#[test]
fn test_std_without_mean_is_written_plainly() {
    let root = tempfile::tempdir().unwrap();
    let reduced = strict_reduced(root.path(), &["std"]);
    let outpath = root.path().join("reduced");
    write_reduced(&reduced, &outpath, false).unwrap();

    let std_dir = event_dir_path(&outpath, ReduceOp::Std);
    let read_back = load(&[std_dir], &LoadOptions::default()).unwrap();
    assert_eq!(read_back.get(common::STRICT_TAG).unwrap().n_steps(), 100);
}

#[test]
fn test_overwrite_rules_for_event_dirs() {
    let root = tempfile::tempdir().unwrap();
    let reduced = strict_reduced(root.path(), &["mean"]);
    let outpath = root.path().join("reduced");

    write_reduced(&reduced, &outpath, false).unwrap();
    let err = write_reduced(&reduced, &outpath, false).unwrap_err();
    assert!(matches!(err, Error::OutputConflict { .. }));

    write_reduced(&reduced, &outpath, true).unwrap();
    let mean_dir = event_dir_path(&outpath, ReduceOp::Mean);
    let event_files = tb_reducer::events::event_files(&mean_dir).unwrap();
    assert_eq!(event_files.len(), 1, "previous output should be replaced");
}

#[test]
fn test_foreign_directory_is_protected() {
    let root = tempfile::tempdir().unwrap();
    let reduced = strict_reduced(root.path(), &["mean", "max"]);
    let outpath = root.path().join("reduced");

    let foreign = event_dir_path(&outpath, ReduceOp::Max);
    fs::create_dir_all(&foreign).unwrap();
    fs::write(foreign.join("precious.txt"), "do not delete").unwrap();

    let err = write_reduced(&reduced, &outpath, true).unwrap_err();
    assert!(matches!(err, Error::OutputConflict { .. }));
    assert!(err.to_string().contains(MANIFEST_FILE));
    assert!(foreign.join("precious.txt").exists());
    // nothing was written either
    assert!(!event_dir_path(&outpath, ReduceOp::Mean).exists());
}

#[test]
fn test_csv_output() {
    let root = tempfile::tempdir().unwrap();
    let reduced = strict_reduced(root.path(), &["mean", "std"]);
    let path = root.path().join("reduced.csv");
    write_reduced(&reduced, &path, false).unwrap();

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], ",strict/foo,strict/foo");
    assert_eq!(lines[1], ",mean,std");
    assert_eq!(lines[2], "step,,");
    assert_eq!(lines.len(), 103);
    assert!(lines[3].starts_with("0,"));
    assert_eq!(lines[3].split(',').count(), 3);

    assert!(matches!(
        write_reduced(&reduced, &path, false),
        Err(Error::OutputConflict { .. })
    ));
    write_reduced(&reduced, &path, true).unwrap();
}

#[test]
fn test_json_output() {
    let root = tempfile::tempdir().unwrap();
    let reduced = strict_reduced(root.path(), &["min", "max"]);
    let path = root.path().join("nested/reduced.json");
    write_reduced(&reduced, &path, false).unwrap();

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    let by_op = json[common::STRICT_TAG].as_object().unwrap();
    assert_eq!(by_op.len(), 2);
    assert_eq!(by_op["min"].as_object().unwrap().len(), 100);

    let expected = reduced.series(ReduceOp::Max, common::STRICT_TAG).unwrap().values()[7];
    assert_eq!(by_op["max"]["7"].as_f64().unwrap(), expected);
}

#[test]
fn test_parquet_output() {
    let root = tempfile::tempdir().unwrap();
    let reduced = strict_reduced(root.path(), &["mean", "count"]);
    let path = root.path().join("reduced.parquet");
    write_reduced(&reduced, &path, false).unwrap();

    let builder = ParquetRecordBatchReaderBuilder::try_new(File::open(&path).unwrap()).unwrap();
    let schema = builder.schema().clone();
    let names: Vec<&str> = schema.fields().iter().map(|f| f.name().as_str()).collect();
    assert_eq!(names, vec!["step", "strict/foo/mean", "strict/foo/count"]);
    let field = schema.field(1);
    assert_eq!(field.metadata()["tag"], common::STRICT_TAG);
    assert_eq!(field.metadata()["op"], "mean");

    let batches: Vec<_> = builder.build().unwrap().map(Result::unwrap).collect();
    let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
    assert_eq!(rows, 100);

    let batch = &batches[0];
    let steps = batch.column(0).as_any().downcast_ref::<Int64Array>().unwrap();
    let counts = batch.column(2).as_any().downcast_ref::<Float64Array>().unwrap();
    assert_eq!(steps.value(0), 0);
    assert_eq!(counts.value(0), 3.0);
    assert_eq!(counts.null_count(), 0);
}

#[cfg(feature = "compression")]
#[test]
fn test_gzip_csv_output() {
    use std::io::Read;

    let root = tempfile::tempdir().unwrap();
    let reduced = strict_reduced(root.path(), &["mean", "std"]);
    let path = root.path().join("reduced.csv.gz");
    let written = write_reduced(&reduced, &path, false).unwrap();
    assert_eq!(written, vec![path.clone()]);
    assert!(path.is_file());
    assert!(!event_dir_path(&path, ReduceOp::Mean).exists());

    let mut text = String::new();
    flate2::read::GzDecoder::new(File::open(&path).unwrap())
        .read_to_string(&mut text)
        .unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines[0], ",strict/foo,strict/foo");
    assert_eq!(lines[1], ",mean,std");
    assert_eq!(lines.len(), 103);
}

#[cfg(feature = "compression")]
#[test]
fn test_gzip_json_output() {
    let root = tempfile::tempdir().unwrap();
    let reduced = strict_reduced(root.path(), &["max"]);
    let path = root.path().join("reduced.json.gz");
    write_reduced(&reduced, &path, false).unwrap();

    let decoder = flate2::read::GzDecoder::new(File::open(&path).unwrap());
    let json: serde_json::Value = serde_json::from_reader(decoder).unwrap();
    let expected = reduced.series(ReduceOp::Max, common::STRICT_TAG).unwrap().values()[7];
    assert_eq!(json[common::STRICT_TAG]["max"]["7"].as_f64().unwrap(), expected);

    assert!(matches!(
        write_reduced(&reduced, &path, false),
        Err(Error::OutputConflict { .. })
    ));
}

#[cfg(feature = "compression")]
#[test]
fn test_zstd_csv_output() {
    let root = tempfile::tempdir().unwrap();
    let reduced = strict_reduced(root.path(), &["mean"]);
    let path = root.path().join("reduced.csv.zst");
    write_reduced(&reduced, &path, false).unwrap();

    let bytes = zstd::decode_all(File::open(&path).unwrap()).unwrap();
    let text = String::from_utf8(bytes).unwrap();
    assert_eq!(text.lines().next(), Some(",strict/foo"));
    assert_eq!(text.lines().count(), 103);
}

#[test]
fn test_unsupported_data_files_write_nothing() {
    let root = tempfile::tempdir().unwrap();
    let reduced = strict_reduced(root.path(), &["mean"]);
    for name in ["reduced.xlsx", "reduced.xls", "reduced.csv.bz2", "reduced.parquet.gz"] {
        let path = root.path().join(name);
        let err = write_reduced(&reduced, &path, false).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)), "{name}: {err:?}");
        assert!(!path.exists());
        assert!(!event_dir_path(&path, ReduceOp::Mean).exists());
    }
}
