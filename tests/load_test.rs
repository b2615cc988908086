//! Integration tests for loading and aligning event-file runs

mod common;

use common::{sorted_lengths, write_duplicate_step_runs, write_lax_runs, write_strict_runs};
use tb_reducer::events::{MemoryRunSource, ScalarRecord};
use tb_reducer::{
    load, load_from, DuplicatePolicy, Error, LoadOptions, StepPolicy, TagPolicy,
};

fn lax_options() -> LoadOptions {
    LoadOptions::new()
        .tag_policy(TagPolicy::Lax)
        .step_policy(StepPolicy::Lax)
}

#[test]
fn test_strict_runs_align_into_one_frame() {
    let root = tempfile::tempdir().unwrap();
    let runs = write_strict_runs(root.path());

    let aligned = load(&runs, &LoadOptions::default()).unwrap();
    assert_eq!(aligned.tags().collect::<Vec<_>>(), vec![common::STRICT_TAG]);

    let frame = aligned.get(common::STRICT_TAG).unwrap();
    assert_eq!(frame.n_steps(), 100);
    assert_eq!(frame.n_runs(), 3);
    assert_eq!(frame.steps(), (0..100).collect::<Vec<i64>>().as_slice());

    // values are rand() + run index, so column means sit in (run, run + 1)
    let mut means: Vec<f64> = (0..3)
        .map(|j| frame.column(j).iter().sum::<f64>() / 100.0)
        .collect();
    means.sort_by(f64::total_cmp);
    for (run, mean) in (1..=3).zip(means) {
        assert!(mean > f64::from(run) && mean < f64::from(run) + 1.0, "mean {mean}");
    }
}

#[test]
fn test_lax_runs_need_both_lax_policies() {
    let root = tempfile::tempdir().unwrap();
    let runs = write_lax_runs(root.path());

    let tags_only = LoadOptions::new().tag_policy(TagPolicy::Lax);
    assert!(matches!(load(&runs, &tags_only), Err(Error::StepMismatch { .. })));

    let steps_only = LoadOptions::new().step_policy(StepPolicy::Lax);
    let err = load(&runs, &steps_only).unwrap_err();
    assert!(matches!(err, Error::TagMismatch { .. }));
    assert!(err.to_string().contains("Some tags appear only in some runs"));
}

#[test]
fn test_lax_tags_and_steps_inner_join() {
    let root = tempfile::tempdir().unwrap();
    let runs = write_lax_runs(root.path());

    let aligned = load(&runs, &lax_options()).unwrap();
    assert_eq!(
        aligned.tags().collect::<Vec<_>>(),
        vec!["lax/bar_1", "lax/bar_2", "lax/bar_3", "lax/bar_4", "lax/foo"]
    );
    assert_eq!(sorted_lengths(&aligned), vec![110, 110, 110, 120, 130]);
    assert_eq!(aligned.get("lax/foo").unwrap().n_runs(), 3);
    assert_eq!(aligned.get("lax/bar_4").unwrap().n_runs(), 1);
}

#[test]
fn test_min_runs_per_step_thresholds() {
    let root = tempfile::tempdir().unwrap();
    let runs = write_lax_runs(root.path());

    let aligned = load(&runs, &lax_options().min_runs_per_step(10)).unwrap();
    assert_eq!(aligned.len(), 5);
    assert_eq!(sorted_lengths(&aligned), vec![0; 5]);

    let aligned = load(&runs, &lax_options().min_runs_per_step(3)).unwrap();
    assert_eq!(sorted_lengths(&aligned), vec![0, 0, 0, 0, 110]);

    let aligned = load(&runs, &lax_options().min_runs_per_step(2)).unwrap();
    assert_eq!(sorted_lengths(&aligned), vec![0, 0, 110, 120, 120]);

    // steps 110..120 of lax/foo are only logged by runs 2 and 3
    let foo = aligned.get("lax/foo").unwrap();
    let last = foo.n_steps() - 1;
    assert_eq!(foo.present_count(last), 2);
}

#[test]
fn test_min_runs_per_step_zero_is_rejected() {
    let root = tempfile::tempdir().unwrap();
    let missing = root.path().join("never-read");
    let err = load(&[missing], &LoadOptions::new().min_runs_per_step(0)).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn test_duplicate_steps_policies() {
    let root = tempfile::tempdir().unwrap();
    let runs = write_duplicate_step_runs(root.path());

    let err = load(&runs, &LoadOptions::default()).unwrap_err();
    assert!(
        matches!(&err, Error::DuplicateSteps { step: 20, .. }),
        "unexpected error {err}"
    );
    assert!(err.to_string().contains("contains duplicate steps"));

    let with = |policy| {
        load(&runs, &LoadOptions::new().duplicate_policy(policy)).unwrap()
    };
    let first = with(DuplicatePolicy::KeepFirst);
    let last = with(DuplicatePolicy::KeepLast);
    let mean = with(DuplicatePolicy::Mean);

    let (first, last, mean) = (
        first.get(common::DUP_TAG).unwrap(),
        last.get(common::DUP_TAG).unwrap(),
        mean.get(common::DUP_TAG).unwrap(),
    );
    assert_eq!(first.n_steps(), 50);
    assert_eq!(first.steps(), mean.steps());
    assert_eq!(last.steps(), mean.steps());

    for i in 0..first.n_steps() {
        for j in 0..first.n_runs() {
            let expected = (first.row(i)[j] + last.row(i)[j]) / 2.0;
            assert!((expected - mean.row(i)[j]).abs() < 1e-9);
        }
    }
    // restarted steps were logged with an offset of 10
    let i = first.steps().iter().position(|s| *s == 25).unwrap();
    assert!(first.row(i)[0] < 1.0);
    assert!(last.row(i)[0] >= 10.0);
}

#[test]
fn test_partially_shared_tags_from_memory() {
    let mut source = MemoryRunSource::new();
    source.push("A", ScalarRecord::new("foo", 0, 1.0));
    source.push("B", ScalarRecord::new("foo", 0, 3.0));
    source.push("B", ScalarRecord::new("bar", 0, 5.0));

    let aligned = load_from(&source, &["A", "B"], &LoadOptions::new().tag_policy(TagPolicy::Lax)).unwrap();
    assert_eq!(aligned.get("foo").unwrap().n_runs(), 2);
    assert_eq!(aligned.get("bar").unwrap().n_runs(), 1);
    assert_eq!(aligned.get("bar").unwrap().runs(), &["B".to_string()]);

    let err = load_from(&source, &["A", "B"], &LoadOptions::default()).unwrap_err();
    match err {
        Error::TagMismatch { missing } => {
            assert_eq!(missing.len(), 1);
            assert_eq!(missing["A"], vec!["bar".to_string()]);
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[test]
fn test_missing_directory_and_empty_runs() {
    let root = tempfile::tempdir().unwrap();
    let err = load(&[root.path().join("nope")], &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));

    let empty_a = root.path().join("a");
    let empty_b = root.path().join("b");
    std::fs::create_dir_all(&empty_a).unwrap();
    std::fs::create_dir_all(&empty_b).unwrap();
    let err = load(&[empty_a, empty_b], &LoadOptions::default()).unwrap_err();
    assert!(matches!(err, Error::EmptyResult { n_dirs: 2 }));

    let none: [&str; 0] = [];
    assert!(matches!(
        load(&none, &LoadOptions::default()),
        Err(Error::Configuration(_))
    ));
}

#[test]
fn test_event_file_path_is_accepted_as_run() {
    let root = tempfile::tempdir().unwrap();
    let runs = write_strict_runs(root.path());
    let files: Vec<_> = runs
        .iter()
        .map(|dir| tb_reducer::events::event_files(dir).unwrap().remove(0))
        .collect();

    let aligned = load(&files, &LoadOptions::default()).unwrap();
    assert_eq!(aligned.get(common::STRICT_TAG).unwrap().n_steps(), 100);
}
