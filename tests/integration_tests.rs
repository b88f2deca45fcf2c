//! Integration tests for the recbench library
//!
//! These tests verify end-to-end functionality across multiple modules
//! and validate real-world usage scenarios.

use approx::assert_relative_eq;
use recbench::core::{Algorithm, Dataset, Predictor, RatingRecord, RatingScale, Result};
use recbench::{
    resolve, AlgorithmEntry, AlgorithmSelection, AlgorithmSpec, BenchError, BenchmarkConfig,
    BenchmarkRunner, Comparison, ComparisonEngine, DatasetId, FailurePolicy, FoldPartitioner,
    ResultStore, RunReport, WriteMode,
};
use std::collections::HashSet;
use std::fs;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::TempDir;

/// Write a small u.data file where users fall into two taste groups
fn write_movielens_100k(dir: &TempDir) {
    let ml = dir.path().join("ml-100k");
    fs::create_dir_all(&ml).expect("Failed to create dataset dir");
    let mut file = fs::File::create(ml.join("u.data")).expect("Failed to create u.data");
    for u in 1..=30 {
        for i in 1..=20 {
            if (u * 7 + i * 3) % 5 == 0 {
                continue;
            }
            let likes = (u % 2 == 0) == (i % 2 == 0);
            let rating = if likes { 4 + (u + i) % 2 } else { 1 + (u * i) % 2 };
            writeln!(file, "{u}\t{i}\t{rating}\t8812{u:03}{i:03}").expect("Failed to write");
        }
    }
}

fn small_dataset() -> Dataset {
    let records = (0..40)
        .map(|n| RatingRecord::new(format!("u{}", n % 8), format!("i{}", n % 5), 1.0 + (n % 5) as f64, None))
        .collect();
    Dataset::new(records, RatingScale::new(1.0, 5.0).unwrap()).unwrap()
}

/// Test complete workflow: catalog dataset -> benchmark -> result table
#[test]
fn test_complete_workflow_catalog_dataset() {
    let data_dir = TempDir::new().expect("Failed to create temp dir");
    write_movielens_100k(&data_dir);
    let out_dir = TempDir::new().expect("Failed to create temp dir");

    let config = BenchmarkConfig::new()
        .with_data_dir(data_dir.path())
        .with_output_dir(out_dir.path())
        .with_folds(5)
        .with_seed(2024)
        .with_algorithms(AlgorithmSelection::parse_list(
            "NormalPredictor,BaselineOnly,KNNWithMeans,SlopeOne",
        ));
    config.validate().expect("Config should be valid");

    let dataset = config
        .dataset
        .source(&config.data_dir)
        .load()
        .expect("Dataset should load");
    assert_eq!(dataset.scale(), DatasetId::MovieLens100k.scale());

    let entries = resolve(&config.algorithm_specs().unwrap()).unwrap();
    let records = BenchmarkRunner::new(&config)
        .run(&dataset, config.dataset.name(), &entries)
        .expect("Benchmark should run");

    assert_eq!(records.len(), 4);
    for record in &records {
        let m = record.metrics().expect("Every algorithm should succeed");
        assert_eq!(m.cv_folds, 5);
        assert!(m.summary.rmse_mean >= m.summary.mae_mean);
        assert!(m.summary.rmse_std >= 0.0 && m.summary.mae_std >= 0.0);
        assert!(m.total_time >= m.summary.fit_time_mean);
    }

    // The random baseline should be the worst on structured data
    let report = RunReport::new(&records);
    assert_eq!(report.rank_by_rmse().last().unwrap().algorithm, "NormalPredictor");

    let path = config.results_path();
    assert_eq!(path, out_dir.path().join("results_100k.csv"));
    ResultStore::append(&records, &path, config.write_mode).expect("Results should be written");
    let store = ResultStore::load(&path).expect("Results should load");
    assert_eq!(store.records(), records.as_slice());
}

/// Same seed gives the same folds and therefore the same metrics
#[test]
fn test_seeded_runs_are_reproducible() {
    let data_dir = TempDir::new().expect("Failed to create temp dir");
    write_movielens_100k(&data_dir);
    let dataset = DatasetId::MovieLens100k.source(data_dir.path()).load().unwrap();

    let config = BenchmarkConfig::new()
        .with_folds(4)
        .with_seed(99)
        .with_algorithms(AlgorithmSelection::parse_list("BaselineOnly,SlopeOne"));
    let runner = BenchmarkRunner::new(&config);
    let entries = resolve(&config.algorithm_specs().unwrap()).unwrap();

    let first = runner.run(&dataset, "100k", &entries).unwrap();
    let second = runner.run(&dataset, "100k", &entries).unwrap();
    for (a, b) in first.iter().zip(&second) {
        let (ma, mb) = (a.metrics().unwrap(), b.metrics().unwrap());
        assert_relative_eq!(ma.summary.rmse_mean, mb.summary.rmse_mean, epsilon = 1e-12);
        assert_relative_eq!(ma.summary.mae_std, mb.summary.mae_std, epsilon = 1e-12);
    }
}

/// Every rating is tested exactly once across the folds
#[test]
fn test_partition_covers_dataset() {
    let dataset = small_dataset();
    let partition = FoldPartitioner::new(3, Some(1)).partition(&dataset).unwrap();

    let mut seen = HashSet::new();
    let mut sizes = Vec::new();
    for fold in partition.iter(&dataset) {
        assert_eq!(fold.train.len() + fold.test.len(), dataset.len());
        sizes.push(fold.test.len());
        for idx in partition.test_indices(fold.index) {
            assert!(seen.insert(*idx), "index {idx} tested twice");
        }
    }
    assert_eq!(seen.len(), dataset.len());
    assert_eq!(sizes, [14, 13, 13]);
}

/// Callers can benchmark their own algorithm implementations
#[test]
fn test_custom_algorithm_entry() {
    struct ItemMean;
    struct ItemMeanModel(std::collections::HashMap<String, f64>, f64);

    impl Predictor for ItemMeanModel {
        fn predict(&self, _user_id: &str, item_id: &str) -> Result<f64> {
            Ok(*self.0.get(item_id).unwrap_or(&self.1))
        }
    }

    impl Algorithm for ItemMean {
        fn name(&self) -> &str {
            "ItemMean"
        }

        fn fit(&self, train: &Dataset) -> Result<Box<dyn Predictor>> {
            let mut sums: std::collections::HashMap<String, (f64, usize)> = Default::default();
            for r in train.iter() {
                let e = sums.entry(r.item_id.clone()).or_default();
                e.0 += r.rating;
                e.1 += 1;
            }
            let means = sums.into_iter().map(|(k, (s, n))| (k, s / n as f64)).collect();
            Ok(Box::new(ItemMeanModel(means, train.global_mean())))
        }
    }

    let config = BenchmarkConfig::new().with_folds(4).with_seed(8);
    let entries = vec![AlgorithmEntry::new(AlgorithmSpec::new("ItemMean"), Box::new(ItemMean))];
    let records = BenchmarkRunner::new(&config)
        .run(&small_dataset(), "small", &entries)
        .unwrap();

    // Ratings depend only on the item, so item means are exact
    let m = records[0].metrics().unwrap();
    assert_relative_eq!(m.summary.rmse_mean, 0.0, epsilon = 1e-12);
    assert_relative_eq!(m.summary.mae_mean, 0.0, epsilon = 1e-12);
    assert_eq!(records[0].parameters, "Default");
}

/// Best-effort evaluation aggregates only the folds that succeeded
#[test]
fn test_best_effort_skips_failing_folds() {
    struct FailsFirstFit(AtomicUsize);
    struct Three;

    impl Predictor for Three {
        fn predict(&self, _user_id: &str, _item_id: &str) -> Result<f64> {
            Ok(3.0)
        }
    }

    impl Algorithm for FailsFirstFit {
        fn name(&self) -> &str {
            "FailsFirstFit"
        }

        fn fit(&self, _train: &Dataset) -> Result<Box<dyn Predictor>> {
            if self.0.fetch_add(1, Ordering::SeqCst) == 0 {
                return Err(BenchError::TrainingFailure("first fold".to_string()));
            }
            Ok(Box::new(Three))
        }
    }

    let entry = || {
        vec![AlgorithmEntry::new(
            AlgorithmSpec::new("FailsFirstFit"),
            Box::new(FailsFirstFit(AtomicUsize::new(0))),
        )]
    };

    let fail_fast = BenchmarkConfig::new().with_folds(4).with_seed(1);
    let records = BenchmarkRunner::new(&fail_fast)
        .run(&small_dataset(), "small", &entry())
        .unwrap();
    assert!(records[0].error().unwrap().contains("first fold"));

    let best_effort = fail_fast.with_failure_policy(FailurePolicy::BestEffort);
    let records = BenchmarkRunner::new(&best_effort)
        .run(&small_dataset(), "small", &entry())
        .unwrap();
    assert_eq!(records[0].metrics().unwrap().cv_folds, 3);
}

/// Two runs on different datasets compared side by side
#[test]
fn test_compare_result_tables() {
    let out_dir = TempDir::new().expect("Failed to create temp dir");
    let first_path = out_dir.path().join("results_a.csv");
    let second_path = out_dir.path().join("results_b.csv");

    let config = BenchmarkConfig::new().with_folds(2).with_seed(5);
    let runner = BenchmarkRunner::new(&config);
    let dataset = small_dataset();

    let first = runner
        .run(&dataset, "a", &resolve(&[AlgorithmSpec::new("BaselineOnly"), AlgorithmSpec::new("SlopeOne")]).unwrap())
        .unwrap();
    let second = runner
        .run(&dataset, "b", &resolve(&[AlgorithmSpec::new("SlopeOne"), AlgorithmSpec::new("KNNBasic")]).unwrap())
        .unwrap();
    ResultStore::append(&first, &first_path, WriteMode::Overwrite).unwrap();
    ResultStore::append(&second, &second_path, WriteMode::Overwrite).unwrap();

    let a = ResultStore::load(&first_path).unwrap();
    let b = ResultStore::load(&second_path).unwrap();
    match ComparisonEngine::compare(&a, "a", &b, "b") {
        Comparison::Common(table) => {
            assert_eq!(table.rows.len(), 1);
            let row = &table.rows[0];
            assert_eq!(row.algorithm, "SlopeOne");
            // Same data and folds on both sides
            assert_relative_eq!(row.rmse_diff, 0.0, epsilon = 1e-12);
            assert_eq!(table.only_in_first, ["BaselineOnly"]);
            assert_eq!(table.only_in_second, ["KNNBasic"]);
        }
        other => panic!("Expected a common algorithm, got {other:?}"),
    }
}

/// Fatal errors surface before any result is produced
#[test]
fn test_error_handling() {
    let empty_dir = TempDir::new().expect("Failed to create temp dir");
    let err = DatasetId::MovieLens32m
        .source(empty_dir.path())
        .load()
        .unwrap_err();
    assert!(matches!(err, BenchError::DatasetNotFound(_)));

    let err = resolve(&[AlgorithmSpec::new("DeepFM")]).unwrap_err();
    assert!(matches!(err, BenchError::UnknownAlgorithm(_)));

    let config = BenchmarkConfig::new().with_folds(41);
    let entries = resolve(&[AlgorithmSpec::new("SlopeOne")]).unwrap();
    let err = BenchmarkRunner::new(&config)
        .run(&small_dataset(), "small", &entries)
        .unwrap_err();
    assert!(matches!(err, BenchError::InvalidFoldCount { folds: 41, records: 40 }));

    let err = ResultStore::load(empty_dir.path().join("results_100k.csv")).unwrap_err();
    assert!(err.is_not_found());
}
