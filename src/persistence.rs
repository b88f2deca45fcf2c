//! Result table persistence
//!
//! Benchmark runs are stored as CSV tables with one row per algorithm run.
//! Tables are append-only by default so repeated runs build up a history;
//! readers resolve duplicates to the most recent successful row.

use crate::core::{
    BenchError, MetricsSummary, Outcome, ResultRecord, Result, RunMetrics,
};
use chrono::NaiveDateTime;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

/// Format of the Timestamp column
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Columns every result table starts with
pub const COLUMNS: [&str; 12] = [
    "Algorithm",
    "Dataset",
    "RMSE_mean",
    "RMSE_std",
    "MAE_mean",
    "MAE_std",
    "Fit_time_mean",
    "Test_time_mean",
    "Total_time",
    "CV_folds",
    "Timestamp",
    "Parameters",
];

/// Trailing column, present only when some row failed
pub const ERROR_COLUMN: &str = "Error";

/// How new rows meet an existing table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Keep existing rows and add the new ones after them
    #[default]
    Append,
    /// Replace the table
    Overwrite,
}

/// One row as it appears on disk
#[derive(Debug, Deserialize)]
struct ResultRow {
    #[serde(rename = "Algorithm")]
    algorithm: String,
    #[serde(rename = "Dataset")]
    dataset: String,
    #[serde(rename = "RMSE_mean")]
    rmse_mean: Option<f64>,
    #[serde(rename = "RMSE_std")]
    rmse_std: Option<f64>,
    #[serde(rename = "MAE_mean")]
    mae_mean: Option<f64>,
    #[serde(rename = "MAE_std")]
    mae_std: Option<f64>,
    #[serde(rename = "Fit_time_mean")]
    fit_time_mean: Option<f64>,
    #[serde(rename = "Test_time_mean")]
    test_time_mean: Option<f64>,
    #[serde(rename = "Total_time")]
    total_time: Option<f64>,
    #[serde(rename = "CV_folds")]
    cv_folds: Option<usize>,
    #[serde(rename = "Timestamp")]
    timestamp: String,
    #[serde(rename = "Parameters", default)]
    parameters: String,
    #[serde(rename = "Error", default)]
    error: Option<String>,
}

impl ResultRow {
    fn into_record(self, line: usize) -> Result<ResultRecord> {
        let timestamp = NaiveDateTime::parse_from_str(&self.timestamp, TIMESTAMP_FORMAT)
            .map_err(|e| {
                BenchError::SerializationError(format!(
                    "line {line}: bad timestamp '{}': {e}",
                    self.timestamp
                ))
            })?;

        let outcome = match self.error.filter(|e| !e.is_empty()) {
            Some(error) => Outcome::Failed(error),
            None => {
                let missing = || {
                    BenchError::SerializationError(format!(
                        "line {line}: {} has neither metrics nor an error",
                        self.algorithm
                    ))
                };
                Outcome::Success(RunMetrics {
                    summary: MetricsSummary {
                        rmse_mean: self.rmse_mean.ok_or_else(missing)?,
                        rmse_std: self.rmse_std.ok_or_else(missing)?,
                        mae_mean: self.mae_mean.ok_or_else(missing)?,
                        mae_std: self.mae_std.ok_or_else(missing)?,
                        fit_time_mean: self.fit_time_mean.ok_or_else(missing)?,
                        test_time_mean: self.test_time_mean.ok_or_else(missing)?,
                    },
                    total_time: self.total_time.ok_or_else(missing)?,
                    cv_folds: self.cv_folds.ok_or_else(missing)?,
                })
            }
        };

        Ok(ResultRecord {
            algorithm: self.algorithm,
            dataset: self.dataset,
            timestamp,
            parameters: self.parameters,
            outcome,
        })
    }
}

/// Cells of one record in column order
fn to_row(record: &ResultRecord, with_error: bool) -> Vec<String> {
    let mut row = vec![record.algorithm.clone(), record.dataset.clone()];
    match &record.outcome {
        Outcome::Success(m) => {
            let s = &m.summary;
            row.extend(
                [
                    s.rmse_mean,
                    s.rmse_std,
                    s.mae_mean,
                    s.mae_std,
                    s.fit_time_mean,
                    s.test_time_mean,
                    m.total_time,
                ]
                .iter()
                .map(|v| v.to_string()),
            );
            row.push(m.cv_folds.to_string());
        }
        Outcome::Failed(_) => row.extend(std::iter::repeat(String::new()).take(8)),
    }
    row.push(record.timestamp.format(TIMESTAMP_FORMAT).to_string());
    row.push(record.parameters.clone());
    if with_error {
        row.push(record.error().unwrap_or_default().to_string());
    }
    row
}

/// An in-memory result table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultStore {
    records: Vec<ResultRecord>,
}

impl ResultStore {
    pub fn new(records: Vec<ResultRecord>) -> Self {
        Self { records }
    }

    /// Read a result table, `ResultsNotFound` if the file does not exist
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(BenchError::ResultsNotFound(path.to_path_buf()));
        }

        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(path)?;

        let mut records = Vec::new();
        for (row_idx, row) in reader.deserialize::<ResultRow>().enumerate() {
            records.push(row?.into_record(row_idx + 2)?);
        }
        debug!("Loaded {} result rows from {}", records.len(), path.display());

        Ok(Self { records })
    }

    /// Write `records` to the table at `path`, creating directories as needed
    pub fn append<P: AsRef<Path>>(records: &[ResultRecord], path: P, mode: WriteMode) -> Result<()> {
        let path = path.as_ref();
        let mut store = match mode {
            WriteMode::Overwrite => ResultStore::default(),
            WriteMode::Append => match ResultStore::load(path) {
                Ok(store) => store,
                Err(e) if e.is_not_found() => ResultStore::default(),
                Err(e) => return Err(e),
            },
        };
        let previous = store.len();
        store.records.extend_from_slice(records);
        store.save(path)?;
        info!(
            "Wrote {} new result rows to {} ({} total)",
            records.len(),
            path.display(),
            previous + records.len()
        );
        Ok(())
    }

    /// Write the whole table, replacing any existing file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let with_error = self.records.iter().any(|r| !r.is_success());
        let mut writer = csv::Writer::from_path(path)?;

        let mut header: Vec<&str> = COLUMNS.to_vec();
        if with_error {
            header.push(ERROR_COLUMN);
        }
        writer.write_record(&header)?;
        for record in &self.records {
            writer.write_record(to_row(record, with_error))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn records(&self) -> &[ResultRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Most recent successful row for `algorithm`; ties go to the later row
    pub fn latest_successful(&self, algorithm: &str) -> Option<&ResultRecord> {
        self.records
            .iter()
            .filter(|r| r.algorithm == algorithm && r.is_success())
            .max_by_key(|r| r.timestamp)
    }

    /// Names of algorithms with at least one successful row
    pub fn successful_algorithms(&self) -> BTreeSet<&str> {
        self.records
            .iter()
            .filter(|r| r.is_success())
            .map(|r| r.algorithm.as_str())
            .collect()
    }

    /// Latest successful row of every algorithm, by algorithm name
    pub fn latest(&self) -> Vec<&ResultRecord> {
        self.successful_algorithms()
            .into_iter()
            .filter_map(|name| self.latest_successful(name))
            .collect()
    }

    pub fn failures(&self) -> Vec<&ResultRecord> {
        self.records.iter().filter(|r| !r.is_success()).collect()
    }

    /// Timestamp of the newest row
    pub fn last_run(&self) -> Option<NaiveDateTime> {
        self.records.iter().map(|r| r.timestamp).max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use tempfile::tempdir;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn metrics(rmse: f64) -> RunMetrics {
        RunMetrics {
            summary: MetricsSummary {
                rmse_mean: rmse,
                rmse_std: 0.0123456789,
                mae_mean: rmse * 0.8,
                mae_std: 0.004,
                fit_time_mean: 1.25,
                test_time_mean: 0.1 + 0.2,
            },
            total_time: 7.0000001,
            cv_folds: 5,
        }
    }

    #[test]
    fn test_round_trip_preserves_values() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results_100k.csv");
        let records = vec![
            ResultRecord::success("SVD", "100k", r#"{"n_factors":100}"#, metrics(0.9347))
                .at(at(10, 0, 0)),
            ResultRecord::success("SlopeOne", "100k", "Default", metrics(0.94)).at(at(10, 1, 0)),
        ];

        ResultStore::append(&records, &path, WriteMode::Overwrite).unwrap();
        let loaded = ResultStore::load(&path).unwrap();
        assert_eq!(loaded.records(), records.as_slice());

        let text = fs::read_to_string(&path).unwrap();
        let header = text.lines().next().unwrap();
        assert_eq!(header, COLUMNS.join(","));
        assert!(text.contains("2024-03-01 10:00:00"));
    }

    #[test]
    fn test_text_cells_reload_verbatim() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("results_100k.csv");
        let cause = BenchError::TrainingFailure(String::new()).to_string();
        assert!(cause.ends_with(' '));
        let records = vec![
            ResultRecord::failure("KNNBasic", "100k", " padded ", cause.as_str()).at(at(9, 0, 0)),
            ResultRecord::success("SVD", "100k", "Default", metrics(0.93)).at(at(9, 1, 0)),
        ];

        ResultStore::append(&records, &path, WriteMode::Overwrite).unwrap();
        let loaded = ResultStore::load(&path).unwrap();
        assert_eq!(loaded.records(), records.as_slice());
        assert_eq!(loaded.records()[0].error(), Some(cause.as_str()));
        assert_eq!(loaded.records()[0].parameters, " padded ");
    }

    #[test]
    fn test_error_column_only_when_needed() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("r.csv");

        let ok = ResultRecord::success("SVD", "100k", "Default", metrics(0.9)).at(at(9, 0, 0));
        ResultStore::new(vec![ok.clone()]).save(&path).unwrap();
        assert!(!fs::read_to_string(&path).unwrap().contains(ERROR_COLUMN));

        let failed = ResultRecord::failure("KNNBasic", "100k", r#"{"k":40}"#, "out of memory")
            .at(at(9, 5, 0));
        ResultStore::new(vec![ok, failed.clone()]).save(&path).unwrap();
        let text = fs::read_to_string(&path).unwrap();
        assert!(text.lines().next().unwrap().ends_with(",Error"));
        assert!(text.contains("KNNBasic,100k,,,,,,,,,2024-03-01 09:05:00"));

        let loaded = ResultStore::load(&path).unwrap();
        assert_eq!(loaded.records()[1], failed);
        assert_eq!(loaded.records()[1].parameters, r#"{"k":40}"#);
    }

    #[test]
    fn test_append_and_overwrite() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("results.csv");
        let first = ResultRecord::success("SVD", "100k", "Default", metrics(0.95)).at(at(8, 0, 0));
        let second = ResultRecord::success("SVD", "100k", "Default", metrics(0.93)).at(at(9, 0, 0));

        ResultStore::append(&[first.clone()], &path, WriteMode::Append).unwrap();
        ResultStore::append(&[second.clone()], &path, WriteMode::Append).unwrap();
        let loaded = ResultStore::load(&path).unwrap();
        assert_eq!(loaded.records(), &[first, second.clone()]);

        ResultStore::append(&[second.clone()], &path, WriteMode::Overwrite).unwrap();
        assert_eq!(ResultStore::load(&path).unwrap().records(), &[second]);
    }

    #[test]
    fn test_missing_table() {
        let dir = tempdir().unwrap();
        let err = ResultStore::load(dir.path().join("absent.csv")).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_latest_successful_resolution() {
        let store = ResultStore::new(vec![
            ResultRecord::success("SVD", "100k", "a", metrics(0.95)).at(at(8, 0, 0)),
            ResultRecord::success("SVD", "100k", "b", metrics(0.93)).at(at(9, 0, 0)),
            ResultRecord::failure("SVD", "100k", "c", "diverged").at(at(10, 0, 0)),
            ResultRecord::success("SVD", "100k", "d", metrics(0.92)).at(at(9, 0, 0)),
            ResultRecord::failure("KNNBasic", "100k", "e", "boom").at(at(10, 0, 0)),
        ]);

        // equal timestamps resolve to the later row
        assert_eq!(store.latest_successful("SVD").unwrap().parameters, "d");
        assert!(store.latest_successful("KNNBasic").is_none());
        assert_eq!(store.successful_algorithms().into_iter().collect::<Vec<_>>(), vec!["SVD"]);
        assert_eq!(store.failures().len(), 2);
        assert_eq!(store.last_run(), Some(at(10, 0, 0)));
    }

    #[test]
    fn test_rejects_row_without_metrics_or_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("broken.csv");
        let mut text = COLUMNS.join(",");
        text.push_str("\nSVD,100k,,,,,,,,,2024-03-01 10:00:00,Default\n");
        fs::write(&path, text).unwrap();
        assert!(matches!(
            ResultStore::load(&path),
            Err(BenchError::SerializationError(_))
        ));
    }
}
