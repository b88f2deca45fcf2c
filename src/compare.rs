//! Side by side comparison of two result tables
//!
//! Typically used to see how each algorithm behaves on two datasets. Only
//! successful rows take part, and each algorithm is represented by its most
//! recent successful row in each table.

use crate::core::{Result, RunMetrics};
use crate::persistence::ResultStore;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

/// One algorithm present in both tables
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub algorithm: String,
    pub rmse_a: f64,
    pub rmse_b: f64,
    /// `rmse_b - rmse_a`
    pub rmse_diff: f64,
    pub mae_a: f64,
    pub mae_b: f64,
    /// `mae_b - mae_a`
    pub mae_diff: f64,
    pub time_a: f64,
    pub time_b: f64,
}

impl ComparisonRow {
    fn new(algorithm: &str, a: &RunMetrics, b: &RunMetrics) -> Self {
        Self {
            algorithm: algorithm.to_string(),
            rmse_a: a.summary.rmse_mean,
            rmse_b: b.summary.rmse_mean,
            rmse_diff: b.summary.rmse_mean - a.summary.rmse_mean,
            mae_a: a.summary.mae_mean,
            mae_b: b.summary.mae_mean,
            mae_diff: b.summary.mae_mean - a.summary.mae_mean,
            time_a: a.total_time,
            time_b: b.total_time,
        }
    }
}

/// Algorithms common to both tables, best first-table RMSE first
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonTable {
    pub label_a: String,
    pub label_b: String,
    pub rows: Vec<ComparisonRow>,
    pub only_in_first: Vec<String>,
    pub only_in_second: Vec<String>,
}

impl ComparisonTable {
    /// Column suffixes, made distinct when both labels are equal
    pub fn column_labels(&self) -> (String, String) {
        if self.label_a == self.label_b {
            (format!("{}_1", self.label_a), format!("{}_2", self.label_b))
        } else {
            (self.label_a.clone(), self.label_b.clone())
        }
    }

    /// Lowest first-table RMSE among common algorithms
    pub fn best_first(&self) -> Option<&ComparisonRow> {
        self.rows.iter().min_by(|x, y| x.rmse_a.total_cmp(&y.rmse_a))
    }

    /// Lowest second-table RMSE among common algorithms
    pub fn best_second(&self) -> Option<&ComparisonRow> {
        self.rows.iter().min_by(|x, y| x.rmse_b.total_cmp(&y.rmse_b))
    }

    pub fn header(&self) -> Vec<String> {
        let (a, b) = self.column_labels();
        vec![
            "Algorithm".to_string(),
            format!("RMSE_{a}"),
            format!("RMSE_{b}"),
            "RMSE_diff".to_string(),
            format!("MAE_{a}"),
            format!("MAE_{b}"),
            "MAE_diff".to_string(),
            format!("Time_{a}"),
            format!("Time_{b}"),
        ]
    }

    /// Write the table as CSV
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = csv::Writer::from_path(path)?;
        writer.write_record(self.header())?;
        for row in &self.rows {
            writer.write_record([
                row.algorithm.clone(),
                row.rmse_a.to_string(),
                row.rmse_b.to_string(),
                row.rmse_diff.to_string(),
                row.mae_a.to_string(),
                row.mae_b.to_string(),
                row.mae_diff.to_string(),
                row.time_a.to_string(),
                row.time_b.to_string(),
            ])?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Outcome of comparing two tables
#[derive(Debug, Clone, PartialEq)]
pub enum Comparison {
    Common(ComparisonTable),
    /// The tables share no successful algorithm
    NoCommonAlgorithms {
        only_in_first: Vec<String>,
        only_in_second: Vec<String>,
    },
}

pub struct ComparisonEngine;

impl ComparisonEngine {
    pub fn compare(
        first: &ResultStore,
        label_a: &str,
        second: &ResultStore,
        label_b: &str,
    ) -> Comparison {
        let latest = |store: &ResultStore| -> BTreeMap<String, RunMetrics> {
            store
                .latest()
                .into_iter()
                .filter_map(|r| r.metrics().map(|m| (r.algorithm.clone(), *m)))
                .collect()
        };
        let a = latest(first);
        let b = latest(second);

        let only_in_first: Vec<String> = a.keys().filter(|k| !b.contains_key(*k)).cloned().collect();
        let only_in_second: Vec<String> = b.keys().filter(|k| !a.contains_key(*k)).cloned().collect();

        let mut rows: Vec<ComparisonRow> = a
            .iter()
            .filter_map(|(name, ma)| b.get(name).map(|mb| ComparisonRow::new(name, ma, mb)))
            .collect();

        if rows.is_empty() {
            return Comparison::NoCommonAlgorithms {
                only_in_first,
                only_in_second,
            };
        }

        rows.sort_by(|x, y| {
            x.rmse_a
                .total_cmp(&y.rmse_a)
                .then_with(|| x.algorithm.cmp(&y.algorithm))
        });

        Comparison::Common(ComparisonTable {
            label_a: label_a.to_string(),
            label_b: label_b.to_string(),
            rows,
            only_in_first,
            only_in_second,
        })
    }
}
