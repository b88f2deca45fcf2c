//! CSV rating files with a header row
//!
//! Columns are located by name:
//! - `userId`, `movieId`, `rating` are required
//! - `timestamp` is optional
//! - any other column is ignored

use crate::core::{BenchError, Dataset, RatingRecord, RatingScale, Result};
use crate::data::RatingSource;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

const USER_COLUMN: &str = "userId";
const ITEM_COLUMN: &str = "movieId";
const RATING_COLUMN: &str = "rating";
const TIMESTAMP_COLUMN: &str = "timestamp";

/// Loader for headed CSV rating files (MovieLens `ratings.csv`)
#[derive(Debug, Clone)]
pub struct CsvSource {
    path: PathBuf,
    scale: RatingScale,
}

impl CsvSource {
    pub fn new<P: AsRef<Path>>(path: P, scale: RatingScale) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            scale,
        }
    }

    /// Parse ratings from any reader
    pub fn from_reader<R: Read>(reader: R, scale: RatingScale) -> Result<Dataset> {
        let mut reader = ::csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(::csv::Trim::All)
            .comment(Some(b'#'))
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let column = |name: &str| headers.iter().position(|h| h == name);

        let user_col = column(USER_COLUMN).ok_or_else(|| missing_column(USER_COLUMN))?;
        let item_col = column(ITEM_COLUMN).ok_or_else(|| missing_column(ITEM_COLUMN))?;
        let rating_col = column(RATING_COLUMN).ok_or_else(|| missing_column(RATING_COLUMN))?;
        let timestamp_col = column(TIMESTAMP_COLUMN);

        let mut records = Vec::new();
        for (row, result) in reader.records().enumerate() {
            // Row 1 is the header
            let fallback_line = row as u64 + 2;
            let record = result.map_err(|e| {
                if e.is_io_error() {
                    return BenchError::CsvError(e);
                }
                let line = e.position().map_or(fallback_line, |p| p.line());
                BenchError::MalformedDataset(format!("line {line}: {e}"))
            })?;
            let line = record.position().map_or(fallback_line, |p| p.line());

            let field = |col: usize| record.get(col).unwrap_or("");
            for (col, name) in [(user_col, USER_COLUMN), (item_col, ITEM_COLUMN)] {
                if field(col).is_empty() {
                    return Err(BenchError::MalformedDataset(format!("line {line}: empty {name}")));
                }
            }
            let rating = field(rating_col).parse::<f64>().map_err(|_| {
                BenchError::MalformedDataset(format!(
                    "line {line}: invalid rating: {}",
                    field(rating_col)
                ))
            })?;

            let timestamp = match timestamp_col.map(field) {
                Some(ts) if !ts.is_empty() => Some(ts.parse::<i64>().map_err(|_| {
                    BenchError::MalformedDataset(format!("line {line}: invalid timestamp: {ts}"))
                })?),
                _ => None,
            };

            records.push(RatingRecord::new(
                field(user_col),
                field(item_col),
                rating,
                timestamp,
            ));
        }

        Dataset::new(records, scale)
    }
}

fn missing_column(name: &str) -> BenchError {
    BenchError::MalformedDataset(format!("missing required column '{name}'"))
}

impl RatingSource for CsvSource {
    fn load(&self) -> Result<Dataset> {
        if !self.path.exists() {
            return Err(BenchError::DatasetNotFound(self.path.clone()));
        }
        let file = File::open(&self.path).map_err(BenchError::IoError)?;
        Self::from_reader(file, self.scale)
    }

    fn scale(&self) -> RatingScale {
        self.scale
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
