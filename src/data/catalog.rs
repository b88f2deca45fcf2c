//! Known datasets and where to find them

use crate::core::{BenchError, RatingScale, Result};
use crate::data::{CsvSource, DelimitedSource, RatingSource};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// On-disk layout of a rating file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    /// `user item rating timestamp`, whitespace separated
    Delimited,
    /// Headed CSV with `userId,movieId,rating[,timestamp]`
    Csv,
}

impl SourceFormat {
    /// Guess the format from a file extension
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("csv") => SourceFormat::Csv,
            _ => SourceFormat::Delimited,
        }
    }

    /// Build a loader for `path` in this format
    pub fn source<P: AsRef<Path>>(self, path: P, scale: RatingScale) -> Box<dyn RatingSource> {
        match self {
            SourceFormat::Delimited => Box::new(DelimitedSource::new(path, scale)),
            SourceFormat::Csv => Box::new(CsvSource::new(path, scale)),
        }
    }
}

impl FromStr for SourceFormat {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "delimited" | "tsv" | "data" => Ok(SourceFormat::Delimited),
            "csv" => Ok(SourceFormat::Csv),
            other => Err(BenchError::InvalidParameter(format!(
                "Unsupported format: {other}. Use 'delimited' or 'csv'"
            ))),
        }
    }
}

/// MovieLens releases the benchmark knows how to load
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DatasetId {
    #[serde(rename = "100k")]
    MovieLens100k,
    #[serde(rename = "32m")]
    MovieLens32m,
}

impl DatasetId {
    pub const ALL: [DatasetId; 2] = [DatasetId::MovieLens100k, DatasetId::MovieLens32m];

    /// Short name used in result tables and file names
    pub fn name(self) -> &'static str {
        match self {
            DatasetId::MovieLens100k => "100k",
            DatasetId::MovieLens32m => "32m",
        }
    }

    /// Path of the ratings file relative to the data directory
    pub fn relative_path(self) -> &'static str {
        match self {
            DatasetId::MovieLens100k => "ml-100k/u.data",
            DatasetId::MovieLens32m => "ml-32m/ratings.csv",
        }
    }

    pub fn format(self) -> SourceFormat {
        match self {
            DatasetId::MovieLens100k => SourceFormat::Delimited,
            DatasetId::MovieLens32m => SourceFormat::Csv,
        }
    }

    pub fn scale(self) -> RatingScale {
        match self {
            DatasetId::MovieLens100k => RatingScale { min: 1.0, max: 5.0 },
            DatasetId::MovieLens32m => RatingScale { min: 0.5, max: 5.0 },
        }
    }

    /// Loader for this dataset under `data_dir`
    pub fn source<P: AsRef<Path>>(self, data_dir: P) -> Box<dyn RatingSource> {
        let path = data_dir.as_ref().join(self.relative_path());
        self.format().source(path, self.scale())
    }
}

impl Default for DatasetId {
    fn default() -> Self {
        DatasetId::MovieLens100k
    }
}

impl fmt::Display for DatasetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DatasetId {
    type Err = BenchError;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.to_ascii_lowercase();
        let wanted = wanted.strip_prefix("ml-").unwrap_or(&wanted);
        DatasetId::ALL
            .into_iter()
            .find(|id| id.name() == wanted)
            .ok_or_else(|| {
                let known: Vec<&str> = DatasetId::ALL.iter().map(|id| id.name()).collect();
                BenchError::InvalidParameter(format!(
                    "Dataset '{s}' not recognized. Use one of: {}",
                    known.join(", ")
                ))
            })
    }
}
