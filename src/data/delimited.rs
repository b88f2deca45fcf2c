//! Delimited plain-text rating files
//!
//! One rating per line:
//! user item rating [timestamp]
//!
//! Example (MovieLens 100k `u.data`, tab separated):
//! 196	242	3	881250949
//! 186	302	3	891717742

use crate::core::{BenchError, Dataset, RatingRecord, RatingScale, Result};
use crate::data::RatingSource;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Loader for delimited rating files
#[derive(Debug, Clone)]
pub struct DelimitedSource {
    path: PathBuf,
    delimiter: Delimiter,
    scale: RatingScale,
}

/// Field separator of a delimited file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    /// Any run of spaces or tabs
    Whitespace,
    Char(char),
}

impl Delimiter {
    fn split<'a>(&self, line: &'a str) -> Vec<&'a str> {
        match self {
            Delimiter::Whitespace => line.split_whitespace().collect(),
            Delimiter::Char(c) => line.split(*c).map(str::trim).collect(),
        }
    }
}

impl DelimitedSource {
    /// Whitespace-separated file on the given scale
    pub fn new<P: AsRef<Path>>(path: P, scale: RatingScale) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            delimiter: Delimiter::Whitespace,
            scale,
        }
    }

    /// Use a specific separator, e.g. `::` files pre-converted to `:`
    pub fn with_delimiter(mut self, delimiter: Delimiter) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Parse ratings from a reader
    pub fn from_reader<R: BufRead>(
        reader: R,
        delimiter: Delimiter,
        scale: RatingScale,
    ) -> Result<Dataset> {
        let mut records = Vec::new();

        for (line_num, line) in reader.lines().enumerate() {
            let line = line.map_err(BenchError::IoError)?;
            let line = line.trim();

            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let record = Self::parse_line(line, delimiter).map_err(|e| {
                BenchError::MalformedDataset(format!("line {}: {}", line_num + 1, e))
            })?;
            records.push(record);
        }

        Dataset::new(records, scale)
    }

    fn parse_line(line: &str, delimiter: Delimiter) -> std::result::Result<RatingRecord, String> {
        let fields = delimiter.split(line);

        if fields.len() < 3 {
            return Err(format!(
                "expected user, item and rating, found {} field(s)",
                fields.len()
            ));
        }

        let rating = fields[2]
            .parse::<f64>()
            .map_err(|_| format!("invalid rating: {}", fields[2]))?;

        let timestamp = match fields.get(3) {
            Some(ts) if !ts.is_empty() => Some(
                ts.parse::<i64>()
                    .map_err(|_| format!("invalid timestamp: {ts}"))?,
            ),
            _ => None,
        };

        if fields[0].is_empty() || fields[1].is_empty() {
            return Err("empty user or item id".to_string());
        }

        Ok(RatingRecord::new(fields[0], fields[1], rating, timestamp))
    }
}

impl RatingSource for DelimitedSource {
    fn load(&self) -> Result<Dataset> {
        if !self.path.exists() {
            return Err(BenchError::DatasetNotFound(self.path.clone()));
        }
        let file = File::open(&self.path).map_err(BenchError::IoError)?;
        Self::from_reader(BufReader::new(file), self.delimiter, self.scale)
    }

    fn scale(&self) -> RatingScale {
        self.scale
    }

    fn path(&self) -> &Path {
        &self.path
    }
}
