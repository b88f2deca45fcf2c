//! Rating dataset loaders
//!
//! This module provides loaders for the rating file formats used by the
//! MovieLens datasets, and a catalog of the datasets known to the benchmark.

pub mod catalog;
pub mod csv;
pub mod delimited;

pub use self::catalog::*;
pub use self::csv::CsvSource;
pub use self::delimited::*;

use crate::core::{Dataset, RatingScale, Result};
use std::path::Path;

/// A file of ratings that loads into a [`Dataset`] on a declared scale
pub trait RatingSource {
    /// Read and validate every rating
    fn load(&self) -> Result<Dataset>;

    /// Scale the ratings are checked against
    fn scale(&self) -> RatingScale;

    /// Location of the underlying file
    fn path(&self) -> &Path;
}
