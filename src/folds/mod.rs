//! K-fold partitioning of rating datasets
//!
//! Record indices are shuffled once and cut into `k` contiguous chunks whose
//! sizes differ by at most one. Fold `i` tests on chunk `i` and trains on the
//! remaining chunks. A [`FoldPartition`] only stores indices; train and test
//! datasets are materialised one fold at a time.

use crate::core::{BenchError, Dataset, Result};
use log::{debug, info};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{RngCore, SeedableRng};
use std::ops::Range;

/// One train/test split of a dataset
#[derive(Debug, Clone)]
pub struct Fold {
    /// Position of this fold in its partition
    pub index: usize,
    pub train: Dataset,
    pub test: Dataset,
}

/// Splits datasets into `k` folds
#[derive(Debug, Clone, Copy)]
pub struct FoldPartitioner {
    folds: usize,
    seed: Option<u64>,
}

impl FoldPartitioner {
    /// Partitioner for `folds` folds; `seed` fixes the shuffle
    pub fn new(folds: usize, seed: Option<u64>) -> Self {
        Self { folds, seed }
    }

    pub fn folds(&self) -> usize {
        self.folds
    }

    /// Check `2 <= k <= records` without touching any data
    pub fn validate(&self, records: usize) -> Result<()> {
        if self.folds < 2 || self.folds > records {
            return Err(BenchError::InvalidFoldCount {
                folds: self.folds,
                records,
            });
        }
        Ok(())
    }

    /// Shuffle the dataset's record indices and cut them into folds
    pub fn partition(&self, dataset: &Dataset) -> Result<FoldPartition> {
        self.validate(dataset.len())?;

        let seed = match self.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::thread_rng().next_u64();
                info!("No fold seed configured, using {seed}");
                seed
            }
        };

        let mut order: Vec<usize> = (0..dataset.len()).collect();
        let mut rng = StdRng::seed_from_u64(seed);
        order.shuffle(&mut rng);

        let bounds = chunk_bounds(order.len(), self.folds);
        debug!(
            "Partitioned {} ratings into {} folds (test sizes {:?})",
            order.len(),
            self.folds,
            bounds.iter().map(|r| r.len()).collect::<Vec<_>>()
        );

        Ok(FoldPartition {
            order,
            bounds,
            seed,
        })
    }
}

/// Contiguous near-equal chunk ranges: the first `n % k` chunks get one extra
fn chunk_bounds(n: usize, k: usize) -> Vec<Range<usize>> {
    let base = n / k;
    let extra = n % k;
    let mut bounds = Vec::with_capacity(k);
    let mut start = 0;
    for i in 0..k {
        let len = base + usize::from(i < extra);
        bounds.push(start..start + len);
        start += len;
    }
    bounds
}

/// Shuffled record indices cut into test chunks
#[derive(Debug, Clone, PartialEq)]
pub struct FoldPartition {
    order: Vec<usize>,
    bounds: Vec<Range<usize>>,
    seed: u64,
}

impl FoldPartition {
    /// Number of folds
    pub fn len(&self) -> usize {
        self.bounds.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bounds.is_empty()
    }

    /// Seed the shuffle was drawn from
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Record indices tested in fold `i`
    pub fn test_indices(&self, i: usize) -> &[usize] {
        &self.order[self.bounds[i].clone()]
    }

    /// Record indices trained on in fold `i`, in chunk order
    pub fn train_indices(&self, i: usize) -> Vec<usize> {
        let test = &self.bounds[i];
        self.order[..test.start]
            .iter()
            .chain(&self.order[test.end..])
            .copied()
            .collect()
    }

    /// Materialise fold `i` of `dataset`
    ///
    /// # Panics
    /// Panics if `i >= self.len()` or `dataset` is not the partitioned dataset
    pub fn fold(&self, dataset: &Dataset, i: usize) -> Fold {
        Fold {
            index: i,
            train: dataset.subset(&self.train_indices(i)),
            test: dataset.subset(self.test_indices(i)),
        }
    }

    /// Materialise folds lazily, one at a time
    pub fn iter<'a>(&'a self, dataset: &'a Dataset) -> impl Iterator<Item = Fold> + 'a {
        (0..self.len()).map(move |i| self.fold(dataset, i))
    }
}
