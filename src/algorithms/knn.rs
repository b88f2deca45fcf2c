//! Neighborhood (k nearest neighbors) collaborative filtering
//!
//! Similarities between users (or items, when `user_based` is false) are
//! computed over co-rated entries. An estimate combines the ratings of the
//! `k` most similar neighbors that rated the target, weighted by similarity.
//! `KNNWithMeans` works on deviations from each neighbor's mean rating.

use crate::algorithms::square_matrix;
use crate::algorithms::trainset::Trainset;
use crate::core::{Algorithm, AlgorithmParams, BenchError, Dataset, Predictor, Result};
use log::debug;
use std::cmp::Ordering;

pub const OPTIONS: &[&str] = &["k", "min_k", "similarity", "user_based"];

/// Similarity measure between two rating vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Similarity {
    Cosine,
    /// Inverse mean squared difference
    Msd,
    Pearson,
}

impl Similarity {
    fn parse(name: &str) -> Result<Self> {
        match name {
            "cosine" => Ok(Similarity::Cosine),
            "msd" => Ok(Similarity::Msd),
            "pearson" => Ok(Similarity::Pearson),
            other => Err(BenchError::InvalidParameter(format!(
                "similarity must be 'cosine', 'msd' or 'pearson', got '{other}'"
            ))),
        }
    }
}

/// How neighbor ratings are combined
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KnnVariant {
    Basic,
    WithMeans,
}

#[derive(Debug, Clone)]
pub struct Knn {
    variant: KnnVariant,
    k: usize,
    min_k: usize,
    similarity: Similarity,
    user_based: bool,
}

impl Knn {
    pub fn new(variant: KnnVariant) -> Self {
        Self {
            variant,
            k: 40,
            min_k: 1,
            similarity: Similarity::Cosine,
            user_based: true,
        }
    }

    pub fn from_params(variant: KnnVariant, params: &AlgorithmParams) -> Result<Self> {
        let name = match variant {
            KnnVariant::Basic => "KNNBasic",
            KnnVariant::WithMeans => "KNNWithMeans",
        };
        params.ensure_known(name, OPTIONS)?;

        let k = params.usize_or("k", 40)?;
        if k == 0 {
            return Err(BenchError::InvalidParameter(format!("{name} needs k >= 1")));
        }
        Ok(Self {
            variant,
            k,
            min_k: params.usize_or("min_k", 1)?,
            similarity: Similarity::parse(params.str_or("similarity", "cosine")?)?,
            user_based: params.bool_or("user_based", true)?,
        })
    }
}

impl Algorithm for Knn {
    fn name(&self) -> &str {
        match self.variant {
            KnnVariant::Basic => "KNNBasic",
            KnnVariant::WithMeans => "KNNWithMeans",
        }
    }

    fn fit(&self, train: &Dataset) -> Result<Box<dyn Predictor>> {
        let trainset = Trainset::new(train);

        // x: the entities compared, y: what they rated
        let (x_ratings, y_ratings) = if self.user_based {
            (&trainset.user_ratings, &trainset.item_ratings)
        } else {
            (&trainset.item_ratings, &trainset.user_ratings)
        };

        let n_x = x_ratings.len();
        let similarities = similarity_matrix(n_x, y_ratings, self.similarity)?;
        let means = if self.user_based {
            trainset.user_means()
        } else {
            trainset.item_means()
        };
        debug!("{} computed {n_x}x{n_x} similarity matrix", self.name());

        Ok(Box::new(KnnModel {
            config: self.clone(),
            trainset,
            similarities,
            n_x,
            means,
        }))
    }
}

/// Dense n x n similarity matrix accumulated over every co-rated entry
fn similarity_matrix(
    n: usize,
    y_ratings: &[Vec<(usize, f64)>],
    measure: Similarity,
) -> Result<Vec<f64>> {
    let what = "similarity matrix";
    let mut freq: Vec<u32> = square_matrix(n, what)?;
    // cosine, pearson: sum(a*b); msd: sum((a-b)^2)
    let mut acc: Vec<f64> = square_matrix(n, what)?;
    let (mut sq_a, mut sq_b): (Vec<f64>, Vec<f64>) = match measure {
        Similarity::Msd => (Vec::new(), Vec::new()),
        _ => (square_matrix(n, what)?, square_matrix(n, what)?),
    };
    let (mut sum_a, mut sum_b): (Vec<f64>, Vec<f64>) = match measure {
        Similarity::Pearson => (square_matrix(n, what)?, square_matrix(n, what)?),
        _ => (Vec::new(), Vec::new()),
    };

    for ratings in y_ratings {
        for &(a, ra) in ratings {
            for &(b, rb) in ratings {
                let idx = a * n + b;
                freq[idx] += 1;
                match measure {
                    Similarity::Cosine => {
                        acc[idx] += ra * rb;
                        sq_a[idx] += ra * ra;
                        sq_b[idx] += rb * rb;
                    }
                    Similarity::Msd => {
                        acc[idx] += (ra - rb).powi(2);
                    }
                    Similarity::Pearson => {
                        acc[idx] += ra * rb;
                        sq_a[idx] += ra * ra;
                        sq_b[idx] += rb * rb;
                        sum_a[idx] += ra;
                        sum_b[idx] += rb;
                    }
                }
            }
        }
    }

    for idx in 0..acc.len() {
        if freq[idx] == 0 {
            acc[idx] = 0.0;
            continue;
        }
        let f = freq[idx] as f64;
        acc[idx] = match measure {
            Similarity::Cosine => {
                let denom = (sq_a[idx] * sq_b[idx]).sqrt();
                if denom == 0.0 {
                    0.0
                } else {
                    acc[idx] / denom
                }
            }
            Similarity::Msd => 1.0 / (acc[idx] / f + 1.0),
            Similarity::Pearson => {
                let num = f * acc[idx] - sum_a[idx] * sum_b[idx];
                let denom = ((f * sq_a[idx] - sum_a[idx].powi(2))
                    * (f * sq_b[idx] - sum_b[idx].powi(2)))
                .sqrt();
                if denom == 0.0 || !denom.is_finite() {
                    0.0
                } else {
                    num / denom
                }
            }
        };
    }
    Ok(acc)
}

struct KnnModel {
    config: Knn,
    trainset: Trainset,
    similarities: Vec<f64>,
    n_x: usize,
    means: Vec<f64>,
}

impl Predictor for KnnModel {
    fn predict(&self, user_id: &str, item_id: &str) -> Result<f64> {
        let ts = &self.trainset;
        let (x, y) = if self.config.user_based {
            (ts.user(user_id), ts.item(item_id))
        } else {
            (ts.item(item_id), ts.user(user_id))
        };

        let x = match x {
            Some(x) => x,
            None => return Ok(ts.scale.clip(ts.global_mean)),
        };
        let fallback = match self.config.variant {
            KnnVariant::Basic => ts.global_mean,
            KnnVariant::WithMeans => self.means[x],
        };
        let y = match y {
            Some(y) => y,
            None => return Ok(ts.scale.clip(fallback)),
        };

        let y_ratings = if self.config.user_based {
            &ts.item_ratings[y]
        } else {
            &ts.user_ratings[y]
        };

        let mut neighbors: Vec<(f64, usize, f64)> = y_ratings
            .iter()
            .map(|&(x2, r)| (self.similarities[x * self.n_x + x2], x2, r))
            .collect();
        neighbors.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(Ordering::Equal));
        neighbors.truncate(self.config.k);

        let mut sum_sim = 0.0;
        let mut sum_ratings = 0.0;
        let mut actual_k = 0;
        for &(sim, x2, r) in &neighbors {
            if sim > 0.0 {
                sum_sim += sim;
                sum_ratings += match self.config.variant {
                    KnnVariant::Basic => sim * r,
                    KnnVariant::WithMeans => sim * (r - self.means[x2]),
                };
                actual_k += 1;
            }
        }

        if actual_k < self.config.min_k || sum_sim == 0.0 {
            return Ok(ts.scale.clip(fallback));
        }

        let est = match self.config.variant {
            KnnVariant::Basic => sum_ratings / sum_sim,
            KnnVariant::WithMeans => self.means[x] + sum_ratings / sum_sim,
        };
        Ok(ts.scale.clip(est))
    }
}
