//! Feature and label extraction for change observations.

use serde::{Deserialize, Serialize};

use crate::feed::Observation;
use crate::ml::hashing::{FeatureField, FeatureHasher, HashFunction};
use crate::ml::labels::LabelSet;
use crate::ml::stats::RunningStats;

/// Number of dense features: the bias term and the normalised length.
pub const DENSE_DIM: usize = 2;

/// Number of hashed categorical features per observation.
pub const SPARSE_FEATURES: usize = 3;

/// Features of a single observation.
///
/// The sparse part lists hashed indices with an implicit value of 1. Two
/// fields may hash to the same index, in which case it appears twice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub dense: [f64; DENSE_DIM],
    pub sparse: [usize; SPARSE_FEATURES],
}

impl FeatureVector {
    pub fn new(normalized_length: f64, sparse: [usize; SPARSE_FEATURES]) -> Self {
        Self {
            dense: [1.0, normalized_length],
            sparse,
        }
    }

    pub fn bias(&self) -> f64 {
        self.dense[0]
    }

    pub fn normalized_length(&self) -> f64 {
        self.dense[1]
    }
}

/// Turns observations into `(labels, features)` pairs.
///
/// The extractor owns the running length statistics, so every call to
/// [`FeatureExtractor::extract`] also updates them.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    hasher: FeatureHasher,
    length_stats: RunningStats,
}

impl FeatureExtractor {
    pub fn new(function: HashFunction, sparse_dim: usize) -> Self {
        Self::with_stats(function, sparse_dim, RunningStats::new())
    }

    /// Resume from previously accumulated length statistics.
    pub fn with_stats(
        function: HashFunction,
        sparse_dim: usize,
        length_stats: RunningStats,
    ) -> Self {
        Self {
            hasher: FeatureHasher::new(function, sparse_dim),
            length_stats,
        }
    }

    pub fn sparse_dim(&self) -> usize {
        self.hasher.dimension()
    }

    pub fn hash_function(&self) -> HashFunction {
        self.hasher.function()
    }

    pub fn length_stats(&self) -> &RunningStats {
        &self.length_stats
    }

    /// Extract labels and features, folding the change size into the
    /// running statistics.
    pub fn extract(&mut self, observation: &Observation) -> (LabelSet, FeatureVector) {
        let length = observation.length_delta.unsigned_abs() as f64;
        let normalized = self.length_stats.push_and_standardize(length);

        let sparse = [
            self.hasher.index(FeatureField::Comment, &observation.comment),
            self.hasher.index(FeatureField::Username, &observation.username),
            self.hasher.index(FeatureField::Title, &observation.title),
        ];

        (observation.labels, FeatureVector::new(normalized, sparse))
    }
}
