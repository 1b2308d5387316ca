//! Running statistics for online feature normalisation.

use serde::{Deserialize, Serialize};

/// Incremental mean and variance using Welford's algorithm.
///
/// Only the triple `(count, mean, m2)` is kept, so memory stays constant no
/// matter how many values pass through.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
}

impl RunningStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one value into the statistics.
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Sum of squared deviations from the mean.
    pub fn m2(&self) -> f64 {
        self.m2
    }

    /// Sample variance, `m2 / (n - 1)`. Zero until two values have been seen.
    pub fn sample_variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn sample_std(&self) -> f64 {
        self.sample_variance().sqrt()
    }

    /// Standardise `value` against the current statistics.
    ///
    /// When the standard deviation is zero the raw value is returned as is.
    pub fn standardize(&self, value: f64) -> f64 {
        let std = self.sample_std();
        if std > 0.0 {
            (value - self.mean) / std
        } else {
            value
        }
    }

    /// Push `value`, then standardise it against the updated statistics.
    pub fn push_and_standardize(&mut self, value: f64) -> f64 {
        self.push(value);
        self.standardize(value)
    }
}
