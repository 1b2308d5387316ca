//! Online logistic regression with one independent classifier per label.

use serde::{Deserialize, Serialize};

use crate::error::{ChangeLearnError, Result};
use crate::ml::features::{DENSE_DIM, FeatureVector};
use crate::ml::labels::{Label, LabelSet, NUM_LABELS};

/// Dot products are saturated to this magnitude before the logistic function.
pub const LOGIT_CLIP: f64 = 100.0;

/// Logistic function of a dot product, saturating at `±LOGIT_CLIP`.
///
/// Returns `None` when `z` is NaN, the only input the clipping cannot tame.
pub fn sigmoid(z: f64) -> Option<f64> {
    if z.is_nan() {
        return None;
    }
    let z = z.clamp(-LOGIT_CLIP, LOGIT_CLIP);
    Some(1.0 / (1.0 + (-z).exp()))
}

/// Weights of one binary classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelWeights {
    pub dense: [f64; DENSE_DIM],
    pub sparse: Vec<f64>,
}

impl LabelWeights {
    pub fn zeros(sparse_dim: usize) -> Self {
        Self {
            dense: [0.0; DENSE_DIM],
            sparse: vec![0.0; sparse_dim],
        }
    }

    /// `w_dense . x_dense` plus the sparse weight of every hashed index.
    pub fn dot(&self, features: &FeatureVector) -> f64 {
        let dense: f64 = self
            .dense
            .iter()
            .zip(features.dense.iter())
            .map(|(w, x)| w * x)
            .sum();
        let sparse: f64 = features.sparse.iter().map(|&idx| self.sparse[idx]).sum();
        dense + sparse
    }

    /// One stochastic gradient ascent step on the log likelihood.
    pub fn step(&mut self, features: &FeatureVector, learning_rate: f64, gradient: f64) {
        let scale = learning_rate * gradient;
        for (w, x) in self.dense.iter_mut().zip(features.dense.iter()) {
            *w += scale * x;
        }
        for &idx in &features.sparse {
            self.sparse[idx] += scale;
        }
    }

    pub fn is_zero(&self) -> bool {
        self.dense.iter().all(|&w| w == 0.0) && self.sparse.iter().all(|&w| w == 0.0)
    }
}

/// Three binary logistic classifiers sharing one feature space.
///
/// Labels never interact: predicting or updating label `k` only reads or
/// writes `weights[k]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnlineLogisticModel {
    learning_rate: f64,
    sparse_dim: usize,
    weights: [LabelWeights; NUM_LABELS],
}

impl OnlineLogisticModel {
    /// Zero-initialised model.
    pub fn new(sparse_dim: usize, learning_rate: f64) -> Self {
        Self {
            learning_rate,
            sparse_dim,
            weights: std::array::from_fn(|_| LabelWeights::zeros(sparse_dim)),
        }
    }

    pub fn learning_rate(&self) -> f64 {
        self.learning_rate
    }

    pub fn sparse_dim(&self) -> usize {
        self.sparse_dim
    }

    pub fn weights(&self, label: Label) -> &LabelWeights {
        &self.weights[label.index()]
    }

    /// Probability that `label` is set for these features.
    pub fn predict(&self, label: Label, features: &FeatureVector) -> Result<f64> {
        let z = self.weights[label.index()].dot(features);
        sigmoid(z).ok_or(ChangeLearnError::NumericOverflow { label, value: z })
    }

    /// Probabilities for every label, in [`Label::ALL`] order.
    pub fn predict_all(&self, features: &FeatureVector) -> Result<[f64; NUM_LABELS]> {
        let mut probabilities = [0.0; NUM_LABELS];
        for label in Label::ALL {
            probabilities[label.index()] = self.predict(label, features)?;
        }
        Ok(probabilities)
    }

    /// Move `label`'s weights by `alpha * (y - p)` along the features.
    pub fn update(&mut self, label: Label, features: &FeatureVector, predicted: f64, target: f64) {
        let learning_rate = self.learning_rate;
        self.weights[label.index()].step(features, learning_rate, target - predicted);
    }

    /// Predict then update every label independently.
    ///
    /// Returns the probabilities computed before the updates.
    pub fn learn_one(
        &mut self,
        features: &FeatureVector,
        labels: &LabelSet,
    ) -> Result<[f64; NUM_LABELS]> {
        let mut probabilities = [0.0; NUM_LABELS];
        for label in Label::ALL {
            let p = self.predict(label, features)?;
            self.update(label, features, p, labels.target(label));
            probabilities[label.index()] = p;
        }
        Ok(probabilities)
    }

    /// Rebuild a model from stored parts, checking that every sparse
    /// vector has the stated dimension.
    pub fn from_parts(
        learning_rate: f64,
        sparse_dim: usize,
        weights: [LabelWeights; NUM_LABELS],
    ) -> Result<Self> {
        let model = Self {
            learning_rate,
            sparse_dim,
            weights,
        };
        model.validate()?;
        Ok(model)
    }

    /// Check that every sparse weight vector has `sparse_dim` entries.
    pub fn validate(&self) -> Result<()> {
        for (label, w) in Label::ALL.iter().zip(self.weights.iter()) {
            if w.sparse.len() != self.sparse_dim {
                return Err(ChangeLearnError::snapshot(format!(
                    "{label} weights have {} sparse entries, expected {}",
                    w.sparse.len(),
                    self.sparse_dim
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIM: usize = 64;

    fn features(length: f64, sparse: [usize; 3]) -> FeatureVector {
        FeatureVector::new(length, sparse)
    }

    #[test]
    fn test_sigmoid_range_and_saturation() {
        for z in [-1e6, -150.0, -100.0, -3.5, 0.0, 2.0, 100.0, 1e300, f64::INFINITY] {
            let p = sigmoid(z).unwrap();
            // The upper tail rounds to 1.0 in f64 well before the clip.
            assert!(p > 0.0 && p <= 1.0, "sigmoid({z}) = {p}");
        }
        assert!(sigmoid(30.0).unwrap() < 1.0);
        assert_eq!(sigmoid(-1e9).unwrap(), 1.0 / (1.0 + 100f64.exp()));
        assert_eq!(sigmoid(1e9).unwrap(), 1.0 / (1.0 + (-100f64).exp()));
        assert_eq!(sigmoid(f64::NEG_INFINITY).unwrap(), sigmoid(-100.0).unwrap());
        assert_eq!(sigmoid(0.0).unwrap(), 0.5);
        assert!(sigmoid(f64::NAN).is_none());
    }

    #[test]
    fn test_zero_weights_predict_half() {
        let model = OnlineLogisticModel::new(DIM, 0.1);
        let inputs = [
            features(0.0, [0, 1, 2]),
            features(-1e12, [63, 63, 63]),
            features(7.5, [5, 9, 1]),
        ];
        for x in inputs {
            assert_eq!(model.predict_all(&x).unwrap(), [0.5; 3]);
        }
    }

    #[test]
    fn test_zero_learning_rate_is_noop() {
        let mut model = OnlineLogisticModel::new(DIM, 0.0);
        let before = model.clone();
        let labels = LabelSet::new(true, true, true);
        for i in 0..20 {
            let x = features(i as f64, [i % DIM, (i * 3) % DIM, (i * 7) % DIM]);
            let p = model.learn_one(&x, &labels).unwrap();
            assert_eq!(p, [0.5; 3]);
            model.update(Label::Bot, &x, 0.0, 1.0);
        }
        assert_eq!(model, before);
    }

    #[test]
    fn test_update_matches_gradient_formula() {
        let mut model = OnlineLogisticModel::new(DIM, 0.5);
        let x = features(2.0, [3, 4, 5]);
        model.update(Label::Minor, &x, 0.5, 1.0);

        let w = model.weights(Label::Minor);
        assert_eq!(w.dense, [0.25, 0.5]);
        assert_eq!(w.sparse[3], 0.25);
        assert_eq!(w.sparse[4], 0.25);
        assert_eq!(w.sparse[5], 0.25);
        assert_eq!(w.sparse[6], 0.0);
    }

    #[test]
    fn test_colliding_indices_accumulate() {
        let mut model = OnlineLogisticModel::new(DIM, 1.0);
        let x = features(0.0, [7, 7, 8]);
        model.update(Label::New, &x, 0.0, 1.0);
        assert_eq!(model.weights(Label::New).sparse[7], 2.0);
        assert_eq!(model.weights(Label::New).sparse[8], 1.0);
        // Dot product counts the shared index twice as well.
        assert_eq!(model.weights(Label::New).dot(&x), 1.0 + 0.0 + 2.0 + 2.0 + 1.0);
    }

    #[test]
    fn test_updates_are_label_independent() {
        let mut model = OnlineLogisticModel::new(DIM, 0.3);
        for i in 0..50 {
            let x = features(i as f64 / 10.0, [i % DIM, (i + 1) % DIM, (i + 2) % DIM]);
            let p = model.predict(Label::Bot, &x).unwrap();
            model.update(Label::Bot, &x, p, (i % 2) as f64);
        }
        assert!(!model.weights(Label::Bot).is_zero());
        assert!(model.weights(Label::Minor).is_zero());
        assert!(model.weights(Label::New).is_zero());
    }

    #[test]
    fn test_learning_separates_labels() {
        let mut model = OnlineLogisticModel::new(DIM, 0.5);
        let bot = features(0.0, [1, 2, 3]);
        let human = features(0.0, [10, 11, 12]);
        for _ in 0..200 {
            model.learn_one(&bot, &LabelSet::new(true, false, false)).unwrap();
            model.learn_one(&human, &LabelSet::new(false, true, false)).unwrap();
        }
        assert!(model.predict(Label::Bot, &bot).unwrap() > 0.9);
        assert!(model.predict(Label::Bot, &human).unwrap() < 0.1);
        assert!(model.predict(Label::Minor, &human).unwrap() > 0.9);
        assert!(model.predict(Label::New, &bot).unwrap() < 0.1);
    }

    #[test]
    fn test_nan_weights_report_overflow() {
        let mut model = OnlineLogisticModel::new(DIM, 1.0);
        let x = features(f64::INFINITY, [0, 1, 2]);
        // inf * (1 - 0.5) pushes the length weight to inf, and inf * 0 is NaN
        // once the feature comes back as zero.
        model.update(Label::Bot, &x, 0.5, 1.0);
        let zero_length = features(0.0, [0, 1, 2]);
        match model.predict(Label::Bot, &zero_length) {
            Err(ChangeLearnError::NumericOverflow { label, value }) => {
                assert_eq!(label, Label::Bot);
                assert!(value.is_nan());
            }
            other => panic!("expected overflow, got {other:?}"),
        }
    }

    #[test]
    fn test_from_parts_checks_dimension() {
        let weights = std::array::from_fn(|_| LabelWeights::zeros(8));
        assert!(OnlineLogisticModel::from_parts(0.1, 8, weights.clone()).is_ok());
        assert!(OnlineLogisticModel::from_parts(0.1, 16, weights).is_err());
    }
}
