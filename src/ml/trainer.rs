//! Single-pass training loop.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::config::LearnerConfig;
use crate::error::Result;
use crate::feed::{ChangeFeed, Observation, ObservationStream, StopCondition, StreamEnd};
use crate::ml::features::FeatureExtractor;
use crate::ml::labels::{Label, LabelSet, NUM_LABELS};
use crate::ml::logistic::OnlineLogisticModel;

// Keeps ln() finite when a saturated prediction is wrong.
const LOG_LOSS_EPSILON: f64 = 1e-15;

/// Binary cross-entropy of probability `p` against target `y`.
pub fn log_loss(p: f64, y: f64) -> f64 {
    let p = p.clamp(LOG_LOSS_EPSILON, 1.0 - LOG_LOSS_EPSILON);
    -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
}

/// Progressive-validation metrics: every observation is scored with the
/// prediction made just before the model trains on it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressiveMetrics {
    observations: u64,
    log_loss_sum: [f64; NUM_LABELS],
    correct: [u64; NUM_LABELS],
    positives: [u64; NUM_LABELS],
}

impl ProgressiveMetrics {
    pub fn record(&mut self, probabilities: &[f64; NUM_LABELS], labels: &LabelSet, threshold: f64) {
        self.observations += 1;
        for label in Label::ALL {
            let k = label.index();
            let y = labels.target(label);
            self.log_loss_sum[k] += log_loss(probabilities[k], y);
            if (probabilities[k] > threshold) == labels.get(label) {
                self.correct[k] += 1;
            }
            if labels.get(label) {
                self.positives[k] += 1;
            }
        }
    }

    pub fn observations(&self) -> u64 {
        self.observations
    }

    pub fn mean_log_loss(&self, label: Label) -> f64 {
        if self.observations == 0 {
            return 0.0;
        }
        self.log_loss_sum[label.index()] / self.observations as f64
    }

    pub fn accuracy(&self, label: Label) -> f64 {
        if self.observations == 0 {
            return 0.0;
        }
        self.correct[label.index()] as f64 / self.observations as f64
    }

    pub fn summary(&self) -> Vec<LabelMetrics> {
        Label::ALL
            .iter()
            .map(|&label| LabelMetrics {
                label,
                mean_log_loss: self.mean_log_loss(label),
                accuracy: self.accuracy(label),
                positives: self.positives[label.index()],
            })
            .collect()
    }
}

/// Per-label progressive metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelMetrics {
    pub label: Label,
    pub mean_log_loss: f64,
    pub accuracy: f64,
    pub positives: u64,
}

/// Outcome of one call to [`OnlineTrainer::train`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub observations: u64,
    pub batches: u64,
    pub duration_ms: u64,
    pub observations_per_second: f64,
    pub end: StreamEnd,
    pub labels: Vec<LabelMetrics>,
}

/// Owns the feature extractor and the model, and drives predict-then-update
/// over a stream of observations.
#[derive(Debug, Clone)]
pub struct OnlineTrainer {
    extractor: FeatureExtractor,
    model: OnlineLogisticModel,
    metrics: ProgressiveMetrics,
    /// Observations learned before this trainer was built, e.g. by the run
    /// a snapshot came from.
    prior_observations: u64,
    threshold: f64,
    log_every: u64,
}

impl OnlineTrainer {
    /// Fresh trainer with zero weights and empty statistics.
    pub fn new(config: &LearnerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::from_parts(
            FeatureExtractor::new(config.hash, config.sparse_dim),
            OnlineLogisticModel::new(config.sparse_dim, config.learning_rate),
            0,
            config,
        ))
    }

    /// Resume from an existing extractor and model that has already learned
    /// from `prior_observations` observations.
    pub fn from_parts(
        extractor: FeatureExtractor,
        model: OnlineLogisticModel,
        prior_observations: u64,
        config: &LearnerConfig,
    ) -> Self {
        Self {
            extractor,
            model,
            metrics: ProgressiveMetrics::default(),
            prior_observations,
            threshold: config.threshold,
            log_every: config.log_every,
        }
    }

    pub fn extractor(&self) -> &FeatureExtractor {
        &self.extractor
    }

    pub fn model(&self) -> &OnlineLogisticModel {
        &self.model
    }

    pub fn metrics(&self) -> &ProgressiveMetrics {
        &self.metrics
    }

    /// Observations the model has learned from, including those before a
    /// resume. The progressive metrics only cover the current run.
    pub fn trained_observations(&self) -> u64 {
        self.prior_observations + self.metrics.observations()
    }

    /// Extract features, then predict and update each label.
    ///
    /// Returns the pre-update probabilities.
    pub fn learn_one(&mut self, observation: &Observation) -> Result<[f64; NUM_LABELS]> {
        let (labels, features) = self.extractor.extract(observation);
        let probabilities = self.model.learn_one(&features, &labels)?;
        self.metrics.record(&probabilities, &labels, self.threshold);
        Ok(probabilities)
    }

    /// Predict without touching the weights.
    ///
    /// The length statistics still absorb the observation, exactly as during
    /// training.
    pub fn predict_one(
        &mut self,
        observation: &Observation,
    ) -> Result<(LabelSet, [f64; NUM_LABELS])> {
        let (labels, features) = self.extractor.extract(observation);
        let probabilities = self.model.predict_all(&features)?;
        Ok((labels, probabilities))
    }

    /// Train on `stream` until its stop condition fires or its feed runs dry.
    ///
    /// The first feed or numeric error aborts the run.
    pub fn train<F, S>(&mut self, stream: &mut ObservationStream<F, S>) -> Result<TrainingReport>
    where
        F: ChangeFeed,
        S: StopCondition,
    {
        let started = Instant::now();
        let start_count = stream.processed();
        let start_batches = stream.batches();

        for observation in stream.by_ref() {
            self.learn_one(&observation?)?;
            let seen = self.metrics.observations();
            if self.log_every > 0 && seen % self.log_every == 0 {
                log::info!(
                    "trained on {} observations, log loss bot={:.4} minor={:.4} new={:.4}",
                    seen,
                    self.metrics.mean_log_loss(Label::Bot),
                    self.metrics.mean_log_loss(Label::Minor),
                    self.metrics.mean_log_loss(Label::New),
                );
            }
        }

        let elapsed = started.elapsed();
        let observations = stream.processed() - start_count;
        let report = TrainingReport {
            observations,
            batches: stream.batches() - start_batches,
            duration_ms: elapsed.as_millis() as u64,
            observations_per_second: if elapsed.as_secs_f64() > 0.0 {
                observations as f64 / elapsed.as_secs_f64()
            } else {
                0.0
            },
            end: stream.end().unwrap_or(StreamEnd::Exhausted),
            labels: self.metrics.summary(),
        };
        log::info!(
            "training finished: {} observations in {} batches ({:?})",
            report.observations,
            report.batches,
            report.end
        );
        Ok(report)
    }
}
