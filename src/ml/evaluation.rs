//! Predict-only evaluation and the 8x8 confusion matrix over label tuples.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::feed::Observation;
use crate::ml::labels::{Label, LabelSet, NUM_LABELS, NUM_TUPLES};
use crate::ml::trainer::OnlineTrainer;

/// Counts of `(actual, predicted)` label tuples.
///
/// Rows and columns follow [`LabelSet::tuple_index`], i.e. the lexicographic
/// order of `(bot, minor, new)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    counts: [[u64; NUM_TUPLES]; NUM_TUPLES],
}

impl ConfusionMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, actual: LabelSet, predicted: LabelSet) {
        self.counts[actual.tuple_index()][predicted.tuple_index()] += 1;
    }

    pub fn get(&self, actual: LabelSet, predicted: LabelSet) -> u64 {
        self.counts[actual.tuple_index()][predicted.tuple_index()]
    }

    pub fn rows(&self) -> &[[u64; NUM_TUPLES]; NUM_TUPLES] {
        &self.counts
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    /// Observations whose whole tuple was predicted correctly.
    pub fn exact_matches(&self) -> u64 {
        (0..NUM_TUPLES).map(|i| self.counts[i][i]).sum()
    }

    pub fn row_totals(&self) -> [u64; NUM_TUPLES] {
        std::array::from_fn(|i| self.counts[i].iter().sum())
    }

    pub fn column_totals(&self) -> [u64; NUM_TUPLES] {
        std::array::from_fn(|j| self.counts.iter().map(|row| row[j]).sum())
    }

    /// Share of exact tuple matches, or `None` for an empty matrix.
    pub fn exact_match_accuracy(&self) -> Option<f64> {
        let total = self.total();
        (total > 0).then(|| self.exact_matches() as f64 / total as f64)
    }

    /// Share of observations where one label alone was predicted correctly.
    pub fn label_accuracy(&self, label: Label) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let mut correct = 0;
        for (i, row) in self.counts.iter().enumerate() {
            let actual = LabelSet::from_tuple_index(i).get(label);
            for (j, count) in row.iter().enumerate() {
                if LabelSet::from_tuple_index(j).get(label) == actual {
                    correct += count;
                }
            }
        }
        Some(correct as f64 / total as f64)
    }
}

/// Per-label evaluation summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelAccuracy {
    pub label: Label,
    pub accuracy: f64,
    pub actual_positives: u64,
    pub predicted_positives: u64,
}

/// Result of an evaluation pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub observations: u64,
    pub tuples: Vec<String>,
    pub matrix: ConfusionMatrix,
    pub exact_match_accuracy: f64,
    pub labels: Vec<LabelAccuracy>,
}

impl EvaluationReport {
    fn from_matrix(matrix: ConfusionMatrix) -> Self {
        let rows = matrix.row_totals();
        let columns = matrix.column_totals();
        let positives = |totals: &[u64; NUM_TUPLES], label: Label| -> u64 {
            (0..NUM_TUPLES)
                .filter(|&i| LabelSet::from_tuple_index(i).get(label))
                .map(|i| totals[i])
                .sum()
        };
        let labels = Label::ALL
            .iter()
            .map(|&label| LabelAccuracy {
                label,
                accuracy: matrix.label_accuracy(label).unwrap_or(0.0),
                actual_positives: positives(&rows, label),
                predicted_positives: positives(&columns, label),
            })
            .collect();
        Self {
            observations: matrix.total(),
            tuples: LabelSet::all().map(|t| t.to_string()).collect(),
            exact_match_accuracy: matrix.exact_match_accuracy().unwrap_or(0.0),
            matrix,
            labels,
        }
    }
}

/// Scores observations with a trained model, without updating it.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator {
    threshold: f64,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self { threshold: 0.5 }
    }
}

impl Evaluator {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    /// A label is predicted as set when its probability is strictly above
    /// the threshold.
    pub fn predicted_labels(&self, probabilities: &[f64; NUM_LABELS]) -> LabelSet {
        let mut predicted = LabelSet::default();
        for label in Label::ALL {
            predicted.set(label, probabilities[label.index()] > self.threshold);
        }
        predicted
    }

    /// Evaluate on at most `limit` observations.
    ///
    /// Stops early if the iterator runs out; the first error aborts.
    pub fn evaluate<I>(
        &self,
        trainer: &mut OnlineTrainer,
        observations: I,
        limit: usize,
    ) -> Result<EvaluationReport>
    where
        I: IntoIterator<Item = Result<Observation>>,
    {
        let mut matrix = ConfusionMatrix::new();
        for observation in observations.into_iter().take(limit) {
            let (actual, probabilities) = trainer.predict_one(&observation?)?;
            matrix.record(actual, self.predicted_labels(&probabilities));
        }
        log::info!(
            "evaluated {} observations, exact match accuracy {:.4}",
            matrix.total(),
            matrix.exact_match_accuracy().unwrap_or(0.0)
        );
        Ok(EvaluationReport::from_matrix(matrix))
    }
}
