//! Online multilabel classification of change observations.
//!
//! The pipeline has three stages:
//!
//! - [`features::FeatureExtractor`] turns an observation into a bias term, an
//!   online-normalised length and three hashed categorical indices.
//! - [`trainer::OnlineTrainer`] runs one independent logistic classifier per
//!   label ([`logistic::OnlineLogisticModel`]), predicting then updating on
//!   every observation.
//! - [`evaluation::Evaluator`] scores fresh observations without updating and
//!   fills a [`evaluation::ConfusionMatrix`] over the 8 label tuples.
//!
//! [`persistence::ModelSnapshot`] saves and restores a trained learner.

pub mod evaluation;
pub mod features;
pub mod hashing;
pub mod labels;
pub mod logistic;
pub mod persistence;
pub mod stats;
pub mod trainer;

pub use evaluation::{ConfusionMatrix, EvaluationReport, Evaluator};
pub use features::{FeatureExtractor, FeatureVector};
pub use hashing::{FeatureHasher, HashFunction};
pub use labels::{Label, LabelSet};
pub use logistic::OnlineLogisticModel;
pub use persistence::ModelSnapshot;
pub use stats::RunningStats;
pub use trainer::{OnlineTrainer, TrainingReport};
