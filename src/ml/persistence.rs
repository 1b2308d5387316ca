//! Binary snapshots of a trained learner.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use bincode::Options;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::LearnerConfig;
use crate::error::{ChangeLearnError, Result};
use crate::ml::features::FeatureExtractor;
use crate::ml::logistic::OnlineLogisticModel;
use crate::ml::stats::RunningStats;
use crate::ml::trainer::OnlineTrainer;

/// Model name written into every snapshot.
pub const MODEL_NAME: &str = "online-multilabel-logistic";

/// Upper bound on decoded snapshot size, so a corrupt length prefix cannot
/// trigger a huge allocation.
const MAX_SNAPSHOT_BYTES: u64 = 1 << 31;

fn codec() -> impl Options {
    bincode::DefaultOptions::new().with_limit(MAX_SNAPSHOT_BYTES)
}

/// Descriptive information stored alongside the weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub name: String,
    /// Crate version that wrote the snapshot.
    pub version: String,
    /// Identifier of the training run.
    pub run_id: Uuid,
    pub trained_at: DateTime<Utc>,
    /// Observations the model has been trained on.
    pub observations: u64,
}

/// Everything needed to resume scoring: config, length statistics, weights.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSnapshot {
    pub metadata: ModelMetadata,
    pub config: LearnerConfig,
    pub length_stats: RunningStats,
    pub model: OnlineLogisticModel,
}

impl ModelSnapshot {
    /// Capture the current state of `trainer`.
    pub fn capture(trainer: &OnlineTrainer, config: &LearnerConfig, run_id: Uuid) -> Self {
        Self {
            metadata: ModelMetadata {
                name: MODEL_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                run_id,
                trained_at: Utc::now(),
                observations: trainer.trained_observations(),
            },
            config: LearnerConfig {
                sparse_dim: trainer.model().sparse_dim(),
                learning_rate: trainer.model().learning_rate(),
                hash: trainer.extractor().hash_function(),
                ..config.clone()
            },
            length_stats: trainer.extractor().length_stats().clone(),
            model: trainer.model().clone(),
        }
    }

    /// Check that the parts agree with each other.
    pub fn validate(&self) -> Result<()> {
        self.config.validate()?;
        if self.model.sparse_dim() != self.config.sparse_dim {
            return Err(ChangeLearnError::snapshot(format!(
                "model has sparse dimension {}, config says {}",
                self.model.sparse_dim(),
                self.config.sparse_dim
            )));
        }
        self.model.validate()
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        codec().serialize_into(&mut writer, self)?;
        writer.flush()?;
        log::info!(
            "saved snapshot {} ({} observations) to {}",
            self.metadata.run_id,
            self.metadata.observations,
            path.as_ref().display()
        );
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let snapshot: ModelSnapshot = codec().deserialize_from(reader)?;
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Rebuild a trainer that continues from this snapshot.
    pub fn into_trainer(self) -> Result<OnlineTrainer> {
        self.validate()?;
        let extractor = FeatureExtractor::with_stats(
            self.config.hash,
            self.config.sparse_dim,
            self.length_stats,
        );
        Ok(OnlineTrainer::from_parts(
            extractor,
            self.model,
            self.metadata.observations,
            &self.config,
        ))
    }
}
