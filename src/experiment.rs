//! The train-then-evaluate run over a change feed.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::LearnerConfig;
use crate::error::Result;
use crate::feed::{ChangeFeed, NeverStop, ObservationStream, StopCondition, TimeBudget};
use crate::ml::evaluation::{EvaluationReport, Evaluator};
use crate::ml::persistence::ModelSnapshot;
use crate::ml::trainer::{OnlineTrainer, TrainingReport};

/// Combined outcome of a training phase followed by an evaluation phase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentReport {
    pub run_id: Uuid,
    pub training: TrainingReport,
    pub evaluation: EvaluationReport,
}

/// A learner together with the settings of the run it belongs to.
#[derive(Debug, Clone)]
pub struct Experiment {
    config: LearnerConfig,
    trainer: OnlineTrainer,
    run_id: Uuid,
}

impl Experiment {
    pub fn new(config: LearnerConfig) -> Result<Self> {
        let trainer = OnlineTrainer::new(&config)?;
        Ok(Self {
            config,
            trainer,
            run_id: Uuid::new_v4(),
        })
    }

    /// Continue from a saved snapshot, keeping its run id.
    pub fn resume(snapshot: ModelSnapshot) -> Result<Self> {
        let config = snapshot.config.clone();
        let run_id = snapshot.metadata.run_id;
        let trainer = snapshot.into_trainer()?;
        Ok(Self {
            config,
            trainer,
            run_id,
        })
    }

    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    pub fn trainer(&self) -> &OnlineTrainer {
        &self.trainer
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Train on `feed` until `stop` fires or the feed is exhausted.
    pub fn train<F, S>(&mut self, feed: F, stop: S) -> Result<TrainingReport>
    where
        F: ChangeFeed,
        S: StopCondition,
    {
        log::info!("training phase started (run {})", self.run_id);
        let mut stream = ObservationStream::new(feed, stop);
        self.trainer.train(&mut stream)
    }

    /// Score the next `eval_size` observations of `feed` without learning.
    pub fn evaluate<F: ChangeFeed>(&mut self, feed: F) -> Result<EvaluationReport> {
        log::info!(
            "evaluation phase started on {} observations",
            self.config.eval_size
        );
        let stream = ObservationStream::new(feed, NeverStop);
        Evaluator::new(self.config.threshold).evaluate(
            &mut self.trainer,
            stream,
            self.config.eval_size,
        )
    }

    /// Train within the configured time budget, then evaluate on the
    /// observations that follow in the same feed.
    pub fn run<F: ChangeFeed>(&mut self, mut feed: F) -> Result<ExperimentReport> {
        let budget = TimeBudget::new(self.config.time_budget());
        let training = self.train(&mut feed, budget)?;
        let evaluation = self.evaluate(&mut feed)?;
        Ok(ExperimentReport {
            run_id: self.run_id,
            training,
            evaluation,
        })
    }

    pub fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot::capture(&self.trainer, &self.config, self.run_id)
    }
}
