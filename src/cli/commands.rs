//! Command implementations for the changelearn CLI.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::time::Instant;

use anyhow::Context;

use crate::cli::args::*;
use crate::cli::output::*;
use crate::config::FeedConfig;
use crate::error::{ChangeLearnError, Result};
use crate::experiment::{Experiment, ExperimentReport};
use crate::feed::replay::write_records;
use crate::feed::{ChangeFeed, HttpChangeFeed, PrefetchFeed, ReplayFeed, SyntheticFeed};
use crate::ml::evaluation::EvaluationReport;
use crate::ml::persistence::ModelSnapshot;

/// Batches buffered ahead of the consumer when `--prefetch` is set.
const PREFETCH_CAPACITY: usize = 4;

/// Execute a CLI command.
pub fn execute_command(args: ChangeLearnArgs) -> Result<()> {
    match &args.command {
        Command::Train(train_args) => train(train_args, &args),
        Command::Evaluate(evaluate_args) => evaluate(evaluate_args, &args),
        Command::Capture(capture_args) => capture(capture_args, &args),
    }
}

/// Build the feed selected by `source`.
pub fn open_feed(source: &SourceArgs, config: &FeedConfig) -> Result<Box<dyn ChangeFeed + Send>> {
    config.validate()?;

    let feed: Box<dyn ChangeFeed + Send> = match source.source {
        FeedSource::Http => Box::new(HttpChangeFeed::new(config)?),
        FeedSource::Replay => {
            let path = source.replay_file.as_ref().ok_or_else(|| {
                ChangeLearnError::invalid_config("--replay-file is required for the replay source")
            })?;
            let feed = ReplayFeed::open(path, config.batch_size)
                .with_context(|| format!("failed to open replay file {}", path.display()))?;
            Box::new(feed)
        }
        FeedSource::Synthetic => {
            let feed = SyntheticFeed::new(source.seed, config.batch_size);
            match source.synthetic_limit {
                Some(limit) => Box::new(feed.with_limit(limit)),
                None => Box::new(feed),
            }
        }
    };

    log::info!("reading changes from {}", feed.name());
    if source.prefetch {
        Ok(Box::new(PrefetchFeed::spawn(feed, PREFETCH_CAPACITY)?))
    } else {
        Ok(feed)
    }
}

/// Train for the configured budget, evaluate, and optionally save the model.
fn train(args: &TrainArgs, cli_args: &ChangeLearnArgs) -> Result<()> {
    let report = run_training(args)?;
    if let (Some(path), true) = (&args.save_model, cli_args.verbosity() > 1) {
        println!("Model saved to {}", path.display());
    }
    output_result("Training complete", &report, cli_args)
}

/// Run the train-then-evaluate experiment described by `args`.
pub fn run_training(args: &TrainArgs) -> Result<ExperimentReport> {
    let config = args.resolve_config()?;
    log::info!(
        "training for {}s, then evaluating on {} observations",
        config.learner.time_budget_secs,
        config.learner.eval_size
    );

    let feed = open_feed(&args.source, &config.feed)?;
    let mut experiment = Experiment::new(config.learner)?;
    let report = experiment.run(feed)?;

    if let Some(path) = &args.save_model {
        experiment
            .snapshot()
            .save(path)
            .with_context(|| format!("failed to save model to {}", path.display()))?;
    }
    Ok(report)
}

/// Evaluate a saved model on fresh observations.
fn evaluate(args: &EvaluateArgs, cli_args: &ChangeLearnArgs) -> Result<()> {
    let report = run_evaluation(args)?;
    output_result("Evaluation complete", &report, cli_args)
}

/// Load the model named by `args` and score it on its feed.
pub fn run_evaluation(args: &EvaluateArgs) -> Result<EvaluationReport> {
    let mut snapshot = ModelSnapshot::load(&args.model)
        .with_context(|| format!("failed to load model from {}", args.model.display()))?;
    if let Some(eval_size) = args.eval_size {
        snapshot.config.eval_size = eval_size;
    }
    log::info!(
        "loaded model {} trained on {} observations",
        snapshot.metadata.run_id,
        snapshot.metadata.observations
    );

    let feed_config = args.source.feed_config(&FeedConfig::default());
    let feed = open_feed(&args.source, &feed_config)?;
    let mut experiment = Experiment::resume(snapshot)?;
    experiment.evaluate(feed)
}

/// Copy raw records from a feed into a JSONL file.
fn capture(args: &CaptureArgs, cli_args: &ChangeLearnArgs) -> Result<()> {
    let feed_config = args.source.feed_config(&FeedConfig::default());
    let mut feed = open_feed(&args.source, &feed_config)?;

    let file = File::create(&args.output)
        .with_context(|| format!("failed to create {}", args.output.display()))?;
    let mut writer = BufWriter::new(file);

    let start = Instant::now();
    let mut records = 0usize;
    let mut batches = 0u64;
    while records < args.count {
        let mut batch = feed.next_batch()?;
        if batch.is_empty() {
            log::warn!(
                "{} exhausted after {records} of {} records",
                feed.name(),
                args.count
            );
            break;
        }
        batch.truncate(args.count - records);
        write_records(&mut writer, &batch)?;
        records += batch.len();
        batches += 1;
    }
    writer.flush()?;

    let result = CaptureResult {
        path: args.output.display().to_string(),
        records,
        batches,
        duration_ms: start.elapsed().as_millis() as u64,
    };
    output_result("Capture complete", &result, cli_args)
}
