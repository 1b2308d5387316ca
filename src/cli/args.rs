//! Command line argument parsing for the changelearn CLI using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::config::{Config, FeedConfig};
use crate::error::Result;
use crate::ml::hashing::HashFunction;

/// changelearn - online multilabel classification of wiki changes
#[derive(Parser, Debug, Clone)]
#[command(name = "changelearn")]
#[command(about = "Train and evaluate an online logistic classifier on a live change feed")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = None)]
pub struct ChangeLearnArgs {
    /// Verbosity level (0=quiet, 1=normal, 2=verbose, 3=debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (overrides verbose)
    #[arg(short, long)]
    pub quiet: bool,

    /// Output format
    #[arg(short = 'f', long = "format", default_value = "human")]
    pub output_format: OutputFormat,

    /// Pretty-print JSON output
    #[arg(long)]
    pub pretty: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}

impl ChangeLearnArgs {
    /// Get the effective verbosity level
    pub fn verbosity(&self) -> u8 {
        if self.quiet {
            0
        } else {
            match self.verbose {
                0 => 1, // Default to normal
                n => n,
            }
        }
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Train within a time budget, then evaluate on fresh observations
    Train(TrainArgs),

    /// Evaluate a saved model on fresh observations
    Evaluate(EvaluateArgs),

    /// Record raw changes to a JSONL file for later replay
    Capture(CaptureArgs),
}

/// Where observations come from.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedSource {
    /// Poll the live recent-changes API
    Http,
    /// Read a JSONL capture
    Replay,
    /// Generate seeded synthetic changes
    Synthetic,
}

/// Hash function choices exposed on the command line.
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashArg {
    Crc32,
    Ahash,
}

impl From<HashArg> for HashFunction {
    fn from(arg: HashArg) -> Self {
        match arg {
            HashArg::Crc32 => HashFunction::Crc32,
            HashArg::Ahash => HashFunction::AHash,
        }
    }
}

/// Feed selection shared by every command
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Feed to read changes from
    #[arg(short, long, default_value = "http")]
    pub source: FeedSource,

    /// API endpoint for the http source
    #[arg(long, env = "CHANGELEARN_ENDPOINT")]
    pub endpoint: Option<String>,

    /// JSONL file for the replay source
    #[arg(long, value_name = "FILE")]
    pub replay_file: Option<PathBuf>,

    /// Seed for the synthetic source
    #[arg(long, default_value = "42")]
    pub seed: u64,

    /// Stop the synthetic source after this many records
    #[arg(long)]
    pub synthetic_limit: Option<usize>,

    /// Records per request or replay batch
    #[arg(short, long)]
    pub batch_size: Option<usize>,

    /// Fetch batches on a background thread
    #[arg(long)]
    pub prefetch: bool,
}

impl SourceArgs {
    /// Apply the flags on top of `base`.
    pub fn feed_config(&self, base: &FeedConfig) -> FeedConfig {
        let mut feed = base.clone();
        if let Some(endpoint) = &self.endpoint {
            feed.endpoint = endpoint.clone();
        }
        if let Some(batch_size) = self.batch_size {
            feed.batch_size = batch_size;
        }
        feed
    }
}

/// Arguments for training
#[derive(Args, Debug, Clone)]
pub struct TrainArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// JSON configuration file
    #[arg(short, long, value_name = "CONFIG_FILE")]
    pub config: Option<PathBuf>,

    /// Wall-clock training budget in seconds
    #[arg(short, long)]
    pub time_budget_secs: Option<u64>,

    /// Learning rate of the gradient updates
    #[arg(long)]
    pub learning_rate: Option<f64>,

    /// Size of the hashed feature space
    #[arg(long)]
    pub sparse_dim: Option<usize>,

    /// Hash function for categorical features
    #[arg(long)]
    pub hash: Option<HashArg>,

    /// Observations to evaluate after training
    #[arg(short, long)]
    pub eval_size: Option<usize>,

    /// Probability above which a label is predicted
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Write the trained model to this file
    #[arg(long, value_name = "MODEL_FILE")]
    pub save_model: Option<PathBuf>,
}

impl TrainArgs {
    /// Load the configuration file, if any, and apply the flags on top.
    pub fn resolve_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };

        let learner = &mut config.learner;
        if let Some(secs) = self.time_budget_secs {
            learner.time_budget_secs = secs;
        }
        if let Some(rate) = self.learning_rate {
            learner.learning_rate = rate;
        }
        if let Some(dim) = self.sparse_dim {
            learner.sparse_dim = dim;
        }
        if let Some(hash) = self.hash {
            learner.hash = hash.into();
        }
        if let Some(size) = self.eval_size {
            learner.eval_size = size;
        }
        if let Some(threshold) = self.threshold {
            learner.threshold = threshold;
        }
        config.feed = self.source.feed_config(&config.feed);

        config.validate()?;
        Ok(config)
    }
}

/// Arguments for evaluating a saved model
#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Model file written by `train --save-model`
    #[arg(short, long, value_name = "MODEL_FILE")]
    pub model: PathBuf,

    /// Observations to evaluate
    #[arg(short, long)]
    pub eval_size: Option<usize>,
}

/// Arguments for capturing raw changes
#[derive(Args, Debug, Clone)]
pub struct CaptureArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Number of records to capture
    #[arg(short = 'n', long, default_value = "1000")]
    pub count: usize,

    /// Output JSONL file
    #[arg(short, long, value_name = "FILE")]
    pub output: PathBuf,
}

/// Output formats for CLI
#[derive(ValueEnum, Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable output
    Human,
    /// JSON output
    Json,
}
