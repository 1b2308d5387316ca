//! # changelearn
//!
//! Online multilabel logistic regression over a live wiki change feed.
//!
//! ## Features
//!
//! - Welford-normalised length feature and hashed categorical features
//! - Three independent online logistic classifiers (bot, minor, new)
//! - Time-budgeted single-pass training with progressive validation
//! - Confusion matrix over the 8 label tuples
//! - HTTP, JSONL replay and synthetic feeds, with optional prefetching
//! - Binary model snapshots

pub mod cli;
pub mod config;
pub mod error;
pub mod experiment;
pub mod feed;
pub mod ml;

pub mod prelude {
    pub use crate::config::{Config, FeedConfig, LearnerConfig};
    pub use crate::error::{ChangeLearnError, Result};
    pub use crate::experiment::{Experiment, ExperimentReport};
    pub use crate::feed::{ChangeFeed, ObservationStream, StopCondition, TimeBudget};
    pub use crate::ml::{Evaluator, Label, LabelSet, ModelSnapshot, OnlineTrainer};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
