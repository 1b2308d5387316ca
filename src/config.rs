//! Configuration for the learner and the change feed.
//!
//! Every value has a working default. A JSON file can override any subset
//! of fields, and CLI flags override the file.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ChangeLearnError, Result};
use crate::ml::hashing::HashFunction;

/// Default size of the hashed feature space, `2^18`.
pub const DEFAULT_SPARSE_DIM: usize = 1 << 18;

/// Default recent-changes endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://en.wikipedia.org/w/api.php";

/// Learner hyperparameters and run limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearnerConfig {
    /// Number of hashed feature slots per label.
    pub sparse_dim: usize,
    /// Step size of the gradient updates.
    pub learning_rate: f64,
    /// Wall-clock budget of the training phase, in seconds.
    pub time_budget_secs: u64,
    /// Number of observations scored by the evaluator.
    pub eval_size: usize,
    /// Probability above which a label is predicted as set.
    pub threshold: f64,
    /// Hash function for the categorical features.
    pub hash: HashFunction,
    /// Emit a progress line every this many training observations.
    pub log_every: u64,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            sparse_dim: DEFAULT_SPARSE_DIM,
            learning_rate: 0.1,
            time_budget_secs: 600,
            eval_size: 10_000,
            threshold: 0.5,
            hash: HashFunction::Crc32,
            log_every: 1_000,
        }
    }
}

impl LearnerConfig {
    pub fn time_budget(&self) -> Duration {
        Duration::from_secs(self.time_budget_secs)
    }

    /// Reject values the learner cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.sparse_dim == 0 {
            return Err(ChangeLearnError::invalid_config(
                "sparse_dim must be greater than zero",
            ));
        }
        if !self.learning_rate.is_finite() || self.learning_rate < 0.0 {
            return Err(ChangeLearnError::invalid_config(format!(
                "learning_rate must be finite and non-negative, got {}",
                self.learning_rate
            )));
        }
        if self.eval_size == 0 {
            return Err(ChangeLearnError::invalid_config(
                "eval_size must be greater than zero",
            ));
        }
        if !(self.threshold > 0.0 && self.threshold < 1.0) {
            return Err(ChangeLearnError::invalid_config(format!(
                "threshold must lie strictly between 0 and 1, got {}",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Where and how to poll the change feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub endpoint: String,
    /// Records requested per call, and lines read per replay batch.
    pub batch_size: usize,
    pub user_agent: String,
    /// Per-request timeout, in seconds.
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            batch_size: 100,
            user_agent: format!(
                "changelearn/{} (online classifier demo)",
                env!("CARGO_PKG_VERSION")
            ),
            timeout_secs: 30,
        }
    }
}

impl FeedConfig {
    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(ChangeLearnError::invalid_config(
                "batch_size must be greater than zero",
            ));
        }
        if self.endpoint.is_empty() {
            return Err(ChangeLearnError::invalid_config("endpoint must not be empty"));
        }
        Ok(())
    }
}

/// Top-level configuration file layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub learner: LearnerConfig,
    pub feed: FeedConfig,
}

impl Config {
    /// Load a JSON configuration file. Missing fields keep their defaults.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.learner.validate()?;
        self.feed.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_reference_values() {
        let config = Config::default();
        assert_eq!(config.learner.sparse_dim, 262_144);
        assert_eq!(config.learner.time_budget(), Duration::from_secs(600));
        assert_eq!(config.learner.eval_size, 10_000);
        assert_eq!(config.learner.threshold, 0.5);
        assert_eq!(config.feed.batch_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut learner = LearnerConfig::default();
        learner.sparse_dim = 0;
        assert!(learner.validate().is_err());

        let mut learner = LearnerConfig::default();
        learner.learning_rate = f64::NAN;
        assert!(learner.validate().is_err());

        let mut learner = LearnerConfig::default();
        learner.threshold = 1.0;
        assert!(learner.validate().is_err());

        let mut learner = LearnerConfig::default();
        learner.learning_rate = 0.0;
        assert!(learner.validate().is_ok());

        let mut feed = FeedConfig::default();
        feed.batch_size = 0;
        assert!(feed.validate().is_err());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        let json = r#"{
            "learner": {"learning_rate": 0.05, "hash": "ahash"},
            "feed": {"batch_size": 50}
        }"#;
        write!(file, "{json}").unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.learner.learning_rate, 0.05);
        assert_eq!(config.learner.hash, HashFunction::AHash);
        assert_eq!(config.learner.sparse_dim, DEFAULT_SPARSE_DIM);
        assert_eq!(config.feed.batch_size, 50);
        assert_eq!(config.feed.endpoint, DEFAULT_ENDPOINT);
    }

    #[test]
    fn test_invalid_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"learner": {{"eval_size": 0}}}}"#).unwrap();
        assert!(Config::from_file(file.path()).is_err());
    }
}
