//! Error types for changelearn.
//!
//! Every fallible operation in the crate returns [`Result`], whose error side
//! is the [`ChangeLearnError`] enum. Nothing in the training loop retries: a
//! feed, parse or numeric error ends the run.
//!
//! # Examples
//!
//! ```
//! use changelearn::error::{ChangeLearnError, Result};
//!
//! fn fetch() -> Result<()> {
//!     Err(ChangeLearnError::feed("endpoint returned no query block"))
//! }
//!
//! match fetch() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use anyhow;
use thiserror::Error;

use crate::ml::labels::Label;

/// The main error type for changelearn operations.
#[derive(Error, Debug)]
pub enum ChangeLearnError {
    /// I/O errors (replay files, snapshots, captures)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// HTTP transport or status errors from the change feed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Binary snapshot encoding errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// The change feed returned something unusable
    #[error("Feed error: {0}")]
    Feed(String),

    /// A replay line could not be decoded
    #[error("Parse error on line {line}: {message}")]
    Parse { line: usize, message: String },

    /// The logistic function produced a non-finite value
    #[error("Numeric overflow predicting {label}: dot product {value}")]
    NumericOverflow { label: Label, value: f64 },

    /// Invalid configuration values
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A model snapshot is inconsistent with itself
    #[error("Snapshot error: {0}")]
    Snapshot(String),

    /// Generic anyhow error
    #[error("{0:#}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with ChangeLearnError.
pub type Result<T> = std::result::Result<T, ChangeLearnError>;

impl ChangeLearnError {
    /// Create a new feed error.
    pub fn feed<S: Into<String>>(msg: S) -> Self {
        ChangeLearnError::Feed(msg.into())
    }

    /// Create a new parse error for a 1-based line number.
    pub fn parse<S: Into<String>>(line: usize, msg: S) -> Self {
        ChangeLearnError::Parse {
            line,
            message: msg.into(),
        }
    }

    /// Create a new invalid config error.
    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        ChangeLearnError::Config(msg.into())
    }

    /// Create a new snapshot error.
    pub fn snapshot<S: Into<String>>(msg: S) -> Self {
        ChangeLearnError::Snapshot(msg.into())
    }
}
