//! Observation stream over a batched feed, with a pluggable stop condition.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::error::Result;
use crate::feed::ChangeFeed;
use crate::feed::record::{Observation, RawChange};

/// Decides, between batches, whether the stream should stop fetching.
pub trait StopCondition {
    /// `processed` is the number of observations yielded so far.
    fn should_stop(&self, processed: u64) -> bool;
}

impl<F: Fn(u64) -> bool> StopCondition for F {
    fn should_stop(&self, processed: u64) -> bool {
        self(processed)
    }
}

/// Never stops; the stream ends only when the feed is exhausted.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverStop;

impl StopCondition for NeverStop {
    fn should_stop(&self, _processed: u64) -> bool {
        false
    }
}

/// Stops once a wall-clock budget has elapsed since construction.
#[derive(Debug, Clone, Copy)]
pub struct TimeBudget {
    started: Instant,
    budget: Duration,
}

impl TimeBudget {
    pub fn new(budget: Duration) -> Self {
        Self {
            started: Instant::now(),
            budget,
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}

impl StopCondition for TimeBudget {
    fn should_stop(&self, _processed: u64) -> bool {
        self.started.elapsed() >= self.budget
    }
}

/// Why an [`ObservationStream`] ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamEnd {
    /// The stop condition fired between batches.
    Stopped,
    /// The feed returned an empty batch.
    Exhausted,
    /// Fetching a batch failed.
    Failed,
}

/// Iterator of observations pulled from a [`ChangeFeed`] one batch at a time.
///
/// The stop condition is only consulted when the buffered batch is used up,
/// so a batch that has been fetched is always consumed in full. After an
/// error the stream yields nothing further.
pub struct ObservationStream<F, S> {
    feed: F,
    stop: S,
    buffer: VecDeque<RawChange>,
    processed: u64,
    batches: u64,
    end: Option<StreamEnd>,
}

impl<F: ChangeFeed, S: StopCondition> ObservationStream<F, S> {
    pub fn new(feed: F, stop: S) -> Self {
        Self {
            feed,
            stop,
            buffer: VecDeque::new(),
            processed: 0,
            batches: 0,
            end: None,
        }
    }

    pub fn processed(&self) -> u64 {
        self.processed
    }

    pub fn batches(&self) -> u64 {
        self.batches
    }

    pub fn end(&self) -> Option<StreamEnd> {
        self.end
    }

    /// Give the feed back. Buffered but unread records are dropped.
    pub fn into_feed(self) -> F {
        self.feed
    }

    fn refill(&mut self) -> Option<Result<()>> {
        if self.stop.should_stop(self.processed) {
            log::info!(
                "stop condition reached after {} observations in {} batches",
                self.processed,
                self.batches
            );
            self.end = Some(StreamEnd::Stopped);
            return None;
        }
        match self.feed.next_batch() {
            Ok(batch) if batch.is_empty() => {
                log::info!("{} feed exhausted", self.feed.name());
                self.end = Some(StreamEnd::Exhausted);
                None
            }
            Ok(batch) => {
                self.batches += 1;
                log::debug!(
                    "fetched batch {} with {} records from {} feed",
                    self.batches,
                    batch.len(),
                    self.feed.name()
                );
                self.buffer.extend(batch);
                Some(Ok(()))
            }
            Err(e) => {
                self.end = Some(StreamEnd::Failed);
                Some(Err(e))
            }
        }
    }
}

impl<F: ChangeFeed, S: StopCondition> Iterator for ObservationStream<F, S> {
    type Item = Result<Observation>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.end.is_some() {
            return None;
        }
        if self.buffer.is_empty() {
            if let Err(e) = self.refill()? {
                return Some(Err(e));
            }
        }
        let raw = self.buffer.pop_front()?;
        self.processed += 1;
        Some(Ok(Observation::from(raw)))
    }
}
