//! Sources of change records.
//!
//! A [`ChangeFeed`] hands out batches of [`RawChange`]s until it returns an
//! empty batch. [`ObservationStream`] flattens those batches into an
//! iterator of [`Observation`]s and consults a [`StopCondition`] between
//! batches.
//!
//! Available feeds:
//!
//! - [`HttpChangeFeed`]: the live recent-changes API.
//! - [`ReplayFeed`]: JSON lines captured earlier.
//! - [`SyntheticFeed`]: seeded generated records.
//! - [`PrefetchFeed`]: wraps any of the above and fetches on a background thread.

pub mod http;
pub mod prefetch;
pub mod record;
pub mod replay;
pub mod stream;
pub mod synthetic;

use crate::error::Result;

pub use http::{HttpChangeFeed, PageCursor, PageStep};
pub use prefetch::PrefetchFeed;
pub use record::{Observation, RawChange};
pub use replay::ReplayFeed;
pub use stream::{NeverStop, ObservationStream, StopCondition, StreamEnd, TimeBudget};
pub use synthetic::SyntheticFeed;

/// A batched source of change records.
pub trait ChangeFeed {
    /// Fetch the next batch. An empty batch means the feed is exhausted.
    fn next_batch(&mut self) -> Result<Vec<RawChange>>;

    /// Short name used in log lines.
    fn name(&self) -> &str;
}

impl<F: ChangeFeed + ?Sized> ChangeFeed for Box<F> {
    fn next_batch(&mut self) -> Result<Vec<RawChange>> {
        (**self).next_batch()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<F: ChangeFeed + ?Sized> ChangeFeed for &mut F {
    fn next_batch(&mut self) -> Result<Vec<RawChange>> {
        (**self).next_batch()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}
