//! Background fetching so that network latency overlaps with training.

use std::thread;

use crossbeam_channel::{Receiver, bounded};

use crate::error::Result;
use crate::feed::ChangeFeed;
use crate::feed::record::RawChange;

/// Runs a feed on its own thread and hands batches over a bounded channel.
///
/// At most `capacity` batches wait in the channel. A fetch error is passed
/// through unchanged and ends the worker, as does an empty batch. Dropping
/// the `PrefetchFeed` makes the worker exit at its next send.
#[derive(Debug)]
pub struct PrefetchFeed {
    receiver: Receiver<Result<Vec<RawChange>>>,
    name: String,
    finished: bool,
}

impl PrefetchFeed {
    pub fn spawn<F>(mut feed: F, capacity: usize) -> Result<Self>
    where
        F: ChangeFeed + Send + 'static,
    {
        let (sender, receiver) = bounded(capacity.max(1));
        let name = format!("prefetch:{}", feed.name());

        thread::Builder::new()
            .name("changelearn-prefetch".to_string())
            .spawn(move || {
                loop {
                    let batch = feed.next_batch();
                    let last = !matches!(&batch, Ok(records) if !records.is_empty());
                    if sender.send(batch).is_err() {
                        log::debug!("prefetch receiver dropped, stopping worker");
                        break;
                    }
                    if last {
                        break;
                    }
                }
            })?;

        Ok(Self {
            receiver,
            name,
            finished: false,
        })
    }
}

impl ChangeFeed for PrefetchFeed {
    fn next_batch(&mut self) -> Result<Vec<RawChange>> {
        if self.finished {
            return Ok(Vec::new());
        }
        match self.receiver.recv() {
            Ok(Ok(batch)) => {
                self.finished = batch.is_empty();
                Ok(batch)
            }
            Ok(Err(e)) => {
                self.finished = true;
                Err(e)
            }
            Err(_) => {
                self.finished = true;
                Ok(Vec::new())
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
