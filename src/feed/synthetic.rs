//! Seeded generator of plausible change records for offline runs.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::Result;
use crate::feed::ChangeFeed;
use crate::feed::record::RawChange;

const BOT_USERS: &[&str] = &["ClueBot NG", "InternetArchiveBot", "Cewbot", "AnomieBOT"];
const BOT_COMMENTS: &[&str] = &[
    "Bot: archiving 2 threads",
    "Rescuing 1 sources and tagging 0 as dead",
    "Dating maintenance tags",
];
const HUMAN_COMMENTS: &[&str] = &["copyedit", "typo", "/* History */ expand", "", "rv vandalism"];
const NUM_HUMANS: usize = 200;
const NUM_PAGES: usize = 5_000;

/// Deterministic stream of synthetic recent changes.
///
/// Flags correlate with usernames, comments and sizes, so a learner has
/// something to pick up. The same seed always yields the same records.
#[derive(Debug)]
pub struct SyntheticFeed {
    rng: StdRng,
    batch_size: usize,
    remaining: Option<usize>,
}

impl SyntheticFeed {
    pub fn new(seed: u64, batch_size: usize) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            batch_size: batch_size.max(1),
            remaining: None,
        }
    }

    /// Stop after `limit` records instead of running forever.
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.remaining = Some(limit);
        self
    }

    fn pick<'a>(&mut self, items: &'a [&'a str]) -> &'a str {
        items[self.rng.random_range(0..items.len())]
    }

    fn generate(&mut self) -> RawChange {
        let bot = self.rng.random_bool(0.3);
        let new = self.rng.random_bool(if bot { 0.02 } else { 0.08 });
        let minor = !new && self.rng.random_bool(if bot { 0.8 } else { 0.25 });

        let user = if bot {
            self.pick(BOT_USERS).to_string()
        } else {
            format!("Editor{}", self.rng.random_range(0..NUM_HUMANS))
        };

        let (oldlen, newlen, parsedcomment) = if new {
            let size = self.rng.random_range(500..5_000);
            (0, size, "Created page".to_string())
        } else {
            let oldlen = self.rng.random_range(1_000..50_000);
            let spread = if bot { 50 } else { 2_000 };
            let delta = self.rng.random_range(-spread..=spread);
            let comment = if bot {
                self.pick(BOT_COMMENTS)
            } else {
                self.pick(HUMAN_COMMENTS)
            };
            (oldlen, oldlen + delta, comment.to_string())
        };

        RawChange {
            title: format!("Page {}", self.rng.random_range(0..NUM_PAGES)),
            user,
            oldlen,
            newlen,
            parsedcomment,
            bot,
            minor,
            new,
        }
    }
}

impl ChangeFeed for SyntheticFeed {
    fn next_batch(&mut self) -> Result<Vec<RawChange>> {
        let count = match self.remaining {
            Some(remaining) => remaining.min(self.batch_size),
            None => self.batch_size,
        };
        if let Some(remaining) = self.remaining.as_mut() {
            *remaining -= count;
        }
        Ok((0..count).map(|_| self.generate()).collect())
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_seed_same_records() {
        let mut a = SyntheticFeed::new(7, 50);
        let mut b = SyntheticFeed::new(7, 50);
        assert_eq!(a.next_batch().unwrap(), b.next_batch().unwrap());
    }

    #[test]
    fn test_limit_exhausts_feed() {
        let mut feed = SyntheticFeed::new(1, 40).with_limit(100);
        let sizes: Vec<usize> = (0..4).map(|_| feed.next_batch().unwrap().len()).collect();
        assert_eq!(sizes, vec![40, 40, 20, 0]);
    }

    #[test]
    fn test_new_pages_start_empty() {
        let mut feed = SyntheticFeed::new(3, 500);
        for change in feed.next_batch().unwrap() {
            if change.new {
                assert_eq!(change.oldlen, 0);
                assert!(!change.minor);
            }
        }
    }
}
