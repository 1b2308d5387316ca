//! JSONL replay of captured change records.

use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use crate::error::{ChangeLearnError, Result};
use crate::feed::ChangeFeed;
use crate::feed::record::RawChange;

/// Reads one [`RawChange`] per line, `batch_size` records at a time.
///
/// Blank lines are skipped. A line that does not decode stops the run with
/// its 1-based line number.
pub struct ReplayFeed {
    reader: Box<dyn BufRead + Send>,
    batch_size: usize,
    line: usize,
    exhausted: bool,
}

impl std::fmt::Debug for ReplayFeed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplayFeed")
            .field("batch_size", &self.batch_size)
            .field("line", &self.line)
            .field("exhausted", &self.exhausted)
            .finish()
    }
}

impl ReplayFeed {
    pub fn open<P: AsRef<Path>>(path: P, batch_size: usize) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self::from_reader(BufReader::new(file), batch_size))
    }

    pub fn from_reader<R: BufRead + Send + 'static>(reader: R, batch_size: usize) -> Self {
        Self {
            reader: Box::new(reader),
            batch_size: batch_size.max(1),
            line: 0,
            exhausted: false,
        }
    }

    /// Number of lines consumed so far.
    pub fn lines_read(&self) -> usize {
        self.line
    }
}

impl ChangeFeed for ReplayFeed {
    fn next_batch(&mut self) -> Result<Vec<RawChange>> {
        let mut batch = Vec::with_capacity(self.batch_size);
        let mut buf = String::new();
        while !self.exhausted && batch.len() < self.batch_size {
            buf.clear();
            if self.reader.read_line(&mut buf)? == 0 {
                self.exhausted = true;
                break;
            }
            self.line += 1;
            let text = buf.trim();
            if text.is_empty() {
                continue;
            }
            let record = serde_json::from_str::<RawChange>(text)
                .map_err(|e| ChangeLearnError::parse(self.line, e.to_string()))?;
            batch.push(record);
        }
        Ok(batch)
    }

    fn name(&self) -> &str {
        "replay"
    }
}

/// Write records as JSON lines.
pub fn write_records<W: Write>(writer: &mut W, records: &[RawChange]) -> Result<()> {
    for record in records {
        serde_json::to_writer(&mut *writer, record)?;
        writer.write_all(b"\n")?;
    }
    Ok(())
}
