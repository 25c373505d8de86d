//! Stats Log
//!
//! Append-only JSONL log of per-epoch counters.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use mob_events::{EpochStats, RunSummary};

use super::OutputError;

pub struct StatsLogger {
    writer: Option<BufWriter<File>>,
    interval: u64,
    line_count: u64,
}

impl StatsLogger {
    /// Creates a logger writing every `interval`-th epoch to `path`.
    ///
    /// With `append` set an existing log is continued, as when resuming.
    pub fn new(path: impl AsRef<Path>, interval: u64, append: bool) -> Result<Self, OutputError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .append(append)
            .truncate(!append)
            .open(path)?;

        Ok(Self {
            writer: Some(BufWriter::new(file)),
            interval,
            line_count: 0,
        })
    }

    /// Create a logger that discards stats (for testing)
    pub fn null() -> Self {
        Self {
            writer: None,
            interval: 1,
            line_count: 0,
        }
    }

    pub fn should_log(&self, epoch: u64) -> bool {
        self.interval > 0 && epoch % self.interval == 0
    }

    pub fn line_count(&self) -> u64 {
        self.line_count
    }

    /// Writes `stats` if its epoch falls on the interval.
    pub fn record(&mut self, stats: &EpochStats) -> Result<(), OutputError> {
        if self.should_log(stats.epoch) {
            self.log(stats)?;
        }
        Ok(())
    }

    /// Writes `stats` unconditionally.
    pub fn log(&mut self, stats: &EpochStats) -> Result<(), OutputError> {
        self.line_count += 1;
        if let Some(ref mut writer) = self.writer {
            writeln!(writer, "{}", stats.to_jsonl()?)?;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), OutputError> {
        if let Some(ref mut writer) = self.writer {
            writer.flush()?;
        }
        Ok(())
    }
}

impl Drop for StatsLogger {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!("failed to flush stats log: {}", e);
        }
    }
}

/// Writes the end-of-run summary as pretty JSON.
pub fn write_summary(summary: &RunSummary, path: impl AsRef<Path>) -> Result<(), OutputError> {
    fs::write(path, serde_json::to_string_pretty(summary)?)?;
    Ok(())
}
