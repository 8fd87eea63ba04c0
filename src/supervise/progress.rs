//! Progress reporting
//!
//! The supervisor emits a [`ProgressRecord`] at the configured cadence and
//! stays agnostic about where it goes; sinks decide. [`ConsoleSink`] prints
//! the classic one-line report, [`MemorySink`] records everything for
//! inspection in tests.

use crate::score::BitFail;
use serde::{Deserialize, Serialize};

/// Snapshot of the run state at one reporting point.
///
/// Errors are `None` while the corresponding value has not been produced
/// yet: the training error before the first epoch finishes, the best error
/// before the first improvement is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub epoch: usize,
    pub train_error: Option<f32>,
    pub validation_error: Option<f32>,
    pub best_error: Option<f32>,
    pub best_bit_fail: Option<BitFail>,
    pub best_epoch: usize,
}

/// Receives progress records during a run.
pub trait ProgressSink {
    fn report(&mut self, record: &ProgressRecord);
}

/// Prints one line per report to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink;

impl ConsoleSink {
    pub fn new() -> Self {
        Self
    }
}

impl ProgressSink for ConsoleSink {
    fn report(&mut self, record: &ProgressRecord) {
        if record.validation_error.is_some() {
            println!(
                "Epochs: {}, CTErr: {}, CVErr: {}, BVErr: {}, BitF[#err,[#elo,#ehi]]: {}, LSEp: {}",
                record.epoch,
                fmt_error(record.train_error),
                fmt_error(record.validation_error),
                fmt_error(record.best_error),
                fmt_bit_fail(record.best_bit_fail),
                record.best_epoch
            );
        } else {
            println!(
                "Epochs: {}, CTErr: {}",
                record.epoch,
                fmt_error(record.train_error)
            );
        }
    }
}

/// Collects every record; used by tests and embedding callers.
#[derive(Debug, Clone, Default)]
pub struct MemorySink {
    pub records: Vec<ProgressRecord>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressSink for MemorySink {
    fn report(&mut self, record: &ProgressRecord) {
        self.records.push(*record);
    }
}

fn fmt_error(value: Option<f32>) -> String {
    match value {
        Some(v) => format!("{v:.6}"),
        None => "N/A".to_string(),
    }
}

fn fmt_bit_fail(value: Option<BitFail>) -> String {
    match value {
        Some(bf) => bf.to_string(),
        None => "N/A".to_string(),
    }
}
