//! Training supervision
//!
//! [`TrainingSupervisor`] owns the epoch loop around an engine: evaluate the
//! validation split, checkpoint on strict improvement, report at the
//! configured cadence, run one training epoch, and stop on convergence, an
//! exhausted iteration budget, or a cooperative interrupt. The loop never
//! aborts over a failed checkpoint write, and an interrupt always leaves an
//! emergency snapshot next to the canonical save path.

mod progress;

pub use progress::{ConsoleSink, MemorySink, ProgressRecord, ProgressSink};

use crate::data::Dataset;
use crate::engine::{EngineFactory, NetworkConfig, NetworkEngine};
use crate::score::{BitFail, ClassificationScorer};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Loop thresholds and cadences, all caller-supplied.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SuperviseConfig {
    /// Stop once the driving error reaches this value.
    pub desired_error: f32,

    /// Hard epoch budget.
    pub max_epochs: usize,

    /// Emit a progress record every this many epochs.
    pub report_interval: usize,

    /// Decision threshold for the bit-fail breakdown.
    pub error_center: f32,
}

impl Default for SuperviseConfig {
    fn default() -> Self {
        Self {
            desired_error: 1e-6,
            max_epochs: 1000,
            report_interval: 10,
            error_center: 0.5,
        }
    }
}

impl SuperviseConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the convergence threshold.
    pub fn with_desired_error(mut self, desired_error: f32) -> Self {
        self.desired_error = desired_error;
        self
    }

    /// Set the epoch budget.
    pub fn with_max_epochs(mut self, max_epochs: usize) -> Self {
        self.max_epochs = max_epochs;
        self
    }

    /// Set the reporting cadence.
    pub fn with_report_interval(mut self, report_interval: usize) -> Self {
        self.report_interval = report_interval;
        self
    }

    /// Set the bit-fail decision threshold.
    pub fn with_error_center(mut self, error_center: f32) -> Self {
        self.error_center = error_center;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_epochs == 0 {
            return Err(Error::Config("max_epochs must be at least 1".to_string()));
        }
        if self.report_interval == 0 {
            return Err(Error::Config(
                "report_interval must be at least 1".to_string(),
            ));
        }
        if !(self.desired_error >= 0.0 && self.desired_error.is_finite()) {
            return Err(Error::Config(format!(
                "desired_error must be a nonnegative number, got {}",
                self.desired_error
            )));
        }
        if !(self.error_center > 0.0 && self.error_center < 1.0) {
            return Err(Error::Config(format!(
                "error_center must be in (0, 1), got {}",
                self.error_center
            )));
        }
        Ok(())
    }
}

/// How a run left the epoch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// The driving error reached the desired threshold.
    Converged,
    /// The epoch budget ran out first.
    BudgetExhausted,
    /// A cooperative interrupt stopped the loop at an epoch boundary.
    Interrupted,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunStatus::Converged => "converged",
            RunStatus::BudgetExhausted => "epoch budget exhausted",
            RunStatus::Interrupted => "interrupted",
        };
        f.write_str(label)
    }
}

/// Mutable run state, owned by one supervisor.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunState {
    /// Completed epochs.
    pub epoch: usize,
    /// Epoch of the last recorded improvement.
    pub best_epoch: usize,
    /// Best driving error so far; unset until the first comparison records
    /// one.
    pub best_error: Option<f32>,
    /// Bit-fail breakdown at `best_epoch`; only tracked with a validation
    /// split.
    pub best_bit_fail: Option<BitFail>,
    /// Most recent epoch's training error.
    pub train_error: Option<f32>,
}

/// Path of the emergency checkpoint written on interruption.
pub fn interrupt_path(save_path: &Path) -> PathBuf {
    let mut os = save_path.as_os_str().to_os_string();
    os.push(".current");
    PathBuf::from(os)
}

/// Drives the epoch loop for one network.
pub struct TrainingSupervisor<F: EngineFactory> {
    factory: F,
    net_config: NetworkConfig,
    engine: F::Engine,
    train_data: Dataset,
    val_data: Option<Dataset>,
    save_path: PathBuf,
    config: SuperviseConfig,
    scorer: ClassificationScorer,
    state: RunState,
    stop_flag: Arc<AtomicBool>,
}

impl<F: EngineFactory> TrainingSupervisor<F> {
    /// Construct a supervisor and its engine.
    ///
    /// The engine is built fresh from `net_config` unless `load_path` names
    /// an existing checkpoint. Dimension mismatches between the topology and
    /// either split fail here, before any training happens.
    pub fn new(
        factory: F,
        net_config: NetworkConfig,
        load_path: Option<&Path>,
        train_data: Dataset,
        val_data: Option<Dataset>,
        save_path: impl Into<PathBuf>,
        config: SuperviseConfig,
    ) -> Result<Self> {
        config.validate()?;
        if net_config.num_input != train_data.num_input()
            || net_config.num_output != train_data.num_output()
        {
            return Err(Error::NetworkConstruction(format!(
                "topology is {}->{} but training data is {}->{}",
                net_config.num_input,
                net_config.num_output,
                train_data.num_input(),
                train_data.num_output()
            )));
        }
        if let Some(val) = &val_data {
            if val.num_input() != train_data.num_input()
                || val.num_output() != train_data.num_output()
            {
                return Err(Error::NetworkConstruction(format!(
                    "validation data is {}->{} but training data is {}->{}",
                    val.num_input(),
                    val.num_output(),
                    train_data.num_input(),
                    train_data.num_output()
                )));
            }
        }

        let engine = factory.create_or_load(&net_config, load_path)?;
        let scorer = ClassificationScorer::new(config.error_center);
        Ok(Self {
            factory,
            net_config,
            engine,
            train_data,
            val_data,
            save_path: save_path.into(),
            config,
            scorer,
            state: RunState::default(),
            stop_flag: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Whether a distinct validation split is in use.
    pub fn has_validation(&self) -> bool {
        self.val_data.is_some()
    }

    /// Current run state.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Canonical best-checkpoint path.
    pub fn save_path(&self) -> &Path {
        &self.save_path
    }

    /// Emergency checkpoint path used on interruption.
    pub fn current_path(&self) -> PathBuf {
        interrupt_path(&self.save_path)
    }

    /// Shared flag polled at epoch boundaries; set it from a signal handler
    /// or another thread to request a cooperative stop.
    pub fn stop_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop_flag)
    }

    fn validation_split(&self) -> &Dataset {
        self.val_data.as_ref().unwrap_or(&self.train_data)
    }

    /// Run the epoch loop to a terminal state.
    ///
    /// Engine failures during training or evaluation abort the run; a failed
    /// best-checkpoint write is reported and skipped so a transient I/O
    /// problem cannot discard further progress.
    pub fn run(&mut self, sink: &mut dyn ProgressSink) -> Result<RunStatus> {
        loop {
            // The engine call is atomic from our point of view, so the stop
            // flag is only honored between epochs.
            if self.stop_flag.load(Ordering::SeqCst) {
                return Ok(self.interrupt());
            }

            let err = match &self.val_data {
                Some(val) => Some(self.engine.evaluate(val)?),
                None => self.state.train_error,
            };

            // Epoch 0 always establishes the baseline checkpoint.
            let improved = self.state.epoch == 0
                || match (err, self.state.best_error) {
                    (Some(e), Some(best)) => e < best,
                    (Some(_), None) => true,
                    (None, _) => false,
                };
            if improved {
                self.checkpoint_best(err)?;
            }

            if self.state.epoch % self.config.report_interval == 0 {
                sink.report(&self.progress_record(err));
            }

            let train_error = self.engine.train_epoch(&self.train_data)?;
            self.state.train_error = Some(train_error);
            self.state.epoch += 1;

            let driving_error = match &self.val_data {
                Some(_) => err,
                None => Some(train_error),
            };
            if let Some(e) = driving_error {
                if e <= self.config.desired_error {
                    return Ok(RunStatus::Converged);
                }
            }
            if self.state.epoch >= self.config.max_epochs {
                return Ok(RunStatus::BudgetExhausted);
            }
        }
    }

    /// Persist the current network as the new best and update the recorded
    /// best state. When the write fails, the state is left untouched so the
    /// recorded best always describes the checkpoint actually on disk, and
    /// the next improvement retries.
    fn checkpoint_best(&mut self, err: Option<f32>) -> Result<()> {
        if let Err(e) = self.engine.save(&self.save_path) {
            eprintln!("warning: best checkpoint not written: {e}");
            return Ok(());
        }
        self.state.best_epoch = self.state.epoch;
        if err.is_some() {
            self.state.best_error = err;
        }
        if let Some(val) = &self.val_data {
            let (_, bit_fail) = self.scorer.score(&mut self.engine, val)?;
            self.state.best_bit_fail = Some(bit_fail);
        }
        Ok(())
    }

    /// Write the emergency checkpoint and leave the loop.
    ///
    /// The canonical path keeps the last validated best; the `.current` file
    /// preserves whatever weights existed at the moment of cancellation. A
    /// failed write is reported but does not change the outcome.
    fn interrupt(&mut self) -> RunStatus {
        let path = self.current_path();
        if let Err(e) = self.engine.save(&path) {
            eprintln!("warning: emergency checkpoint not written: {e}");
        }
        RunStatus::Interrupted
    }

    fn progress_record(&self, err: Option<f32>) -> ProgressRecord {
        ProgressRecord {
            epoch: self.state.epoch,
            train_error: self.state.train_error,
            validation_error: if self.val_data.is_some() { err } else { None },
            best_error: self.state.best_error,
            best_bit_fail: self.state.best_bit_fail,
            best_epoch: self.state.best_epoch,
        }
    }

    /// Reload the canonical best checkpoint and re-score it against the
    /// validation split, giving the final, reproducible error and bit-fail
    /// report.
    pub fn final_report(&mut self) -> Result<(f32, BitFail)> {
        if !self.save_path.exists() {
            return Err(Error::NetworkConstruction(format!(
                "no checkpoint at {}",
                self.save_path.display()
            )));
        }
        let mut best = self
            .factory
            .create_or_load(&self.net_config, Some(&self.save_path))?;
        let data = self.validation_split();
        self.scorer.score(&mut best, data)
    }
}
