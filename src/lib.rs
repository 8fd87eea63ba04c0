//! # Supervisar: Training Supervision for Binary Classifiers
//!
//! Supervisar wraps a feed-forward network engine in the policy layer a real
//! training run needs: class-balance accounting, validation-driven best-model
//! checkpointing, asymmetric bit-fail scoring for imbalanced two-class
//! problems, periodic progress reporting, and interrupt-safe checkpoint
//! preservation.
//!
//! ## Architecture
//!
//! - **data**: Dataset loading and class-balance statistics
//! - **engine**: The `NetworkEngine`/`EngineFactory` boundary plus the
//!   reference sparse feed-forward implementation
//! - **score**: Mean error and false-low/false-high bit-fail breakdown
//! - **supervise**: The epoch loop, run state, and progress sinks
//! - **config**: Declarative YAML overrides for the CLI
//!
//! ## Example
//!
//! ```no_run
//! use supervisar::{
//!     ConsoleSink, Dataset, NetworkConfig, SparseNetworkFactory, SuperviseConfig,
//!     TrainingSupervisor,
//! };
//!
//! # fn main() -> supervisar::Result<()> {
//! let train = Dataset::load("spam.train")?;
//! let config = NetworkConfig::for_dims(train.num_input(), train.num_output());
//!
//! let mut supervisor = TrainingSupervisor::new(
//!     SparseNetworkFactory,
//!     config,
//!     None,
//!     train,
//!     None,
//!     "spam.net",
//!     SuperviseConfig::default().with_max_epochs(500),
//! )?;
//! let status = supervisor.run(&mut ConsoleSink::new())?;
//! let (error, bit_fail) = supervisor.final_report()?;
//! println!("{status}: error {error}, bit fails {bit_fail}");
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod score;
pub mod supervise;

// Re-export commonly used types
pub use config::Overrides;
pub use data::Dataset;
pub use engine::{
    Activation, EngineFactory, ErrorFunction, NetworkConfig, NetworkEngine, RpropParams,
    SparseNetwork, SparseNetworkFactory, TrainingAlgorithm,
};
pub use error::{Error, Result};
pub use score::{count_bit_fails, BitFail, ClassificationScorer};
pub use supervise::{
    interrupt_path, ConsoleSink, MemorySink, ProgressRecord, ProgressSink, RunState, RunStatus,
    SuperviseConfig, TrainingSupervisor,
};
