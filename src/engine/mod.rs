//! Network engine boundary
//!
//! The supervisor drives training through the [`NetworkEngine`] and
//! [`EngineFactory`] traits and never touches the numerics underneath. The
//! crate ships [`SparseNetwork`] as its reference implementation; anything
//! honoring the contracts below can replace it.

mod config;
mod network;
pub mod persist;

pub use config::{Activation, ErrorFunction, NetworkConfig, RpropParams, TrainingAlgorithm};
pub use network::{SparseNetwork, SparseNetworkFactory};

use crate::data::Dataset;
use crate::Result;
use std::path::Path;

/// One trainable network with persistence.
///
/// Calls against a single engine are strictly sequential: `train_epoch`
/// mutates the weights, `evaluate` and `predict` only touch internal error
/// accumulators and activation caches, and `save` observes the weights
/// without changing anything.
pub trait NetworkEngine {
    /// Expected input dimensionality.
    fn num_input(&self) -> usize;

    /// Expected output dimensionality.
    fn num_output(&self) -> usize;

    /// Run exactly one full pass of weight updates over `data` and return
    /// the resulting training error.
    fn train_epoch(&mut self, data: &Dataset) -> Result<f32>;

    /// Score the network over `data` without changing weights. Resets the
    /// internal error accumulator before the pass.
    fn evaluate(&mut self, data: &Dataset) -> Result<f32>;

    /// Output vector for a single input under the current weights.
    fn predict(&mut self, input: &[f32]) -> Result<Vec<f32>>;

    /// Persist the current weights to `path` with overwrite semantics.
    /// Saving an unchanged engine twice must produce identical bytes.
    fn save(&self, path: &Path) -> Result<()>;
}

/// Builds engines, fresh or from a persisted checkpoint.
pub trait EngineFactory {
    type Engine: NetworkEngine;

    /// Build a new engine from `config`, unless `existing` names a file that
    /// is present, in which case the persisted network is restored. A
    /// dimension mismatch against `config` or a corrupt checkpoint fails
    /// with [`crate::Error::NetworkConstruction`].
    fn create_or_load(
        &self,
        config: &NetworkConfig,
        existing: Option<&Path>,
    ) -> Result<Self::Engine>;
}
