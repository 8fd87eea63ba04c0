//! Error types for supervisar

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed dataset file. Fatal before any network exists.
    #[error("failed to load dataset {}: {reason}", path.display())]
    DataLoad { path: PathBuf, reason: String },

    /// Topology/dataset dimension mismatch or a corrupt persisted network.
    #[error("network construction failed: {0}")]
    NetworkConstruction(String),

    /// Checkpoint write failure. The in-memory network and any previous
    /// on-disk checkpoint are left untouched.
    #[error("checkpoint persistence failed: {0}")]
    Persistence(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
