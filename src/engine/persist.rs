//! Checkpoint persistence for the reference engine
//!
//! Checkpoints are JSON: the construction configuration plus flattened
//! weight and connection-mask data. Nothing time-dependent is written, so
//! saving an unchanged network twice produces byte-identical files.

use super::network::SparseNetwork;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Serializable snapshot of a network's construction and weights.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkState {
    /// Configuration the network was built with.
    pub config: super::NetworkConfig,
    /// Hidden layer weights, row-major, bias column last.
    pub hidden_weights: Vec<f32>,
    /// Hidden layer connection mask, aligned with the weights.
    pub hidden_mask: Vec<f32>,
    /// Output layer weights, row-major, bias column last.
    pub output_weights: Vec<f32>,
    /// Output layer connection mask, aligned with the weights.
    pub output_mask: Vec<f32>,
}

/// Persist a network to `path`, overwriting any previous checkpoint.
pub fn save_network(network: &SparseNetwork, path: impl AsRef<Path>) -> Result<()> {
    let path = path.as_ref();
    let state = network.to_state();
    let data = serde_json::to_string_pretty(&state)
        .map_err(|e| Error::Persistence(format!("{}: {e}", path.display())))?;
    std::fs::write(path, data)
        .map_err(|e| Error::Persistence(format!("{}: {e}", path.display())))?;
    Ok(())
}

/// Restore a network from a checkpoint written by [`save_network`].
///
/// Training state (step sizes, error accumulators) starts fresh; only the
/// configuration, weights, and connection masks survive a round trip.
pub fn load_network(path: impl AsRef<Path>) -> Result<SparseNetwork> {
    let path = path.as_ref();
    let data = std::fs::read_to_string(path).map_err(|e| {
        Error::NetworkConstruction(format!("cannot read {}: {e}", path.display()))
    })?;
    let state: NetworkState = serde_json::from_str(&data).map_err(|e| {
        Error::NetworkConstruction(format!("corrupt checkpoint {}: {e}", path.display()))
    })?;
    SparseNetwork::from_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{NetworkConfig, NetworkEngine};
    use tempfile::tempdir;

    fn seeded_network() -> SparseNetwork {
        SparseNetwork::new(&NetworkConfig::for_dims(2, 1).with_seed(42)).unwrap()
    }

    #[test]
    fn test_round_trip_preserves_predictions() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("net.json");
        let mut network = seeded_network();
        save_network(&network, &path).unwrap();

        let mut reloaded = load_network(&path).unwrap();
        let input = [0.25, 0.75];
        assert_eq!(
            network.predict(&input).unwrap(),
            reloaded.predict(&input).unwrap()
        );
    }

    #[test]
    fn test_repeated_save_is_byte_identical() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("net.json");
        let network = seeded_network();

        save_network(&network, &path).unwrap();
        let first = std::fs::read(&path).unwrap();
        save_network(&network, &path).unwrap();
        let second = std::fs::read(&path).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_save_then_load_then_save_is_stable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("net.json");
        let copy = dir.path().join("copy.json");
        let network = seeded_network();

        save_network(&network, &path).unwrap();
        let reloaded = load_network(&path).unwrap();
        save_network(&reloaded, &copy).unwrap();
        assert_eq!(
            std::fs::read(&path).unwrap(),
            std::fs::read(&copy).unwrap()
        );
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_network("/nonexistent/net.json");
        assert!(matches!(result, Err(Error::NetworkConstruction(_))));
    }

    #[test]
    fn test_load_corrupt_checkpoint() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("net.json");
        std::fs::write(&path, "{ not json").unwrap();

        let result = load_network(&path);
        assert!(matches!(result, Err(Error::NetworkConstruction(_))));
    }

    #[test]
    fn test_load_truncated_weight_data() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("net.json");
        let mut state = seeded_network().to_state();
        state.hidden_weights.pop();
        std::fs::write(&path, serde_json::to_string(&state).unwrap()).unwrap();

        let result = load_network(&path);
        assert!(matches!(result, Err(Error::NetworkConstruction(_))));
    }

    #[test]
    fn test_save_to_unwritable_path() {
        let network = seeded_network();
        let result = save_network(&network, "/nonexistent/dir/net.json");
        assert!(matches!(result, Err(Error::Persistence(_))));
    }
}
