//! Declarative YAML overrides
//!
//! Every network and supervision knob has a sensible default; an optional
//! YAML file tweaks the ones a run cares about. Absent fields keep their
//! defaults.
//!
//! # Example
//!
//! ```yaml
//! hidden_neurons: 30
//! learning_rate: 0.1
//! algorithm: incremental
//!
//! desired_error: 0.0001
//! max_epochs: 5000
//! report_interval: 100
//! ```

use crate::engine::{Activation, ErrorFunction, NetworkConfig, RpropParams, TrainingAlgorithm};
use crate::supervise::SuperviseConfig;
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Optional overrides for network construction and loop supervision.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Overrides {
    // Network construction
    pub connection_rate: Option<f32>,
    pub learning_rate: Option<f32>,
    pub hidden_neurons: Option<usize>,
    pub hidden_activation: Option<Activation>,
    pub output_activation: Option<Activation>,
    pub error_function: Option<ErrorFunction>,
    pub algorithm: Option<TrainingAlgorithm>,
    pub rprop: Option<RpropParams>,
    pub seed: Option<u64>,

    // Loop supervision
    pub desired_error: Option<f32>,
    pub max_epochs: Option<usize>,
    pub report_interval: Option<usize>,
    pub error_center: Option<f32>,
}

impl Overrides {
    /// Read overrides from a YAML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_yaml::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))
    }

    /// Apply every present field over the given configurations.
    ///
    /// The result is not validated here; construction validates once all
    /// sources (defaults, file, caller) have been merged.
    pub fn apply(&self, net: &mut NetworkConfig, supervise: &mut SuperviseConfig) {
        if let Some(rate) = self.connection_rate {
            net.connection_rate = rate;
        }
        if let Some(lr) = self.learning_rate {
            net.learning_rate = lr;
        }
        if let Some(hidden) = self.hidden_neurons {
            net.num_hidden = hidden;
        }
        if let Some(activation) = self.hidden_activation {
            net.hidden_activation = activation;
        }
        if let Some(activation) = self.output_activation {
            net.output_activation = activation;
        }
        if let Some(error_function) = self.error_function {
            net.error_function = error_function;
        }
        if let Some(algorithm) = self.algorithm {
            net.algorithm = algorithm;
        }
        if let Some(rprop) = self.rprop {
            net.rprop = rprop;
        }
        if let Some(seed) = self.seed {
            net.seed = Some(seed);
        }

        if let Some(desired_error) = self.desired_error {
            supervise.desired_error = desired_error;
        }
        if let Some(max_epochs) = self.max_epochs {
            supervise.max_epochs = max_epochs;
        }
        if let Some(report_interval) = self.report_interval {
            supervise.report_interval = report_interval;
        }
        if let Some(error_center) = self.error_center {
            supervise.error_center = error_center;
        }
    }
}
