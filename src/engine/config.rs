//! Network configuration
//!
//! Every knob the reference engine honors, with the classic defaults: a
//! three-layer topology with 15 hidden neurons, full connectivity, sigmoid
//! activations, the log-ratio error transform, and iRPROP− weight updates.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Neuron activation function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activation {
    /// Standard logistic sigmoid, output in (0, 1).
    #[default]
    Sigmoid,
    /// Symmetric sigmoid (tanh-shaped), output in (-1, 1).
    SigmoidSymmetric,
}

impl Activation {
    /// Apply the activation to a weighted input sum.
    pub fn apply(self, sum: f32) -> f32 {
        match self {
            Activation::Sigmoid => 1.0 / (1.0 + (-sum).exp()),
            Activation::SigmoidSymmetric => (sum * 0.5).tanh(),
        }
    }

    /// Derivative expressed in terms of the activation value.
    ///
    /// The value is clipped away from the saturation points so deltas keep
    /// propagating through near-saturated neurons.
    pub fn derive(self, value: f32) -> f32 {
        match self {
            Activation::Sigmoid => {
                let v = value.clamp(0.01, 0.99);
                v * (1.0 - v)
            }
            Activation::SigmoidSymmetric => {
                let v = value.clamp(-0.98, 0.98);
                0.5 * (1.0 - v * v)
            }
        }
    }
}

/// Transform applied to the raw output error before backpropagation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorFunction {
    /// Propagate the raw difference unchanged.
    Linear,
    /// Log-ratio transform, which punishes large differences harder.
    #[default]
    Tanh,
}

impl ErrorFunction {
    /// Transform a `desired - actual` difference.
    pub fn apply(self, diff: f32) -> f32 {
        match self {
            ErrorFunction::Linear => diff,
            ErrorFunction::Tanh => {
                let d = diff.clamp(-0.999_999_9, 0.999_999_9);
                ((1.0 + d) / (1.0 - d)).ln()
            }
        }
    }
}

/// Weight-update rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrainingAlgorithm {
    /// Online backpropagation, weights updated after every example.
    Incremental,
    /// iRPROP− batch updates driven by gradient sign agreement.
    #[default]
    Rprop,
}

/// Step-size control for the iRPROP− update rule.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpropParams {
    /// Step growth factor on consistent gradient sign.
    pub increase_factor: f32,
    /// Step shrink factor on a sign flip.
    pub decrease_factor: f32,
    /// Lower bound on the step size.
    pub delta_min: f32,
    /// Upper bound on the step size.
    pub delta_max: f32,
    /// Initial step size for every weight.
    pub delta_zero: f32,
}

impl Default for RpropParams {
    fn default() -> Self {
        Self {
            increase_factor: 1.2,
            decrease_factor: 0.5,
            delta_min: 0.0,
            delta_max: 50.0,
            delta_zero: 0.1,
        }
    }
}

/// Topology and hyperparameters for constructing a network.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Input layer width; must match the dataset's input dimensionality.
    pub num_input: usize,

    /// Hidden layer width.
    pub num_hidden: usize,

    /// Output layer width; must match the dataset's target dimensionality.
    pub num_output: usize,

    /// Fraction of possible forward connections realized, in (0, 1].
    /// 1.0 builds a fully connected network.
    pub connection_rate: f32,

    /// Learning rate for the incremental algorithm.
    pub learning_rate: f32,

    /// Hidden layer activation.
    pub hidden_activation: Activation,

    /// Output layer activation.
    pub output_activation: Activation,

    /// Output error transform.
    pub error_function: ErrorFunction,

    /// Weight-update rule.
    pub algorithm: TrainingAlgorithm,

    /// iRPROP− step-size parameters.
    pub rprop: RpropParams,

    /// Seed for weight initialization and connection sampling.
    /// `None` draws from the system entropy source.
    pub seed: Option<u64>,
}

impl NetworkConfig {
    /// Default configuration sized for the given dataset dimensionality.
    pub fn for_dims(num_input: usize, num_output: usize) -> Self {
        Self {
            num_input,
            num_hidden: 15,
            num_output,
            connection_rate: 1.0,
            learning_rate: 0.2,
            hidden_activation: Activation::default(),
            output_activation: Activation::default(),
            error_function: ErrorFunction::default(),
            algorithm: TrainingAlgorithm::default(),
            rprop: RpropParams::default(),
            seed: None,
        }
    }

    /// Set the hidden layer width.
    pub fn with_hidden(mut self, num_hidden: usize) -> Self {
        self.num_hidden = num_hidden;
        self
    }

    /// Set the connection rate.
    pub fn with_connection_rate(mut self, rate: f32) -> Self {
        self.connection_rate = rate;
        self
    }

    /// Set the learning rate.
    pub fn with_learning_rate(mut self, lr: f32) -> Self {
        self.learning_rate = lr;
        self
    }

    /// Set the weight-update rule.
    pub fn with_algorithm(mut self, algorithm: TrainingAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set the initialization seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Check every field before a network is built from this configuration.
    pub fn validate(&self) -> Result<()> {
        if self.num_input == 0 || self.num_hidden == 0 || self.num_output == 0 {
            return Err(Error::NetworkConstruction(format!(
                "layer sizes must be nonzero, got {}-{}-{}",
                self.num_input, self.num_hidden, self.num_output
            )));
        }
        if !(self.connection_rate > 0.0 && self.connection_rate <= 1.0) {
            return Err(Error::NetworkConstruction(format!(
                "connection rate must be in (0, 1], got {}",
                self.connection_rate
            )));
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return Err(Error::NetworkConstruction(format!(
                "learning rate must be positive, got {}",
                self.learning_rate
            )));
        }
        let r = &self.rprop;
        if r.increase_factor <= 1.0 || !(r.decrease_factor > 0.0 && r.decrease_factor < 1.0) {
            return Err(Error::NetworkConstruction(
                "step factors must satisfy increase > 1 and 0 < decrease < 1".to_string(),
            ));
        }
        if r.delta_min < 0.0 || r.delta_max <= r.delta_min || r.delta_zero <= 0.0 {
            return Err(Error::NetworkConstruction(
                "step bounds must satisfy 0 <= delta_min < delta_max and delta_zero > 0"
                    .to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_defaults() {
        let config = NetworkConfig::for_dims(4, 1);
        assert_eq!(config.num_input, 4);
        assert_eq!(config.num_hidden, 15);
        assert_eq!(config.num_output, 1);
        assert_eq!(config.connection_rate, 1.0);
        assert_eq!(config.learning_rate, 0.2);
        assert_eq!(config.algorithm, TrainingAlgorithm::Rprop);
        assert_eq!(config.error_function, ErrorFunction::Tanh);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_chain() {
        let config = NetworkConfig::for_dims(2, 1)
            .with_hidden(8)
            .with_connection_rate(0.5)
            .with_learning_rate(0.1)
            .with_algorithm(TrainingAlgorithm::Incremental)
            .with_seed(7);

        assert_eq!(config.num_hidden, 8);
        assert_eq!(config.connection_rate, 0.5);
        assert_eq!(config.algorithm, TrainingAlgorithm::Incremental);
        assert_eq!(config.seed, Some(7));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_layer() {
        let config = NetworkConfig::for_dims(0, 1);
        assert!(config.validate().is_err());

        let config = NetworkConfig::for_dims(2, 1).with_hidden(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_connection_rate() {
        assert!(NetworkConfig::for_dims(2, 1)
            .with_connection_rate(0.0)
            .validate()
            .is_err());
        assert!(NetworkConfig::for_dims(2, 1)
            .with_connection_rate(1.5)
            .validate()
            .is_err());
    }

    #[test]
    fn test_validate_rejects_bad_rprop_params() {
        let mut config = NetworkConfig::for_dims(2, 1);
        config.rprop.decrease_factor = 1.5;
        assert!(config.validate().is_err());

        let mut config = NetworkConfig::for_dims(2, 1);
        config.rprop.delta_max = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sigmoid_range_and_midpoint() {
        assert_relative_eq!(Activation::Sigmoid.apply(0.0), 0.5);
        assert!(Activation::Sigmoid.apply(10.0) > 0.99);
        assert!(Activation::Sigmoid.apply(-10.0) < 0.01);
    }

    #[test]
    fn test_symmetric_sigmoid_is_odd() {
        let a = Activation::SigmoidSymmetric;
        assert_relative_eq!(a.apply(0.0), 0.0);
        assert_relative_eq!(a.apply(2.0), -a.apply(-2.0));
        assert!(a.apply(20.0) < 1.0 && a.apply(20.0) > 0.9);
    }

    #[test]
    fn test_derivative_clipping() {
        // A fully saturated sigmoid still produces a nonzero derivative.
        assert!(Activation::Sigmoid.derive(1.0) > 0.0);
        assert!(Activation::SigmoidSymmetric.derive(-1.0) > 0.0);
    }

    #[test]
    fn test_error_function_linear_is_identity() {
        assert_eq!(ErrorFunction::Linear.apply(0.3), 0.3);
        assert_eq!(ErrorFunction::Linear.apply(-0.7), -0.7);
    }

    #[test]
    fn test_error_function_tanh_amplifies_large_errors() {
        let small = ErrorFunction::Tanh.apply(0.1);
        let large = ErrorFunction::Tanh.apply(0.9);
        assert!(small > 0.0);
        // The transform is superlinear: a 9x difference grows by more than 9x.
        assert!(large > 9.0 * small);
        // Odd symmetry and saturation safety.
        assert_relative_eq!(ErrorFunction::Tanh.apply(-0.5), -ErrorFunction::Tanh.apply(0.5));
        assert!(ErrorFunction::Tanh.apply(1.0).is_finite());
    }

    #[test]
    fn test_config_serde_round_trip() {
        let config = NetworkConfig::for_dims(3, 2).with_seed(42);
        let yaml = serde_yaml::to_string(&config).unwrap();
        let back: NetworkConfig = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, config);
    }
}
