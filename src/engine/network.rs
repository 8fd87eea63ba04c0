//! Reference feed-forward engine
//!
//! A three-layer, optionally sparse network with bias neurons. Supports
//! online backpropagation and iRPROP− batch updates, accumulates a
//! mean-squared error over every training or scoring pass, and persists to a
//! JSON checkpoint. The supervisor only ever sees it through the
//! [`NetworkEngine`] trait, so alternative engines can be dropped in.

use super::config::{Activation, NetworkConfig, RpropParams, TrainingAlgorithm};
use super::persist::{self, NetworkState};
use super::{EngineFactory, NetworkEngine};
use crate::data::Dataset;
use crate::{Error, Result};
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::path::Path;

// Weights are clamped to this magnitude after an iRPROP− step.
const WEIGHT_LIMIT: f32 = 1500.0;

/// One fully- or sparsely-connected layer.
///
/// Weight row `n` holds neuron `n`'s incoming connections; the last column is
/// the bias, which is always connected. The mask mirrors the weight shape
/// with 1.0 where a connection exists.
#[derive(Debug, Clone)]
struct Layer {
    weights: Array2<f32>,
    mask: Array2<f32>,
    activation: Activation,
    /// Activation values of the latest forward pass.
    values: Vec<f32>,
    /// Accumulated gradient of the current batch.
    slopes: Array2<f32>,
    prev_slopes: Array2<f32>,
    steps: Array2<f32>,
}

impl Layer {
    fn new(
        prev_width: usize,
        width: usize,
        connection_rate: f32,
        activation: Activation,
        delta_zero: f32,
        rng: &mut StdRng,
    ) -> Self {
        let cols = prev_width + 1;
        let mut weights = Array2::zeros((width, cols));
        let mut mask = Array2::zeros((width, cols));

        for n in 0..width {
            mask[[n, prev_width]] = 1.0;
            if connection_rate >= 1.0 {
                for j in 0..prev_width {
                    mask[[n, j]] = 1.0;
                }
            } else {
                // Each neuron keeps a random subset of incoming connections,
                // never fewer than one.
                let k = ((connection_rate * prev_width as f32).round() as usize)
                    .clamp(1, prev_width);
                for j in rand::seq::index::sample(rng, prev_width, k) {
                    mask[[n, j]] = 1.0;
                }
            }
            for j in 0..cols {
                if mask[[n, j]] == 1.0 {
                    weights[[n, j]] = rng.gen_range(-0.1..0.1);
                }
            }
        }

        Self {
            weights,
            mask,
            activation,
            values: vec![0.0; width],
            slopes: Array2::zeros((width, cols)),
            prev_slopes: Array2::zeros((width, cols)),
            steps: Array2::from_elem((width, cols), delta_zero),
        }
    }

    fn from_parts(weights: Array2<f32>, mask: Array2<f32>, activation: Activation, delta_zero: f32) -> Self {
        let shape = weights.raw_dim();
        let width = shape[0];
        Self {
            values: vec![0.0; width],
            slopes: Array2::zeros(shape),
            prev_slopes: Array2::zeros(shape),
            steps: Array2::from_elem(shape, delta_zero),
            weights,
            mask,
            activation,
        }
    }

    fn width(&self) -> usize {
        self.weights.nrows()
    }

    fn prev_width(&self) -> usize {
        self.weights.ncols() - 1
    }

    /// Run the layer forward from the previous layer's values.
    ///
    /// Masked weights are zero, so sparsity needs no special handling here.
    fn forward(&mut self, prev: &[f32]) {
        let bias = self.prev_width();
        for n in 0..self.width() {
            let mut sum = self.weights[[n, bias]];
            for (j, &x) in prev.iter().enumerate() {
                sum += self.weights[[n, j]] * x;
            }
            self.values[n] = self.activation.apply(sum);
        }
    }

    /// Online weight update for one example.
    fn apply_incremental(&mut self, deltas: &[f32], prev: &[f32], learning_rate: f32) {
        let bias = self.prev_width();
        for (n, &delta) in deltas.iter().enumerate() {
            let d = learning_rate * delta;
            for (j, &x) in prev.iter().enumerate() {
                self.weights[[n, j]] += d * x * self.mask[[n, j]];
            }
            self.weights[[n, bias]] += d;
        }
    }

    /// Add one example's gradient contribution to the batch slopes.
    fn accumulate_slopes(&mut self, deltas: &[f32], prev: &[f32]) {
        let bias = self.prev_width();
        for (n, &delta) in deltas.iter().enumerate() {
            for (j, &x) in prev.iter().enumerate() {
                self.slopes[[n, j]] += delta * x;
            }
            self.slopes[[n, bias]] += delta;
        }
    }

    fn zero_slopes(&mut self) {
        self.slopes.fill(0.0);
    }

    /// iRPROP− batch update: grow the step while the gradient sign holds,
    /// shrink it and skip the move after a sign flip.
    fn apply_irprop(&mut self, params: &RpropParams) {
        for n in 0..self.width() {
            for j in 0..self.weights.ncols() {
                if self.mask[[n, j]] == 0.0 {
                    continue;
                }
                let mut slope = self.slopes[[n, j]];
                let next_step = if self.prev_slopes[[n, j]] * slope >= 0.0 {
                    (self.steps[[n, j]] * params.increase_factor).min(params.delta_max)
                } else {
                    slope = 0.0;
                    (self.steps[[n, j]] * params.decrease_factor).max(params.delta_min)
                };
                if slope > 0.0 {
                    self.weights[[n, j]] = (self.weights[[n, j]] + next_step).min(WEIGHT_LIMIT);
                } else if slope < 0.0 {
                    self.weights[[n, j]] = (self.weights[[n, j]] - next_step).max(-WEIGHT_LIMIT);
                }
                self.steps[[n, j]] = next_step;
                self.prev_slopes[[n, j]] = slope;
            }
        }
    }
}

/// The reference engine: input → hidden → output with per-pass error
/// accounting.
#[derive(Debug, Clone)]
pub struct SparseNetwork {
    config: NetworkConfig,
    hidden: Layer,
    output: Layer,
    error_sum: f64,
    num_errors: usize,
}

impl SparseNetwork {
    /// Build a freshly initialized network from a validated configuration.
    pub fn new(config: &NetworkConfig) -> Result<Self> {
        config.validate()?;
        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let hidden = Layer::new(
            config.num_input,
            config.num_hidden,
            config.connection_rate,
            config.hidden_activation,
            config.rprop.delta_zero,
            &mut rng,
        );
        let output = Layer::new(
            config.num_hidden,
            config.num_output,
            config.connection_rate,
            config.output_activation,
            config.rprop.delta_zero,
            &mut rng,
        );
        Ok(Self {
            config: config.clone(),
            hidden,
            output,
            error_sum: 0.0,
            num_errors: 0,
        })
    }

    /// The configuration this network was built with.
    pub fn config(&self) -> &NetworkConfig {
        &self.config
    }

    pub(crate) fn to_state(&self) -> NetworkState {
        NetworkState {
            config: self.config.clone(),
            hidden_weights: self.hidden.weights.iter().copied().collect(),
            hidden_mask: self.hidden.mask.iter().copied().collect(),
            output_weights: self.output.weights.iter().copied().collect(),
            output_mask: self.output.mask.iter().copied().collect(),
        }
    }

    pub(crate) fn from_state(state: NetworkState) -> Result<Self> {
        state.config.validate()?;
        let hidden_shape = (state.config.num_hidden, state.config.num_input + 1);
        let output_shape = (state.config.num_output, state.config.num_hidden + 1);
        let delta_zero = state.config.rprop.delta_zero;

        let rebuild = |shape: (usize, usize), data: Vec<f32>, what: &str| {
            Array2::from_shape_vec(shape, data).map_err(|_| {
                Error::NetworkConstruction(format!(
                    "persisted {what} does not match the {}x{} topology",
                    shape.0, shape.1
                ))
            })
        };
        let hidden = Layer::from_parts(
            rebuild(hidden_shape, state.hidden_weights, "hidden weights")?,
            rebuild(hidden_shape, state.hidden_mask, "hidden mask")?,
            state.config.hidden_activation,
            delta_zero,
        );
        let output = Layer::from_parts(
            rebuild(output_shape, state.output_weights, "output weights")?,
            rebuild(output_shape, state.output_mask, "output mask")?,
            state.config.output_activation,
            delta_zero,
        );
        Ok(Self {
            config: state.config,
            hidden,
            output,
            error_sum: 0.0,
            num_errors: 0,
        })
    }

    fn check_dataset(&self, data: &Dataset) -> Result<()> {
        if data.num_input() != self.config.num_input || data.num_output() != self.config.num_output
        {
            return Err(Error::NetworkConstruction(format!(
                "network expects {}->{} but dataset is {}->{}",
                self.config.num_input,
                self.config.num_output,
                data.num_input(),
                data.num_output()
            )));
        }
        Ok(())
    }

    fn reset_error(&mut self) {
        self.error_sum = 0.0;
        self.num_errors = 0;
    }

    fn mean_error(&self) -> f32 {
        if self.num_errors == 0 {
            0.0
        } else {
            (self.error_sum / self.num_errors as f64) as f32
        }
    }

    fn forward(&mut self, input: &[f32]) {
        self.hidden.forward(input);
        self.output.forward(&self.hidden.values);
    }

    /// Output-layer deltas for one example; accumulates the squared error.
    fn output_deltas(&mut self, target: &[f32]) -> Vec<f32> {
        let mut deltas = vec![0.0; self.config.num_output];
        for (n, delta) in deltas.iter_mut().enumerate() {
            let value = self.output.values[n];
            let diff = target[n] - value;
            self.error_sum += f64::from(diff) * f64::from(diff);
            *delta = self.config.error_function.apply(diff)
                * self.config.output_activation.derive(value);
        }
        self.num_errors += 1;
        deltas
    }

    /// Hidden-layer deltas from the output deltas.
    fn hidden_deltas(&self, output_deltas: &[f32]) -> Vec<f32> {
        let mut deltas = vec![0.0; self.config.num_hidden];
        for (j, delta) in deltas.iter_mut().enumerate() {
            let mut sum = 0.0;
            for (n, &od) in output_deltas.iter().enumerate() {
                sum += od * self.output.weights[[n, j]];
            }
            *delta = sum * self.config.hidden_activation.derive(self.hidden.values[j]);
        }
        deltas
    }

    fn train_epoch_incremental(&mut self, data: &Dataset) {
        let lr = self.config.learning_rate;
        for i in 0..data.len() {
            self.forward(data.input(i));
            let output_deltas = self.output_deltas(data.target(i));
            let hidden_deltas = self.hidden_deltas(&output_deltas);
            self.output
                .apply_incremental(&output_deltas, &self.hidden.values, lr);
            self.hidden
                .apply_incremental(&hidden_deltas, data.input(i), lr);
        }
    }

    fn train_epoch_rprop(&mut self, data: &Dataset) {
        self.hidden.zero_slopes();
        self.output.zero_slopes();
        for i in 0..data.len() {
            self.forward(data.input(i));
            let output_deltas = self.output_deltas(data.target(i));
            let hidden_deltas = self.hidden_deltas(&output_deltas);
            self.output
                .accumulate_slopes(&output_deltas, &self.hidden.values);
            self.hidden.accumulate_slopes(&hidden_deltas, data.input(i));
        }
        let params = self.config.rprop;
        self.hidden.apply_irprop(&params);
        self.output.apply_irprop(&params);
    }
}

impl NetworkEngine for SparseNetwork {
    fn num_input(&self) -> usize {
        self.config.num_input
    }

    fn num_output(&self) -> usize {
        self.config.num_output
    }

    fn train_epoch(&mut self, data: &Dataset) -> Result<f32> {
        self.check_dataset(data)?;
        self.reset_error();
        match self.config.algorithm {
            TrainingAlgorithm::Incremental => self.train_epoch_incremental(data),
            TrainingAlgorithm::Rprop => self.train_epoch_rprop(data),
        }
        Ok(self.mean_error())
    }

    fn evaluate(&mut self, data: &Dataset) -> Result<f32> {
        self.check_dataset(data)?;
        self.reset_error();
        for i in 0..data.len() {
            self.forward(data.input(i));
            let value_count = self.config.num_output;
            for n in 0..value_count {
                let diff = data.target(i)[n] - self.output.values[n];
                self.error_sum += f64::from(diff) * f64::from(diff);
            }
            self.num_errors += 1;
        }
        Ok(self.mean_error())
    }

    fn predict(&mut self, input: &[f32]) -> Result<Vec<f32>> {
        if input.len() != self.config.num_input {
            return Err(Error::NetworkConstruction(format!(
                "network expects {} inputs, got {}",
                self.config.num_input,
                input.len()
            )));
        }
        self.forward(input);
        Ok(self.output.values.clone())
    }

    fn save(&self, path: &Path) -> Result<()> {
        persist::save_network(self, path)
    }
}

/// Builds or restores [`SparseNetwork`] engines.
#[derive(Debug, Clone, Copy, Default)]
pub struct SparseNetworkFactory;

impl EngineFactory for SparseNetworkFactory {
    type Engine = SparseNetwork;

    fn create_or_load(
        &self,
        config: &NetworkConfig,
        existing: Option<&Path>,
    ) -> Result<Self::Engine> {
        config.validate()?;
        match existing {
            Some(path) if path.exists() => {
                let network = persist::load_network(path)?;
                if network.num_input() != config.num_input
                    || network.num_output() != config.num_output
                {
                    return Err(Error::NetworkConstruction(format!(
                        "persisted network is {}->{} but {}->{} was requested",
                        network.num_input(),
                        network.num_output(),
                        config.num_input,
                        config.num_output
                    )));
                }
                Ok(network)
            }
            _ => SparseNetwork::new(config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn xor_data() -> Dataset {
        Dataset::new(
            vec![
                vec![0.0, 0.0],
                vec![0.0, 1.0],
                vec![1.0, 0.0],
                vec![1.0, 1.0],
            ],
            vec![vec![0.1], vec![0.9], vec![0.9], vec![0.1]],
        )
        .unwrap()
    }

    fn seeded_config() -> NetworkConfig {
        NetworkConfig::for_dims(2, 1).with_seed(42)
    }

    #[test]
    fn test_seeded_construction_is_deterministic() {
        let config = seeded_config();
        let mut a = SparseNetwork::new(&config).unwrap();
        let mut b = SparseNetwork::new(&config).unwrap();

        let out_a = a.predict(&[0.3, 0.7]).unwrap();
        let out_b = b.predict(&[0.3, 0.7]).unwrap();
        assert_eq!(out_a, out_b);
    }

    #[test]
    fn test_sigmoid_outputs_in_unit_interval() {
        let mut network = SparseNetwork::new(&seeded_config()).unwrap();
        for input in xor_data().inputs() {
            let out = network.predict(input).unwrap();
            assert_eq!(out.len(), 1);
            assert!(out[0] > 0.0 && out[0] < 1.0);
        }
    }

    #[test]
    fn test_predict_rejects_wrong_arity() {
        let mut network = SparseNetwork::new(&seeded_config()).unwrap();
        let result = network.predict(&[1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(Error::NetworkConstruction(_))));
    }

    #[test]
    fn test_train_rejects_mismatched_dataset() {
        let mut network = SparseNetwork::new(&seeded_config()).unwrap();
        let data = Dataset::new(vec![vec![0.0]], vec![vec![0.9]]).unwrap();
        assert!(matches!(
            network.train_epoch(&data),
            Err(Error::NetworkConstruction(_))
        ));
        assert!(network.evaluate(&data).is_err());
    }

    #[test]
    fn test_rprop_training_reduces_error() {
        let data = xor_data();
        let mut network = SparseNetwork::new(&seeded_config()).unwrap();

        let initial = network.evaluate(&data).unwrap();
        let mut last = initial;
        for _ in 0..200 {
            last = network.train_epoch(&data).unwrap();
        }
        assert!(last.is_finite());
        assert!(
            last < initial,
            "expected error to drop from {initial} but got {last}"
        );
    }

    #[test]
    fn test_incremental_training_reduces_error() {
        let data = Dataset::new(
            vec![vec![0.0], vec![1.0]],
            vec![vec![0.1], vec![0.9]],
        )
        .unwrap();
        let config = NetworkConfig::for_dims(1, 1)
            .with_algorithm(TrainingAlgorithm::Incremental)
            .with_seed(7);
        let mut network = SparseNetwork::new(&config).unwrap();

        let initial = network.evaluate(&data).unwrap();
        let mut last = initial;
        for _ in 0..300 {
            last = network.train_epoch(&data).unwrap();
        }
        assert!(last < initial);
    }

    #[test]
    fn test_evaluate_does_not_move_weights() {
        let data = xor_data();
        let mut network = SparseNetwork::new(&seeded_config()).unwrap();

        let before = network.predict(&[0.5, 0.5]).unwrap();
        network.evaluate(&data).unwrap();
        network.evaluate(&data).unwrap();
        let after = network.predict(&[0.5, 0.5]).unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_evaluate_is_repeatable() {
        let data = xor_data();
        let mut network = SparseNetwork::new(&seeded_config()).unwrap();
        let first = network.evaluate(&data).unwrap();
        let second = network.evaluate(&data).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_sparse_network_trains() {
        let data = xor_data();
        let config = NetworkConfig::for_dims(2, 1)
            .with_connection_rate(0.5)
            .with_seed(11);
        let mut network = SparseNetwork::new(&config).unwrap();

        let err = network.train_epoch(&data).unwrap();
        assert!(err.is_finite() && err >= 0.0);
    }

    #[test]
    fn test_factory_creates_fresh_when_path_missing() {
        let factory = SparseNetworkFactory;
        let config = seeded_config();
        let engine = factory
            .create_or_load(&config, Some(Path::new("/nonexistent/net.json")))
            .unwrap();
        assert_eq!(engine.num_input(), 2);
        assert_eq!(engine.num_output(), 1);
    }
}
