//! Asymmetric classification scoring
//!
//! For imbalanced two-class problems a single error number hides which side
//! of the threshold is failing. [`ClassificationScorer`] pairs the engine's
//! mean error with a [`BitFail`] breakdown that counts false lows and false
//! highs separately around a configurable error center.

use crate::data::{Dataset, CLASS_THRESHOLD};
use crate::engine::NetworkEngine;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Misclassification counts around a decision threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BitFail {
    /// `false_low + false_high`.
    pub total: usize,
    /// Low-class examples the model pushed above the error center.
    pub false_low: usize,
    /// High-class examples the model pulled below the error center.
    pub false_high: usize,
}

impl fmt::Display for BitFail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, [{}, {}]]", self.total, self.false_low, self.false_high)
    }
}

/// Count bit fails over aligned output/target pairs.
///
/// A "false low" is a target below the class threshold whose output landed
/// above `error_center`; a "false high" is the reverse. Targets sitting
/// exactly on the class threshold belong to neither class and are never
/// counted. Summation makes the counts order-independent.
pub fn count_bit_fails(outputs: &[Vec<f32>], targets: &[Vec<f32>], error_center: f32) -> BitFail {
    let mut false_low = 0;
    let mut false_high = 0;
    for (output, target) in outputs.iter().zip(targets) {
        if target[0] < CLASS_THRESHOLD && output[0] > error_center {
            false_low += 1;
        } else if target[0] > CLASS_THRESHOLD && output[0] < error_center {
            false_high += 1;
        }
    }
    BitFail {
        total: false_low + false_high,
        false_low,
        false_high,
    }
}

/// Scores an engine against a dataset.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationScorer {
    error_center: f32,
}

impl ClassificationScorer {
    pub fn new(error_center: f32) -> Self {
        Self { error_center }
    }

    pub fn error_center(&self) -> f32 {
        self.error_center
    }

    /// Mean error plus bit-fail breakdown for `engine` over `data`.
    ///
    /// The engine's error accumulator is reset by the scoring pass; its
    /// weights are not touched. Every example is visited exactly once per
    /// pass.
    pub fn score<E: NetworkEngine + ?Sized>(
        &self,
        engine: &mut E,
        data: &Dataset,
    ) -> Result<(f32, BitFail)> {
        let mean_error = engine.evaluate(data)?;
        let mut outputs = Vec::with_capacity(data.len());
        for input in data.inputs() {
            outputs.push(engine.predict(input)?);
        }
        Ok((mean_error, count_bit_fails(&outputs, data.targets(), self.error_center)))
    }
}

impl Default for ClassificationScorer {
    fn default() -> Self {
        Self::new(CLASS_THRESHOLD)
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    fn example_strategy() -> impl Strategy<Value = (f32, f32)> {
        // (output, target) pairs, targets occasionally exactly on threshold
        (
            0.0f32..=1.0f32,
            prop_oneof![Just(0.5f32), 0.0f32..=1.0f32],
        )
    }

    proptest! {
        #[test]
        fn prop_counts_invariant_under_permutation(
            examples in prop::collection::vec(example_strategy(), 1..40),
            seed in 0u64..1000
        ) {
            let outputs: Vec<Vec<f32>> = examples.iter().map(|&(o, _)| vec![o]).collect();
            let targets: Vec<Vec<f32>> = examples.iter().map(|&(_, t)| vec![t]).collect();
            let baseline = count_bit_fails(&outputs, &targets, 0.5);

            // Deterministic Fisher-Yates over the paired indices.
            let mut order: Vec<usize> = (0..examples.len()).collect();
            let mut state = seed.wrapping_add(1);
            for i in (1..order.len()).rev() {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
                order.swap(i, (state % (i as u64 + 1)) as usize);
            }
            let outputs_p: Vec<Vec<f32>> = order.iter().map(|&i| outputs[i].clone()).collect();
            let targets_p: Vec<Vec<f32>> = order.iter().map(|&i| targets[i].clone()).collect();

            prop_assert_eq!(count_bit_fails(&outputs_p, &targets_p, 0.5), baseline);
        }

        #[test]
        fn prop_total_is_sum_and_bounded(
            examples in prop::collection::vec(example_strategy(), 0..40)
        ) {
            let outputs: Vec<Vec<f32>> = examples.iter().map(|&(o, _)| vec![o]).collect();
            let targets: Vec<Vec<f32>> = examples.iter().map(|&(_, t)| vec![t]).collect();

            let bf = count_bit_fails(&outputs, &targets, 0.5);
            prop_assert_eq!(bf.total, bf.false_low + bf.false_high);
            prop_assert!(bf.total <= examples.len());
        }
    }
}
