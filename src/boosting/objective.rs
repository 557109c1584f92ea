//! Binary log-loss objective.

use crate::core::error::{PipelineError, Result};
use crate::core::traits::ObjectiveFunction;
use crate::core::types::{Label, Probability, Score};

/// Probabilities are clamped this far from 0 and 1 before taking log-odds.
const PROBABILITY_EPSILON: f64 = 1e-15;

/// Smallest hessian handed to the tree learner.
const MIN_HESSIAN: f64 = 1e-16;

/// Logistic loss for labels in {0, 1}.
#[derive(Debug, Clone, Copy, Default)]
pub struct BinaryLogloss;

/// Logistic function.
#[inline]
pub fn sigmoid(score: Score) -> Probability {
    1.0 / (1.0 + (-score).exp())
}

impl ObjectiveFunction for BinaryLogloss {
    fn compute_gradients(
        &self,
        scores: &[Score],
        labels: &[Label],
        gradients: &mut [Score],
        hessians: &mut [Score],
    ) -> Result<()> {
        if scores.len() != labels.len()
            || gradients.len() != labels.len()
            || hessians.len() != labels.len()
        {
            return Err(PipelineError::training(format!(
                "Gradient buffers ({}, {}) do not match {} scores and {} labels",
                gradients.len(),
                hessians.len(),
                scores.len(),
                labels.len()
            )));
        }

        for i in 0..labels.len() {
            let p = sigmoid(scores[i]);
            gradients[i] = p - labels[i] as f64;
            hessians[i] = (p * (1.0 - p)).max(MIN_HESSIAN);
        }

        Ok(())
    }

    fn init_score(&self, labels: &[Label]) -> Score {
        if labels.is_empty() {
            return 0.0;
        }
        let positives: f64 = labels.iter().map(|&l| l as f64).sum();
        let rate = (positives / labels.len() as f64).clamp(PROBABILITY_EPSILON, 1.0 - PROBABILITY_EPSILON);
        (rate / (1.0 - rate)).ln()
    }

    fn transform(&self, score: Score) -> Probability {
        sigmoid(score)
    }

    fn name(&self) -> &'static str {
        "binary_logloss"
    }
}
