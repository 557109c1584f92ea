//! Gradient boosted decision tree classifier.
//!
//! Each boosting iteration fits one depth-limited regression tree to the
//! log-loss gradients of a row subsample, using a column subsample drawn once
//! per tree. All randomness comes from the caller's [`RandomSource`].

use crate::boosting::objective::BinaryLogloss;
use crate::config::BoosterParams;
use crate::core::error::{PipelineError, Result};
use crate::core::random::RandomSource;
use crate::core::traits::{ObjectiveFunction, Persistable, ProbabilisticClassifier};
use crate::core::types::{FeatureIndex, FeatureValue, Probability, Score};
use crate::dataset::frame::TrainingFrame;
use crate::tree::histogram::BinnedMatrix;
use crate::tree::learner::{TreeLearner, TreeLearnerConfig};
use crate::tree::split::SplitCriteria;
use crate::tree::tree::Tree;
use ndarray::ArrayView2;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// A fitted binary classifier. Immutable once [`fit`](Self::fit) returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostedClassifier {
    params: BoosterParams,
    init_score: Score,
    trees: Vec<Tree>,
    feature_names: Vec<String>,
}

impl GradientBoostedClassifier {
    /// Fit a classifier on `frame`.
    ///
    /// Fails when the frame is empty or holds a single class.
    pub fn fit(frame: &TrainingFrame, params: &BoosterParams, rng: &mut RandomSource) -> Result<Self> {
        params.validate()?;

        let num_rows = frame.num_rows();
        let num_features = frame.num_features();
        if num_rows == 0 {
            return Err(PipelineError::training("Cannot fit a classifier on zero rows"));
        }
        if frame.is_degenerate() {
            return Err(PipelineError::training(format!(
                "Training data needs both classes (positives={}, negatives={})",
                frame.positives(),
                frame.negatives()
            )));
        }

        let objective = BinaryLogloss;
        let labels = frame.labels().to_vec();
        let features = frame.features();
        let binned = BinnedMatrix::from_features(features.view(), params.max_bin)?;

        let learner = TreeLearner::new(
            &binned,
            TreeLearnerConfig {
                max_depth: params.max_depth,
                learning_rate: params.learning_rate,
                criteria: SplitCriteria {
                    lambda_l2: params.lambda_l2,
                    min_child_weight: params.min_child_weight,
                    min_data_in_leaf: params.min_data_in_leaf,
                },
            },
        );

        let init_score = objective.init_score(&labels);
        let mut scores = vec![init_score; num_rows];
        let mut gradients = vec![0.0; num_rows];
        let mut hessians = vec![0.0; num_rows];
        let mut trees = Vec::with_capacity(params.n_estimators);

        let rows_per_tree = subsample_size(num_rows, params.subsample);
        let features_per_tree = subsample_size(num_features, params.colsample_bytree);

        for iteration in 0..params.n_estimators {
            objective.compute_gradients(&scores, &labels, &mut gradients, &mut hessians)?;

            let rows = rng.sample_without_replacement(num_rows, rows_per_tree);
            let columns: Vec<FeatureIndex> =
                rng.sample_without_replacement(num_features, features_per_tree);

            let tree = learner.train(&gradients, &hessians, rows, &columns)?;

            scores
                .par_iter_mut()
                .zip(features.outer_iter().into_par_iter())
                .for_each(|(score, row)| *score += tree.predict_row(row));

            log::trace!("Iteration {}: {}", iteration, tree);
            trees.push(tree);
        }

        log::debug!(
            "Fitted {} trees on {} rows x {} features",
            trees.len(),
            num_rows,
            num_features
        );

        Ok(GradientBoostedClassifier {
            params: params.clone(),
            init_score,
            trees,
            feature_names: frame.feature_names().to_vec(),
        })
    }

    /// Raw additive scores (log-odds) of every row.
    pub fn predict_raw(&self, features: ArrayView2<'_, FeatureValue>) -> Result<Vec<Score>> {
        if features.ncols() != self.feature_names.len() {
            return Err(PipelineError::scoring(format!(
                "Model expects {} features, got {}",
                self.feature_names.len(),
                features.ncols()
            )));
        }

        Ok(features
            .outer_iter()
            .into_par_iter()
            .map(|row| {
                self.trees
                    .iter()
                    .fold(self.init_score, |acc, tree| acc + tree.predict_row(row))
            })
            .collect())
    }

    pub fn trees(&self) -> &[Tree] {
        &self.trees
    }

    pub fn params(&self) -> &BoosterParams {
        &self.params
    }

    pub fn init_score(&self) -> Score {
        self.init_score
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

impl ProbabilisticClassifier for GradientBoostedClassifier {
    fn predict_proba(&self, features: ArrayView2<'_, FeatureValue>) -> Result<Vec<Probability>> {
        let objective = BinaryLogloss;
        Ok(self
            .predict_raw(features)?
            .into_iter()
            .map(|s| objective.transform(s))
            .collect())
    }

    fn num_features(&self) -> usize {
        self.feature_names.len()
    }
}

impl Persistable for GradientBoostedClassifier {}

/// `round(n * fraction)`, at least one when `n > 0`.
fn subsample_size(n: usize, fraction: f64) -> usize {
    if n == 0 {
        return 0;
    }
    ((n as f64 * fraction).round() as usize).clamp(1, n)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array1, Array2};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    /// Label is 1 when x0 + noise > 0; x1 is pure noise with some NaN.
    fn synthetic(n: usize, seed: u64) -> TrainingFrame {
        let mut rng = StdRng::seed_from_u64(seed);
        let mut features = Array2::<f32>::zeros((n, 2));
        let mut labels = Array1::<f32>::zeros(n);

        for i in 0..n {
            let x0: f32 = rng.gen_range(-1.0..1.0);
            let x1: f32 = if rng.gen_bool(0.1) { f32::NAN } else { rng.gen_range(-1.0..1.0) };
            features[[i, 0]] = x0;
            features[[i, 1]] = x1;
            labels[i] = if x0 + rng.gen_range(-0.2..0.2) > 0.0 { 1.0 } else { 0.0 };
        }

        TrainingFrame::new(features, labels, vec!["x0".into(), "x1".into()]).unwrap()
    }

    fn params() -> BoosterParams {
        BoosterParams {
            n_estimators: 20,
            ..BoosterParams::default()
        }
    }

    #[test]
    fn test_fit_learns_signal() {
        let frame = synthetic(400, 7);
        let model = GradientBoostedClassifier::fit(&frame, &params(), &mut RandomSource::with_seed(1)).unwrap();

        assert_eq!(model.trees().len(), 20);
        assert_eq!(model.num_features(), 2);

        let probs = model.predict_proba(frame.features().view()).unwrap();
        assert_eq!(probs.len(), 400);
        assert!(probs.iter().all(|p| (0.0..=1.0).contains(p)));

        let correct = probs
            .iter()
            .zip(frame.labels().iter())
            .filter(|(&p, &y)| (p > 0.5) == (y > 0.5))
            .count();
        assert!(correct as f64 / 400.0 > 0.8, "accuracy too low: {}", correct);
    }

    #[test]
    fn test_fit_is_deterministic_per_seed() {
        let frame = synthetic(200, 3);
        let a = GradientBoostedClassifier::fit(&frame, &params(), &mut RandomSource::with_seed(9)).unwrap();
        let b = GradientBoostedClassifier::fit(&frame, &params(), &mut RandomSource::with_seed(9)).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_single_class() {
        let features = Array2::<f32>::zeros((3, 1));
        let labels = Array1::from_vec(vec![1.0f32, 1.0, 1.0]);
        let frame = TrainingFrame::new(features, labels, vec!["x".into()]).unwrap();

        let result = GradientBoostedClassifier::fit(&frame, &params(), &mut RandomSource::with_seed(0));
        assert!(matches!(result, Err(PipelineError::Training { .. })));
    }

    #[test]
    fn test_predict_checks_width() {
        let frame = synthetic(50, 5);
        let model = GradientBoostedClassifier::fit(&frame, &params(), &mut RandomSource::with_seed(2)).unwrap();
        let wrong = Array2::<f32>::zeros((4, 3));
        assert!(matches!(
            model.predict_proba(wrong.view()),
            Err(PipelineError::Scoring { .. })
        ));
    }

    #[test]
    fn test_persist_round_trip() {
        let frame = synthetic(80, 11);
        let model = GradientBoostedClassifier::fit(&frame, &params(), &mut RandomSource::with_seed(4)).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.bin");

        model.save_to_file(&path).unwrap();
        let restored = GradientBoostedClassifier::load_from_file(&path).unwrap();
        assert_eq!(restored, model);
    }

    #[test]
    fn test_subsample_size() {
        assert_eq!(subsample_size(0, 0.8), 0);
        assert_eq!(subsample_size(10, 0.8), 8);
        assert_eq!(subsample_size(2, 0.1), 1);
        assert_eq!(subsample_size(5, 1.0), 5);
    }
}
