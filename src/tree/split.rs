//! Best-split search over gradient histograms.

use crate::core::types::{BinIndex, FeatureIndex, FeatureValue};
use crate::dataset::binning::BinMapper;
use crate::tree::histogram::{BinnedMatrix, FeatureHistogram};
use crate::tree::node::NodeStats;

/// Minimum loss reduction for a split to be accepted.
const MIN_SPLIT_GAIN: f64 = 1e-12;

/// A candidate split of one node.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitInfo {
    /// Feature column
    pub feature: FeatureIndex,
    /// Rows whose bin is `<= threshold_bin` go left
    pub threshold_bin: BinIndex,
    /// Raw-value equivalent of `threshold_bin`
    pub threshold: FeatureValue,
    /// Direction of the missing bin
    pub default_left: bool,
    /// Loss reduction
    pub gain: f64,
    /// Statistics routed left
    pub left: NodeStats,
    /// Statistics routed right
    pub right: NodeStats,
}

/// Constraints a child must satisfy.
#[derive(Debug, Clone, Copy)]
pub struct SplitCriteria {
    pub lambda_l2: f64,
    pub min_child_weight: f64,
    pub min_data_in_leaf: usize,
}

impl SplitCriteria {
    fn admits(&self, child: &NodeStats) -> bool {
        child.count >= self.min_data_in_leaf.max(1) && child.sum_hessians >= self.min_child_weight
    }

    fn split_gain(&self, parent: &NodeStats, left: &NodeStats, right: &NodeStats) -> f64 {
        left.gain(self.lambda_l2) + right.gain(self.lambda_l2) - parent.gain(self.lambda_l2)
    }
}

/// Best split of one feature histogram, trying the missing bin on both sides.
pub fn best_split_for_feature(
    histogram: &FeatureHistogram,
    mapper: &BinMapper,
    criteria: &SplitCriteria,
) -> Option<SplitInfo> {
    if mapper.is_trivial() {
        return None;
    }

    let parent = histogram.total();
    let missing = histogram.missing();
    let value_bins = &histogram.bins()[..mapper.num_value_bins()];
    let directions: &[bool] = if missing.count > 0 {
        &[false, true]
    } else {
        &[false]
    };

    let mut best: Option<SplitInfo> = None;
    let mut left_values = NodeStats::default();

    // The last value bin cannot be a threshold: everything would go left.
    for (bin, stats) in value_bins.iter().enumerate().take(value_bins.len() - 1) {
        left_values = left_values.plus(stats);

        for &default_left in directions {
            let left = if default_left {
                left_values.plus(&missing)
            } else {
                left_values
            };
            let right = parent.minus(&left);

            if !criteria.admits(&left) || !criteria.admits(&right) {
                continue;
            }

            let gain = criteria.split_gain(&parent, &left, &right);
            if gain > MIN_SPLIT_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                best = Some(SplitInfo {
                    feature: histogram.feature(),
                    threshold_bin: bin as BinIndex,
                    threshold: mapper.bin_upper_bound(bin as BinIndex),
                    default_left,
                    gain,
                    left,
                    right,
                });
            }
        }
    }

    best
}

/// Best split across histograms; ties keep the lowest feature index.
pub fn best_split(
    histograms: &[FeatureHistogram],
    binned: &BinnedMatrix,
    criteria: &SplitCriteria,
) -> Option<SplitInfo> {
    histograms
        .iter()
        .filter_map(|h| best_split_for_feature(h, binned.mapper(h.feature()), criteria))
        .fold(None, |best: Option<SplitInfo>, candidate| match best {
            Some(b) if b.gain > candidate.gain => Some(b),
            Some(b) if b.gain == candidate.gain && b.feature < candidate.feature => Some(b),
            _ => Some(candidate),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn criteria() -> SplitCriteria {
        SplitCriteria {
            lambda_l2: 0.0,
            min_child_weight: 0.0,
            min_data_in_leaf: 1,
        }
    }

    #[test]
    fn test_finds_separating_threshold() {
        let features = array![[1.0f32], [2.0], [3.0], [4.0]];
        let binned = BinnedMatrix::from_features(features.view(), 16).unwrap();
        // Gradients of a logloss step at p = 0.5 with labels 0, 0, 1, 1.
        let gradients = [0.5, 0.5, -0.5, -0.5];
        let hessians = [0.25; 4];
        let hist = FeatureHistogram::build(&binned, 0, &[0, 1, 2, 3], &gradients, &hessians);

        let split = best_split_for_feature(&hist, binned.mapper(0), &criteria()).unwrap();
        assert_eq!(split.threshold_bin, 1);
        assert!(split.threshold > 2.0 && split.threshold < 3.0);
        assert_eq!(split.left.count, 2);
        assert_eq!(split.right.count, 2);
        assert!(!split.default_left);
        assert!(split.gain > 0.0);
    }

    #[test]
    fn test_learns_missing_direction() {
        let features = array![[1.0f32], [2.0], [3.0], [4.0], [f32::NAN], [f32::NAN]];
        let binned = BinnedMatrix::from_features(features.view(), 16).unwrap();
        // Missing rows behave like the low values.
        let gradients = [0.5, 0.5, -0.5, -0.5, 0.5, 0.5];
        let hessians = [0.25; 6];
        let rows: Vec<usize> = (0..6).collect();
        let hist = FeatureHistogram::build(&binned, 0, &rows, &gradients, &hessians);

        let split = best_split_for_feature(&hist, binned.mapper(0), &criteria()).unwrap();
        assert!(split.default_left);
        assert_eq!(split.left.count, 4);
    }

    #[test]
    fn test_respects_min_data() {
        let features = array![[1.0f32], [2.0], [3.0]];
        let binned = BinnedMatrix::from_features(features.view(), 16).unwrap();
        let gradients = [1.0, -1.0, -1.0];
        let hessians = [0.25; 3];
        let hist = FeatureHistogram::build(&binned, 0, &[0, 1, 2], &gradients, &hessians);

        let strict = SplitCriteria {
            min_data_in_leaf: 2,
            ..criteria()
        };
        assert!(best_split_for_feature(&hist, binned.mapper(0), &strict).is_none());
    }

    #[test]
    fn test_constant_feature_has_no_split() {
        let features = array![[1.0f32], [1.0]];
        let binned = BinnedMatrix::from_features(features.view(), 16).unwrap();
        let hist = FeatureHistogram::build(&binned, 0, &[0, 1], &[1.0, -1.0], &[0.25, 0.25]);
        assert!(best_split_for_feature(&hist, binned.mapper(0), &criteria()).is_none());
    }
}
