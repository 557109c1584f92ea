//! Quantile discretization of feature columns.
//!
//! Every feature gets its own [`BinMapper`]. Non-missing values fall into
//! `num_value_bins()` ordered bins delimited by `upper_bounds`; NaN always maps
//! to a dedicated trailing missing bin so the split finder can learn a
//! default direction for it.

use crate::core::error::{PipelineError, Result};
use crate::core::types::{BinIndex, FeatureValue};
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Maps raw feature values of one column to bin indices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinMapper {
    /// Inclusive upper bound of each value bin; the last one is `+inf`
    upper_bounds: Vec<FeatureValue>,
    /// Number of NaN values seen while fitting
    num_missing: usize,
}

impl BinMapper {
    /// Fit bin boundaries on a feature column using at most `max_bin` bins,
    /// one of which is reserved for missing values.
    pub fn fit(values: ArrayView1<'_, FeatureValue>, max_bin: usize) -> Result<Self> {
        if max_bin < 2 {
            return Err(PipelineError::invalid_parameter(
                "max_bin",
                max_bin.to_string(),
                "must be at least 2",
            ));
        }

        let mut sorted: Vec<FeatureValue> = values.iter().copied().filter(|v| !v.is_nan()).collect();
        let num_missing = values.len() - sorted.len();
        sorted.sort_by(|a, b| a.total_cmp(b));

        let mut distinct = sorted.clone();
        distinct.dedup();

        let max_value_bins = max_bin - 1;
        let mut upper_bounds = if distinct.len() <= max_value_bins {
            distinct
                .windows(2)
                .map(|w| midpoint(w[0], w[1]))
                .collect::<Vec<_>>()
        } else {
            Self::quantile_bounds(&sorted, max_value_bins)
        };
        upper_bounds.push(FeatureValue::INFINITY);

        Ok(BinMapper {
            upper_bounds,
            num_missing,
        })
    }

    /// Cut points at evenly spaced quantiles of the sorted values.
    fn quantile_bounds(sorted: &[FeatureValue], num_bins: usize) -> Vec<FeatureValue> {
        let n = sorted.len();
        let mut bounds = Vec::with_capacity(num_bins);

        for i in 1..num_bins {
            let index = ((n - 1) as f64 * i as f64 / num_bins as f64).round() as usize;
            let value = sorted[index.min(n - 1)];
            // The maximum must stay in a bin of its own range, not become a bound.
            if value < sorted[n - 1] && bounds.last().map_or(true, |&last| value > last) {
                bounds.push(value);
            }
        }

        bounds
    }

    /// Bin index of a raw value. NaN maps to [`BinMapper::missing_bin`].
    pub fn value_to_bin(&self, value: FeatureValue) -> BinIndex {
        if value.is_nan() {
            return self.missing_bin();
        }
        self.upper_bounds.partition_point(|&bound| bound < value) as BinIndex
    }

    /// Raw-value threshold equivalent to "bin <= `bin`".
    pub fn bin_upper_bound(&self, bin: BinIndex) -> FeatureValue {
        self.upper_bounds
            .get(bin as usize)
            .copied()
            .unwrap_or(FeatureValue::INFINITY)
    }

    /// Number of bins holding non-missing values
    pub fn num_value_bins(&self) -> usize {
        self.upper_bounds.len()
    }

    /// Total number of bins including the missing bin
    pub fn num_bins(&self) -> usize {
        self.upper_bounds.len() + 1
    }

    /// Index of the bin reserved for NaN
    pub fn missing_bin(&self) -> BinIndex {
        self.upper_bounds.len() as BinIndex
    }

    /// Number of NaN values seen while fitting
    pub fn num_missing(&self) -> usize {
        self.num_missing
    }

    /// A feature with a single value bin cannot be split.
    pub fn is_trivial(&self) -> bool {
        self.upper_bounds.len() < 2
    }
}

fn midpoint(a: FeatureValue, b: FeatureValue) -> FeatureValue {
    let mid = a + (b - a) / 2.0;
    // Guard against rounding onto the upper value for adjacent floats.
    if mid >= b {
        a
    } else {
        mid
    }
}
