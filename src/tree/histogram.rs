//! Binned feature storage and gradient histograms.

use crate::core::error::Result;
use crate::core::types::{BinIndex, FeatureIndex, FeatureValue};
use crate::dataset::binning::BinMapper;
use crate::tree::node::NodeStats;
use ndarray::ArrayView2;
use rayon::prelude::*;

/// Column-major bin indices of a feature matrix with their mappers.
#[derive(Debug, Clone)]
pub struct BinnedMatrix {
    columns: Vec<Vec<BinIndex>>,
    mappers: Vec<BinMapper>,
    num_rows: usize,
}

impl BinnedMatrix {
    /// Fit one mapper per column and discretize every value, columns in parallel.
    pub fn from_features(features: ArrayView2<'_, FeatureValue>, max_bin: usize) -> Result<Self> {
        let binned = (0..features.ncols())
            .into_par_iter()
            .map(|j| {
                let column = features.column(j);
                let mapper = BinMapper::fit(column, max_bin)?;
                let bins = column.iter().map(|&v| mapper.value_to_bin(v)).collect();
                Ok((mapper, bins))
            })
            .collect::<Result<Vec<(BinMapper, Vec<BinIndex>)>>>()?;

        let (mappers, columns) = binned.into_iter().unzip();
        Ok(BinnedMatrix {
            columns,
            mappers,
            num_rows: features.nrows(),
        })
    }

    pub fn num_rows(&self) -> usize {
        self.num_rows
    }

    pub fn num_features(&self) -> usize {
        self.mappers.len()
    }

    pub fn mapper(&self, feature: FeatureIndex) -> &BinMapper {
        &self.mappers[feature]
    }

    /// Bin of `row` in `feature`.
    #[inline]
    pub fn bin(&self, row: usize, feature: FeatureIndex) -> BinIndex {
        self.columns[feature][row]
    }
}

/// Gradient statistics per bin of one feature.
#[derive(Debug, Clone)]
pub struct FeatureHistogram {
    feature: FeatureIndex,
    bins: Vec<NodeStats>,
}

impl FeatureHistogram {
    /// Accumulate the gradients of `rows` into the bins of `feature`.
    pub fn build(
        binned: &BinnedMatrix,
        feature: FeatureIndex,
        rows: &[usize],
        gradients: &[f64],
        hessians: &[f64],
    ) -> Self {
        let mut bins = vec![NodeStats::default(); binned.mapper(feature).num_bins()];
        let column = &binned.columns[feature];

        for &row in rows {
            bins[column[row] as usize].add(gradients[row], hessians[row]);
        }

        FeatureHistogram { feature, bins }
    }

    pub fn feature(&self) -> FeatureIndex {
        self.feature
    }

    pub fn bins(&self) -> &[NodeStats] {
        &self.bins
    }

    /// Statistics of the trailing missing-value bin.
    pub fn missing(&self) -> NodeStats {
        self.bins.last().copied().unwrap_or_default()
    }

    /// Statistics over all bins.
    pub fn total(&self) -> NodeStats {
        self.bins
            .iter()
            .fold(NodeStats::default(), |acc, b| acc.plus(b))
    }
}

/// Build the histograms of `features` over `rows`, one feature per task.
pub fn build_histograms(
    binned: &BinnedMatrix,
    features: &[FeatureIndex],
    rows: &[usize],
    gradients: &[f64],
    hessians: &[f64],
) -> Vec<FeatureHistogram> {
    features
        .par_iter()
        .map(|&f| FeatureHistogram::build(binned, f, rows, gradients, hessians))
        .collect()
}
