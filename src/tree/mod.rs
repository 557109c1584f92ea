//! Histogram-based regression trees used by the boosted classifier.
//!
//! - [`node`]: node representation and gradient statistics
//! - [`tree`]: the tree container and row prediction
//! - [`histogram`]: binned feature storage and per-feature gradient histograms
//! - [`split`]: best-split search with learned missing-value direction
//! - [`learner`]: depth-wise tree growth

pub mod histogram;
pub mod learner;
pub mod node;
pub mod split;
pub mod tree;

pub use histogram::{build_histograms, BinnedMatrix, FeatureHistogram};
pub use learner::{TreeLearner, TreeLearnerConfig};
pub use node::{NodeStats, TreeNode};
pub use split::{best_split, best_split_for_feature, SplitCriteria, SplitInfo};
pub use tree::Tree;
