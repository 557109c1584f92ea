//! Depth-wise tree learner over binned features.

use crate::core::error::{PipelineError, Result};
use crate::core::types::{FeatureIndex, NodeIndex, Score};
use crate::tree::histogram::{build_histograms, BinnedMatrix};
use crate::tree::node::NodeStats;
use crate::tree::split::{best_split, SplitCriteria, SplitInfo};
use crate::tree::tree::Tree;
use std::collections::VecDeque;

/// Growth limits and regularization of a single tree.
#[derive(Debug, Clone, Copy)]
pub struct TreeLearnerConfig {
    pub max_depth: usize,
    pub learning_rate: f64,
    pub criteria: SplitCriteria,
}

/// A node waiting to be considered for splitting.
struct PendingNode {
    index: NodeIndex,
    rows: Vec<usize>,
    depth: usize,
}

/// Grows one tree breadth-first until `max_depth` or no admissible split.
#[derive(Debug)]
pub struct TreeLearner<'a> {
    binned: &'a BinnedMatrix,
    config: TreeLearnerConfig,
}

impl<'a> TreeLearner<'a> {
    pub fn new(binned: &'a BinnedMatrix, config: TreeLearnerConfig) -> Self {
        TreeLearner { binned, config }
    }

    /// Fit a tree to the gradients of `rows`, splitting only on `features`.
    pub fn train(
        &self,
        gradients: &[Score],
        hessians: &[Score],
        rows: Vec<usize>,
        features: &[FeatureIndex],
    ) -> Result<Tree> {
        if gradients.len() != self.binned.num_rows() || hessians.len() != self.binned.num_rows() {
            return Err(PipelineError::training(
                "Gradient and hessian arrays must match the number of rows",
            ));
        }
        if rows.is_empty() {
            return Err(PipelineError::training("Cannot grow a tree on zero rows"));
        }

        let root = stats_of(&rows, gradients, hessians);
        let mut tree = Tree::new(self.shrunk_output(&root), root.count);

        let mut queue = VecDeque::new();
        queue.push_back(PendingNode {
            index: 0,
            rows,
            depth: 0,
        });

        while let Some(node) = queue.pop_front() {
            if node.depth >= self.config.max_depth
                || node.rows.len() < 2 * self.config.criteria.min_data_in_leaf.max(1)
            {
                continue;
            }

            let histograms = build_histograms(self.binned, features, &node.rows, gradients, hessians);
            let Some(split) = best_split(&histograms, self.binned, &self.config.criteria) else {
                continue;
            };

            let (left, right) = tree.split_leaf(
                node.index,
                &split,
                self.shrunk_output(&split.left),
                self.shrunk_output(&split.right),
            )?;
            let (left_rows, right_rows) = self.partition(&node.rows, &split);

            queue.push_back(PendingNode {
                index: left,
                rows: left_rows,
                depth: node.depth + 1,
            });
            queue.push_back(PendingNode {
                index: right,
                rows: right_rows,
                depth: node.depth + 1,
            });
        }

        Ok(tree)
    }

    fn shrunk_output(&self, stats: &NodeStats) -> Score {
        stats.leaf_output(self.config.criteria.lambda_l2) * self.config.learning_rate
    }

    /// Route rows by bin, sending the missing bin to the learned side.
    fn partition(&self, rows: &[usize], split: &SplitInfo) -> (Vec<usize>, Vec<usize>) {
        let missing_bin = self.binned.mapper(split.feature).missing_bin();

        rows.iter().copied().partition(|&row| {
            let bin = self.binned.bin(row, split.feature);
            if bin == missing_bin {
                split.default_left
            } else {
                bin <= split.threshold_bin
            }
        })
    }
}

fn stats_of(rows: &[usize], gradients: &[Score], hessians: &[Score]) -> NodeStats {
    let mut stats = NodeStats::default();
    for &row in rows {
        stats.add(gradients[row], hessians[row]);
    }
    stats
}
