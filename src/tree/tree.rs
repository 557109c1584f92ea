//! Regression tree fitted to gradient statistics.
//!
//! Nodes live in a contiguous vector with the root at index 0. Leaf values
//! already include the learning-rate shrinkage, so a tree's prediction is
//! added to the running raw score as is.

use crate::core::error::{PipelineError, Result};
use crate::core::types::{FeatureValue, NodeIndex, Score};
use crate::tree::node::TreeNode;
use crate::tree::split::SplitInfo;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One boosted regression tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tree {
    nodes: Vec<TreeNode>,
    num_leaves: usize,
    max_depth: usize,
}

impl Tree {
    /// A tree consisting of a single leaf.
    pub fn new(root_value: Score, root_count: usize) -> Self {
        Tree {
            nodes: vec![TreeNode::leaf(root_value, root_count, 0)],
            num_leaves: 1,
            max_depth: 0,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    pub fn num_leaves(&self) -> usize {
        self.num_leaves
    }

    /// Depth of the deepest leaf.
    pub fn depth(&self) -> usize {
        self.max_depth
    }

    pub fn node(&self, index: NodeIndex) -> Option<&TreeNode> {
        self.nodes.get(index)
    }

    /// Raw score contribution of one feature row.
    pub fn predict_row(&self, row: ArrayView1<'_, FeatureValue>) -> Score {
        let mut index = 0;
        loop {
            let node = &self.nodes[index];
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split { feature, .. } => {
                    let value = row.get(*feature).copied().unwrap_or(FeatureValue::NAN);
                    match node.route(value) {
                        Some(next) => index = next,
                        None => return 0.0,
                    }
                }
            }
        }
    }

    /// Replace leaf `index` by `split`, creating two leaves with the given
    /// (already shrunk) values. Returns the child indices.
    pub fn split_leaf(
        &mut self,
        index: NodeIndex,
        split: &SplitInfo,
        left_value: Score,
        right_value: Score,
    ) -> Result<(NodeIndex, NodeIndex)> {
        let depth = match self.nodes.get(index) {
            Some(TreeNode::Leaf { depth, .. }) => *depth,
            Some(TreeNode::Split { .. }) => {
                return Err(PipelineError::training(format!(
                    "Cannot split internal node {}",
                    index
                )))
            }
            None => {
                return Err(PipelineError::training(format!(
                    "Node index {} out of bounds",
                    index
                )))
            }
        };

        let left = self.nodes.len();
        let right = left + 1;
        self.nodes
            .push(TreeNode::leaf(left_value, split.left.count, depth + 1));
        self.nodes
            .push(TreeNode::leaf(right_value, split.right.count, depth + 1));

        self.nodes[index] = TreeNode::Split {
            feature: split.feature,
            threshold: split.threshold,
            default_left: split.default_left,
            left,
            right,
            gain: split.gain,
            depth,
        };

        self.num_leaves += 1;
        self.max_depth = self.max_depth.max(depth + 1);
        Ok((left, right))
    }

    /// Check that every internal node points at two existing, deeper nodes
    /// and that the leaf count is consistent.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(PipelineError::training("Tree has no nodes"));
        }

        let mut leaves = 0;
        for (i, node) in self.nodes.iter().enumerate() {
            match node {
                TreeNode::Leaf { .. } => leaves += 1,
                TreeNode::Split {
                    left, right, depth, ..
                } => {
                    for &child in &[*left, *right] {
                        let child_depth = self
                            .nodes
                            .get(child)
                            .map(TreeNode::depth)
                            .ok_or_else(|| {
                                PipelineError::training(format!(
                                    "Node {} has invalid child {}",
                                    i, child
                                ))
                            })?;
                        if child_depth != depth + 1 {
                            return Err(PipelineError::training(format!(
                                "Node {} child {} has depth {}",
                                i, child, child_depth
                            )));
                        }
                    }
                }
            }
        }

        if leaves != self.num_leaves {
            return Err(PipelineError::training(format!(
                "Leaf count mismatch: expected {}, found {}",
                self.num_leaves, leaves
            )));
        }

        Ok(())
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Tree(nodes={}, leaves={}, depth={})",
            self.num_nodes(),
            self.num_leaves(),
            self.depth()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::node::NodeStats;
    use ndarray::array;

    fn stump() -> Tree {
        let mut tree = Tree::new(0.0, 10);
        let split = SplitInfo {
            feature: 1,
            threshold_bin: 0,
            threshold: 5.0,
            default_left: false,
            gain: 2.0,
            left: NodeStats::new(-3.0, 2.0, 4),
            right: NodeStats::new(3.0, 2.0, 6),
        };
        tree.split_leaf(0, &split, 0.7, -0.3).unwrap();
        tree
    }

    #[test]
    fn test_single_leaf() {
        let tree = Tree::new(0.25, 3);
        assert_eq!(tree.predict_row(array![1.0f32, 2.0].view()), 0.25);
        assert_eq!(tree.num_leaves(), 1);
        assert!(tree.validate().is_ok());
    }

    #[test]
    fn test_split_and_predict() {
        let tree = stump();

        assert_eq!(tree.num_nodes(), 3);
        assert_eq!(tree.num_leaves(), 2);
        assert_eq!(tree.depth(), 1);
        assert!(tree.validate().is_ok());

        assert_eq!(tree.predict_row(array![0.0f32, 5.0].view()), 0.7);
        assert_eq!(tree.predict_row(array![0.0f32, 6.0].view()), -0.3);
        assert_eq!(tree.predict_row(array![0.0f32, f32::NAN].view()), -0.3);
    }

    #[test]
    fn test_cannot_split_internal_node() {
        let mut tree = stump();
        let split = SplitInfo {
            feature: 0,
            threshold_bin: 0,
            threshold: 1.0,
            default_left: true,
            gain: 1.0,
            left: NodeStats::default(),
            right: NodeStats::default(),
        };
        assert!(tree.split_leaf(0, &split, 0.0, 0.0).is_err());
        assert!(tree.split_leaf(7, &split, 0.0, 0.0).is_err());
        assert!(tree.split_leaf(1, &split, 0.0, 0.0).is_ok());
        assert_eq!(tree.depth(), 2);
    }

    #[test]
    fn test_serde_round_trip() {
        let tree = stump();
        let json = serde_json::to_string(&tree).unwrap();
        let restored: Tree = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, tree);
    }
}
