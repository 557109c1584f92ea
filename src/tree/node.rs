//! Tree node representation.
//!
//! A node is either a leaf carrying its (already shrunk) output, or an
//! internal split routing rows by a raw-value threshold with a learned
//! direction for missing values.

use crate::core::types::{FeatureIndex, FeatureValue, NodeIndex, Score};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Gradient statistics accumulated over a set of rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStats {
    /// Sum of first order gradients
    pub sum_gradients: f64,
    /// Sum of second order gradients
    pub sum_hessians: f64,
    /// Number of rows
    pub count: usize,
}

impl NodeStats {
    pub fn new(sum_gradients: f64, sum_hessians: f64, count: usize) -> Self {
        NodeStats {
            sum_gradients,
            sum_hessians,
            count,
        }
    }

    /// Add one row's gradient pair.
    #[inline]
    pub fn add(&mut self, gradient: f64, hessian: f64) {
        self.sum_gradients += gradient;
        self.sum_hessians += hessian;
        self.count += 1;
    }

    /// Component-wise difference.
    pub fn minus(&self, other: &NodeStats) -> NodeStats {
        NodeStats {
            sum_gradients: self.sum_gradients - other.sum_gradients,
            sum_hessians: self.sum_hessians - other.sum_hessians,
            count: self.count.saturating_sub(other.count),
        }
    }

    /// Component-wise sum.
    pub fn plus(&self, other: &NodeStats) -> NodeStats {
        NodeStats {
            sum_gradients: self.sum_gradients + other.sum_gradients,
            sum_hessians: self.sum_hessians + other.sum_hessians,
            count: self.count + other.count,
        }
    }

    /// Optimal leaf weight `-G / (H + lambda_l2)`.
    pub fn leaf_output(&self, lambda_l2: f64) -> Score {
        let denominator = self.sum_hessians + lambda_l2;
        if denominator <= 0.0 {
            return 0.0;
        }
        -self.sum_gradients / denominator
    }

    /// Structure score `G^2 / (2 (H + lambda_l2))`.
    pub fn gain(&self, lambda_l2: f64) -> f64 {
        let denominator = self.sum_hessians + lambda_l2;
        if denominator <= 0.0 {
            return 0.0;
        }
        self.sum_gradients * self.sum_gradients / (2.0 * denominator)
    }
}

/// A node of a [`Tree`](crate::tree::Tree).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    /// Terminal node
    Leaf {
        /// Raw score contribution, shrinkage already applied
        value: Score,
        /// Training rows that reached this leaf
        count: usize,
        /// Depth of the node (root is 0)
        depth: usize,
    },
    /// Internal node
    Split {
        /// Feature column tested
        feature: FeatureIndex,
        /// Rows with `value <= threshold` go left
        threshold: FeatureValue,
        /// Direction taken by NaN
        default_left: bool,
        /// Left child index
        left: NodeIndex,
        /// Right child index
        right: NodeIndex,
        /// Loss reduction achieved by the split
        gain: f64,
        /// Depth of the node (root is 0)
        depth: usize,
    },
}

impl TreeNode {
    /// Creates a leaf node.
    pub fn leaf(value: Score, count: usize, depth: usize) -> Self {
        TreeNode::Leaf {
            value,
            count,
            depth,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, TreeNode::Leaf { .. })
    }

    pub fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { depth, .. } | TreeNode::Split { depth, .. } => *depth,
        }
    }

    /// Leaf output, `None` for internal nodes.
    pub fn leaf_value(&self) -> Option<Score> {
        match self {
            TreeNode::Leaf { value, .. } => Some(*value),
            TreeNode::Split { .. } => None,
        }
    }

    /// Child index a raw feature row is routed to, `None` for leaves.
    #[inline]
    pub fn route(&self, value: FeatureValue) -> Option<NodeIndex> {
        match self {
            TreeNode::Leaf { .. } => None,
            TreeNode::Split {
                threshold,
                default_left,
                left,
                right,
                ..
            } => {
                let go_left = if value.is_nan() {
                    *default_left
                } else {
                    value <= *threshold
                };
                Some(if go_left { *left } else { *right })
            }
        }
    }
}

impl fmt::Display for TreeNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TreeNode::Leaf { value, count, .. } => {
                write!(f, "Leaf(value={:.4}, count={})", value, count)
            }
            TreeNode::Split {
                feature,
                threshold,
                default_left,
                gain,
                ..
            } => write!(
                f,
                "Split(feature={}, threshold={:.4}, default_left={}, gain={:.4})",
                feature, threshold, default_left, gain
            ),
        }
    }
}
