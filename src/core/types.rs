//! Core data types for the delinquency ensemble pipeline.
//!
//! Type aliases pin down the numeric representation used throughout the
//! crate, and the policy enumerations are shared by configuration, training,
//! and the scoring driver.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a resampling unit (a loan sequence number).
///
/// Identifiers are compared as text regardless of the source column's dtype.
pub type EntityId = String;

/// Feature value type. 32-bit float, NaN marks a missing value.
pub type FeatureValue = f32;

/// Target value type. Binary labels are stored as 0.0 / 1.0.
pub type Label = f32;

/// Raw additive model output and gradient statistics.
pub type Score = f64;

/// Calibrated positive-class probability in [0, 1].
pub type Probability = f64;

/// Feature index type for identifying features in a frame.
pub type FeatureIndex = usize;

/// Bin index type for discretized feature values.
pub type BinIndex = u16;

/// Tree node identifier type.
pub type NodeIndex = usize;

/// What the trainer does when a bootstrap sample lacks one of the two classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Fail the round (and the training run) immediately
    Fail,
    /// Draw a fresh sample for the same round, up to `max_attempts` draws in total
    Resample {
        /// Total number of draws allowed for one round
        max_attempts: usize,
    },
}

impl Default for DegeneratePolicy {
    fn default() -> Self {
        DegeneratePolicy::Resample { max_attempts: 5 }
    }
}

impl DegeneratePolicy {
    /// Number of sampling attempts a round is allowed.
    pub fn max_attempts(&self) -> usize {
        match self {
            DegeneratePolicy::Fail => 1,
            DegeneratePolicy::Resample { max_attempts } => (*max_attempts).max(1),
        }
    }
}

impl fmt::Display for DegeneratePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegeneratePolicy::Fail => write!(f, "fail"),
            DegeneratePolicy::Resample { max_attempts } => {
                write!(f, "resample(max_attempts={})", max_attempts)
            }
        }
    }
}

/// How a scoring run treats an existing sink table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteMode {
    /// Append to whatever the table already holds
    Append,
    /// Drop the table once before the first chunk of the run
    Replace,
}

impl Default for WriteMode {
    fn default() -> Self {
        WriteMode::Append
    }
}

impl fmt::Display for WriteMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteMode::Append => write!(f, "append"),
            WriteMode::Replace => write!(f, "replace"),
        }
    }
}

/// How concurrent chunk workers reach the target store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteConcurrency {
    /// Every worker opens its own store session
    PerWorker,
    /// All workers share one session, one append at a time
    Serialized,
}

impl Default for WriteConcurrency {
    fn default() -> Self {
        WriteConcurrency::PerWorker
    }
}

impl fmt::Display for WriteConcurrency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteConcurrency::PerWorker => write!(f, "per_worker"),
            WriteConcurrency::Serialized => write!(f, "serialized"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_attempts() {
        assert_eq!(DegeneratePolicy::Fail.max_attempts(), 1);
        assert_eq!(DegeneratePolicy::default().max_attempts(), 5);
        assert_eq!(DegeneratePolicy::Resample { max_attempts: 0 }.max_attempts(), 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(WriteMode::Replace.to_string(), "replace");
        assert_eq!(WriteConcurrency::default().to_string(), "per_worker");
        assert_eq!(
            DegeneratePolicy::Resample { max_attempts: 3 }.to_string(),
            "resample(max_attempts=3)"
        );
    }

    #[test]
    fn test_policy_serde() {
        let json = serde_json::to_string(&DegeneratePolicy::default()).unwrap();
        let back: DegeneratePolicy = serde_json::from_str(&json).unwrap();
        assert_eq!(back, DegeneratePolicy::default());
    }
}
