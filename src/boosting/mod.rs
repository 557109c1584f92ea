//! Gradient boosting of binary classifiers.

pub mod gbdt;
pub mod objective;

pub use gbdt::GradientBoostedClassifier;
pub use objective::{sigmoid, BinaryLogloss};
