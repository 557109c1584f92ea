//! Fixed-size ensemble of fitted classifiers.

use crate::boosting::gbdt::GradientBoostedClassifier;
use crate::core::error::{PipelineError, Result};
use crate::core::traits::{Persistable, ProbabilisticClassifier};
use serde::{Deserialize, Serialize};

/// Ordered, immutable collection of ensemble members.
///
/// Only complete ensembles are constructed; members keep the round order
/// they were trained in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ensemble {
    members: Vec<GradientBoostedClassifier>,
    feature_names: Vec<String>,
}

impl Ensemble {
    /// Wrap trained members. All members must share one feature layout.
    pub fn new(members: Vec<GradientBoostedClassifier>) -> Result<Self> {
        let first = members
            .first()
            .ok_or_else(|| PipelineError::training("An ensemble needs at least one member"))?;
        let feature_names = first.feature_names().to_vec();

        if let Some((i, _)) = members
            .iter()
            .enumerate()
            .find(|(_, m)| m.feature_names() != feature_names.as_slice())
        {
            return Err(PipelineError::training(format!(
                "Ensemble member {} was fitted on different features",
                i
            )));
        }

        Ok(Ensemble {
            members,
            feature_names,
        })
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Members in training round order.
    pub fn members(&self) -> &[GradientBoostedClassifier] {
        &self.members
    }

    /// Iterate members as classifiers.
    pub fn classifiers(&self) -> impl Iterator<Item = &dyn ProbabilisticClassifier> {
        self.members.iter().map(|m| m as &dyn ProbabilisticClassifier)
    }

    /// Feature columns every member expects, in order.
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }
}

impl Persistable for Ensemble {}
