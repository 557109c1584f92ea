//! The set of distinct entities a bootstrap draws from.

use crate::core::error::{PipelineError, Result};
use crate::core::traits::TabularSource;
use crate::core::types::EntityId;
use std::collections::BTreeSet;

/// Distinct entity identifiers of a training dataset, in sorted order.
///
/// Computed once before any sampling and read-only afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Population {
    entities: Vec<EntityId>,
}

impl Population {
    /// Collect the distinct values of `entity_column`.
    pub fn from_source<S: TabularSource>(source: &S, entity_column: &str) -> Result<Self> {
        let population = Self::new(source.distinct_values(entity_column)?)?;
        log::info!(
            "Population of {} distinct '{}' values",
            population.len(),
            entity_column
        );
        Ok(population)
    }

    /// Build a population from identifiers; duplicates collapse.
    pub fn new<I>(entities: I) -> Result<Self>
    where
        I: IntoIterator,
        I::Item: Into<EntityId>,
    {
        let distinct: BTreeSet<EntityId> = entities.into_iter().map(Into::into).collect();
        if distinct.is_empty() {
            return Err(PipelineError::EmptyPopulation);
        }
        Ok(Population {
            entities: distinct.into_iter().collect(),
        })
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Always false: an empty population cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Entity at position `index` in sorted order.
    pub fn get(&self, index: usize) -> Option<&EntityId> {
        self.entities.get(index)
    }

    pub fn contains(&self, entity: &str) -> bool {
        self.entities
            .binary_search_by(|e| e.as_str().cmp(entity))
            .is_ok()
    }

    pub fn iter(&self) -> impl Iterator<Item = &EntityId> {
        self.entities.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::source::PolarsSource;
    use polars::prelude::*;

    #[test]
    fn test_new_dedupes_and_sorts() {
        let population = Population::new(["C", "A", "B", "A"]).unwrap();
        assert_eq!(population.len(), 3);
        assert_eq!(population.get(0).map(String::as_str), Some("A"));
        assert!(population.contains("B"));
        assert!(!population.contains("Z"));
    }

    #[test]
    fn test_empty_population() {
        let empty: Vec<String> = Vec::new();
        assert!(matches!(
            Population::new(empty),
            Err(PipelineError::EmptyPopulation)
        ));

        let df = df!["id" => Vec::<String>::new()].unwrap();
        let source = PolarsSource::from_frame(df);
        assert!(matches!(
            Population::from_source(&source, "id"),
            Err(PipelineError::EmptyPopulation)
        ));
    }

    #[test]
    fn test_from_source() {
        let df = df!["id" => ["A", "A", "B"], "x" => [1, 2, 3]].unwrap();
        let population = Population::from_source(&PolarsSource::from_frame(df), "id").unwrap();
        assert_eq!(population.len(), 2);
    }
}
