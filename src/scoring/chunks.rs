//! Partitioning of a row count into bounded, disjoint ranges.

use crate::core::error::{PipelineError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A contiguous row range `[offset, offset + length)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ChunkRange {
    pub offset: usize,
    pub length: usize,
}

impl ChunkRange {
    pub fn new(offset: usize, length: usize) -> Self {
        ChunkRange { offset, length }
    }

    /// One past the last row.
    pub fn end(&self) -> usize {
        self.offset + self.length
    }
}

impl fmt::Display for ChunkRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.offset, self.length)
    }
}

/// The chunk ranges covering `[0, total_rows)`.
///
/// A plan is only an index generator; iterating it twice yields the same
/// ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkPlan {
    total_rows: usize,
    chunk_size: usize,
}

impl ChunkPlan {
    /// Plan chunks of `chunk_size` rows; the last one holds the remainder.
    pub fn new(total_rows: usize, chunk_size: usize) -> Result<Self> {
        if chunk_size == 0 {
            return Err(PipelineError::invalid_parameter(
                "chunk_size",
                "0",
                "must be at least 1",
            ));
        }
        Ok(ChunkPlan {
            total_rows,
            chunk_size,
        })
    }

    pub fn total_rows(&self) -> usize {
        self.total_rows
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.total_rows.div_ceil(self.chunk_size)
    }

    pub fn is_empty(&self) -> bool {
        self.total_rows == 0
    }

    /// Iterate the ranges in offset order.
    pub fn iter(&self) -> impl Iterator<Item = ChunkRange> + '_ {
        (0..self.total_rows)
            .step_by(self.chunk_size)
            .map(move |offset| ChunkRange::new(offset, self.chunk_size.min(self.total_rows - offset)))
    }

    /// All ranges as a vector.
    pub fn ranges(&self) -> Vec<ChunkRange> {
        self.iter().collect()
    }
}

impl IntoIterator for &ChunkPlan {
    type Item = ChunkRange;
    type IntoIter = std::vec::IntoIter<ChunkRange>;

    fn into_iter(self) -> Self::IntoIter {
        self.ranges().into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remainder_chunk() {
        let plan = ChunkPlan::new(250, 100).unwrap();
        assert_eq!(
            plan.ranges(),
            vec![
                ChunkRange::new(0, 100),
                ChunkRange::new(100, 100),
                ChunkRange::new(200, 50)
            ]
        );
        assert_eq!(plan.len(), 3);
    }

    #[test]
    fn test_exact_multiple_and_empty() {
        let plan = ChunkPlan::new(300, 100).unwrap();
        assert_eq!(plan.ranges().last(), Some(&ChunkRange::new(200, 100)));

        let empty = ChunkPlan::new(0, 100).unwrap();
        assert!(empty.is_empty());
        assert_eq!(empty.len(), 0);
        assert_eq!(empty.iter().count(), 0);
    }

    #[test]
    fn test_restartable() {
        let plan = ChunkPlan::new(17, 5).unwrap();
        let first: Vec<_> = plan.iter().collect();
        let second: Vec<_> = (&plan).into_iter().collect();
        assert_eq!(first, second);
    }

    #[test]
    fn test_zero_chunk_size() {
        assert!(matches!(
            ChunkPlan::new(10, 0),
            Err(PipelineError::InvalidParameter { .. })
        ));
    }
}
