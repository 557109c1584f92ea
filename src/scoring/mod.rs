//! Chunk planning and ensemble scoring.

pub mod chunks;
pub mod scorer;

pub use chunks::{ChunkPlan, ChunkRange};
pub use scorer::{project_scores, EnsembleScorer};
