//! Bounded worker pools for training rounds and scoring chunks.

use crate::core::error::{PipelineError, Result};
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Resolve a worker count where 0 means all available cores.
pub fn effective_threads(requested: usize) -> usize {
    if requested == 0 {
        num_cpus::get()
    } else {
        requested
    }
}

/// Build a dedicated rayon pool with `requested` workers (0 = all cores).
pub fn build_pool(requested: usize, name: &'static str) -> Result<ThreadPool> {
    ThreadPoolBuilder::new()
        .num_threads(effective_threads(requested))
        .thread_name(move |i| format!("{}-{}", name, i))
        .build()
        .map_err(|e| PipelineError::internal(format!("Failed to create thread pool: {}", e)))
}
