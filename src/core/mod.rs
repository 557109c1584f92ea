//! Core infrastructure module.
//!
//! - [`types`]: Fundamental type aliases and policy enumerations
//! - [`constants`]: Configuration defaults
//! - [`error`]: The pipeline error taxonomy
//! - [`random`]: The explicit, seedable random source
//! - [`threading`]: Dedicated rayon worker pools
//! - [`traits`]: Seams to the source, the store, and the classifier

pub mod constants;
pub mod error;
pub mod random;
pub mod threading;
pub mod traits;
pub mod types;

pub use constants::*;
pub use error::{PipelineError, Result};
pub use random::RandomSource;
pub use threading::{build_pool, effective_threads};
pub use traits::*;
pub use types::*;

use std::sync::Once;

static LOGGING_INIT: Once = Once::new();

/// Install the `env_logger` backend for the `log` facade.
///
/// Safe to call more than once; later calls and an already-installed logger
/// are ignored. Verbosity comes from `RUST_LOG`.
pub fn init_logging() {
    LOGGING_INIT.call_once(|| {
        let _ = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or("info"),
        )
        .format_timestamp_millis()
        .try_init();
    });
}
