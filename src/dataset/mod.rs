//! Dataset access: lazy sources, training frames, binning, and record loading.
//!
//! - [`source`]: the polars-backed [`TabularSource`](crate::core::traits::TabularSource)
//! - [`frame`]: feature/label extraction into ndarray matrices
//! - [`binning`]: per-feature quantile bin mappers
//! - [`schema`]: explicit name-to-type record layouts
//! - [`loader`]: the pipe-delimited record file loader

pub mod binning;
pub mod frame;
pub mod loader;
pub mod schema;
pub mod source;

pub use binning::BinMapper;
pub use frame::{feature_matrix, missing_columns, TrainingFrame};
pub use loader::{LoadedPeriod, RecordLoader};
pub use schema::{RecordLayout, RecordSchema, SemanticType};
pub use source::PolarsSource;
