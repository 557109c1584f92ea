//! Entity-level bagging: population, sampling, training, and the ensemble.

pub mod ensemble;
pub mod population;
pub mod sampler;
pub mod trainer;

pub use ensemble::Ensemble;
pub use population::Population;
pub use sampler::{BootstrapSample, EntitySampler};
pub use trainer::BootstrapEnsembleTrainer;
