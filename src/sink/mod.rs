//! Durable table stores receiving scored chunks.

pub mod sqlite;

pub use crate::core::traits::{ChunkSink, SinkFactory};
pub use sqlite::{SqlType, SqliteSink, SqliteSinkFactory};
