pub mod config;
pub mod error;
pub mod gallery;
pub mod matcher;
pub mod metric;
pub mod service;
pub mod storage;

pub use error::{Error, Result};

// Re-export vision types for convenience
pub use rollcall_vision::{Embedding, EmbeddingExtractor, ExtractError, Pipeline};
