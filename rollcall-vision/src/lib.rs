pub mod align;
pub mod decode;
pub mod detect;
pub mod embedding;
pub mod encode;
pub mod error;
pub mod model;
pub mod pipeline;

// Re-export commonly used types
pub use detect::Detection;
pub use embedding::Embedding;
pub use error::ExtractError;
pub use pipeline::{EmbeddingExtractor, Pipeline};
