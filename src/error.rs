use rollcall_vision::ExtractError;
use thiserror::Error;

use crate::metric::DimensionMismatch;

/// Rejections and faults surfaced to the caller of the service.
///
/// Not finding a match is not an error; see
/// [`MatchOutcome::NoMatch`](crate::matcher::MatchOutcome::NoMatch).
#[derive(Debug, Error)]
pub enum Error {
    /// The image could not be read or decoded.
    #[error("invalid image: {0}")]
    InvalidInput(String),

    #[error("no face detected")]
    NoFaceDetected,

    #[error(transparent)]
    DimensionMismatch(#[from] DimensionMismatch),

    #[error("face extraction failed: {0:#}")]
    Extraction(anyhow::Error),

    /// Store failure, passed through as-is.
    #[error("persistence failure: {0:#}")]
    Persistence(anyhow::Error),
}

impl From<ExtractError> for Error {
    fn from(err: ExtractError) -> Self {
        match err {
            ExtractError::InvalidImage(e) => Error::InvalidInput(e.to_string()),
            ExtractError::Inference(e) => Error::Extraction(e),
        }
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
