use thiserror::Error;

/// Failures of the image → embedding path.
///
/// "No face in the image" is not an error here: extractors report it as
/// `Ok(None)` so callers can treat it as a rejection of the input rather than
/// a fault of the pipeline.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("invalid image: {0}")]
    InvalidImage(#[from] image::ImageError),

    #[error("inference failed: {0:#}")]
    Inference(anyhow::Error),
}

impl From<anyhow::Error> for ExtractError {
    fn from(err: anyhow::Error) -> Self {
        ExtractError::Inference(err)
    }
}
