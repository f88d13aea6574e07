use std::path::Path;

use anyhow::{Context, Result};
use image::DynamicImage;

use crate::{
    align::align_face,
    decode::decode_image,
    detect::{Detection, FaceDetector},
    embedding::Embedding,
    encode::{FaceEncoder, FACE_SIZE},
    error::ExtractError,
    model,
};

/// Turns raw image bytes into a face embedding.
///
/// `Ok(None)` means the image decoded fine but no face was found.
pub trait EmbeddingExtractor {
    fn extract_embedding(&mut self, image_bytes: &[u8]) -> Result<Option<Embedding>, ExtractError>;
}

/// Full pipeline: decode → detect → align → encode
pub struct Pipeline {
    detector: FaceDetector,
    encoder: FaceEncoder,
    score_threshold: f32,
    nms_threshold: f32,
}

impl Pipeline {
    pub fn new(
        detector_model: &Path,
        recognizer_model: &Path,
        score_threshold: f32,
        nms_threshold: f32,
    ) -> Result<Self> {
        Ok(Self {
            detector: FaceDetector::new(model::load_session(detector_model)?),
            encoder: FaceEncoder::new(model::load_session(recognizer_model)?),
            score_threshold,
            nms_threshold,
        })
    }

    /// Detect the most confident face and encode it.
    pub fn process_image(&mut self, img: &DynamicImage) -> Result<Option<(Detection, Embedding)>> {
        let detections = self
            .detector
            .detect(img, self.score_threshold, self.nms_threshold)
            .context("detecting faces")?;

        let Some(best) = detections
            .into_iter()
            .max_by(|a, b| a.score.total_cmp(&b.score))
        else {
            return Ok(None);
        };

        let face = align_face(img, &best, FACE_SIZE);
        let embedding = self.encoder.encode(&face).context("encoding face")?;
        Ok(Some((best, embedding)))
    }
}

impl EmbeddingExtractor for Pipeline {
    fn extract_embedding(&mut self, image_bytes: &[u8]) -> Result<Option<Embedding>, ExtractError> {
        let img = decode_image(image_bytes)?;
        match self.process_image(&img)? {
            Some((detection, embedding)) => {
                log::debug!(
                    "face at {:?} score {:.3}, embedding dim {}",
                    detection.bbox,
                    detection.score,
                    embedding.dim()
                );
                Ok(Some(embedding))
            }
            None => {
                log::info!("no face detected in image");
                Ok(None)
            }
        }
    }
}
