use anyhow::{bail, Result};
use image::{imageops::FilterType, DynamicImage};
use ndarray::{Array1, Array4};
use ort::{session::Session, value::Value};

use crate::{detect::bgr_planes, embedding::Embedding};

/// SFace input side.
pub const FACE_SIZE: u32 = 112;

pub struct FaceEncoder {
    session: Session,
}

impl FaceEncoder {
    pub fn new(session: Session) -> Self {
        Self { session }
    }

    /// Encode an aligned face crop into an L2-normalized embedding.
    pub fn encode(&mut self, face: &DynamicImage) -> Result<Embedding> {
        let face = face
            .resize_exact(FACE_SIZE, FACE_SIZE, FilterType::Triangle)
            .to_rgb8();
        let side = FACE_SIZE as usize;
        let input = Array4::from_shape_vec((1, 3, side, side), bgr_planes(&face))?;

        let outputs = self.session.run(ort::inputs![Value::from_array(input)?])?;
        let (shape, data) = outputs[0].try_extract_tensor::<f32>()?;
        let dim = match shape.len() {
            2 => shape[1] as usize,
            _ => data.len(),
        };
        if dim == 0 || dim > data.len() {
            bail!("recognizer produced {} values for shape {:?}", data.len(), shape);
        }

        Ok(Embedding::new(Array1::from_vec(data[..dim].to_vec())).normalized())
    }
}
