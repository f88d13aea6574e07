use ndarray::{Array1, ArrayView1};
use serde::{Deserialize, Serialize};

/// Face embedding produced by the recognizer.
///
/// The dimension is whatever the recognizer emits (128 for SFace). Nothing in
/// this type enforces a particular length; comparing embeddings of different
/// lengths is rejected by the metric.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Embedding {
    vector: Array1<f32>,
}

impl Embedding {
    pub fn new(vector: Array1<f32>) -> Self {
        Self { vector }
    }

    pub fn dim(&self) -> usize {
        self.vector.len()
    }

    pub fn view(&self) -> ArrayView1<'_, f32> {
        self.vector.view()
    }

    pub fn to_vec(&self) -> Vec<f32> {
        self.vector.to_vec()
    }

    /// Euclidean norm, accumulated in f64.
    pub fn norm(&self) -> f64 {
        self.vector
            .iter()
            .map(|&x| f64::from(x) * f64::from(x))
            .sum::<f64>()
            .sqrt()
    }

    /// L2-normalized copy. A zero vector is returned unchanged.
    pub fn normalized(&self) -> Self {
        let norm = self.norm();
        if norm > 0.0 {
            Self::new(self.vector.mapv(|x| (f64::from(x) / norm) as f32))
        } else {
            self.clone()
        }
    }
}

impl From<Vec<f32>> for Embedding {
    fn from(values: Vec<f32>) -> Self {
        Self::new(Array1::from_vec(values))
    }
}
