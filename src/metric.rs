use ndarray::Zip;
use thiserror::Error;

use crate::Embedding;

/// Distance reported when either embedding has zero norm.
///
/// This is the historical ceiling the 0.4 threshold was tuned against, not
/// the true maximum of cosine distance (2.0).
pub const DEGENERATE_DISTANCE: f32 = 1.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("embedding dimension mismatch: expected {expected}, found {found}")]
pub struct DimensionMismatch {
    pub expected: usize,
    pub found: usize,
}

/// Cosine distance `1 - (a·b)/(‖a‖·‖b‖)`, in `[0, 2]`.
///
/// Sums run in f64. A zero-norm input yields [`DEGENERATE_DISTANCE`] so an
/// empty or blank embedding can never beat a real one.
pub fn cosine_distance(a: &Embedding, b: &Embedding) -> Result<f32, DimensionMismatch> {
    if a.dim() != b.dim() {
        return Err(DimensionMismatch {
            expected: a.dim(),
            found: b.dim(),
        });
    }

    let (dot, norm_a, norm_b) = Zip::from(a.view()).and(b.view()).fold(
        (0.0f64, 0.0f64, 0.0f64),
        |(dot, na, nb), &x, &y| {
            let (x, y) = (f64::from(x), f64::from(y));
            (dot + x * y, na + x * x, nb + y * y)
        },
    );

    if norm_a == 0.0 || norm_b == 0.0 {
        return Ok(DEGENERATE_DISTANCE);
    }

    let similarity = dot / (norm_a.sqrt() * norm_b.sqrt());
    Ok((1.0 - similarity).clamp(0.0, 2.0) as f32)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn e(v: &[f32]) -> Embedding {
        Embedding::from(v.to_vec())
    }

    #[test]
    fn identical_is_zero() {
        let a = e(&[0.3, -1.2, 4.0, 0.01]);
        assert!(cosine_distance(&a, &a).unwrap() < 1e-6);
    }

    #[test]
    fn orthogonal_and_opposite() {
        let x = e(&[1.0, 0.0]);
        let y = e(&[0.0, 2.0]);
        let neg = e(&[-3.0, 0.0]);
        assert!((cosine_distance(&x, &y).unwrap() - 1.0).abs() < 1e-6);
        assert!((cosine_distance(&x, &neg).unwrap() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn scale_invariant() {
        let a = e(&[1.0, 2.0, 3.0]);
        let b = e(&[10.0, 20.0, 30.0]);
        assert!(cosine_distance(&a, &b).unwrap() < 1e-6);
    }

    #[test]
    fn zero_norm_is_degenerate_ceiling() {
        let zero = e(&[0.0, 0.0, 0.0]);
        let a = e(&[1.0, 2.0, 3.0]);
        assert_eq!(cosine_distance(&zero, &a), Ok(DEGENERATE_DISTANCE));
        assert_eq!(cosine_distance(&a, &zero), Ok(DEGENERATE_DISTANCE));
        assert_eq!(cosine_distance(&zero, &zero), Ok(1.0));
        assert_eq!(cosine_distance(&e(&[]), &e(&[])), Ok(1.0));
    }

    #[test]
    fn mismatched_dimensions_are_rejected() {
        let err = cosine_distance(&e(&[1.0, 0.0]), &e(&[1.0, 0.0, 0.0])).unwrap_err();
        assert_eq!(
            err,
            DimensionMismatch {
                expected: 2,
                found: 3
            }
        );
    }
}
