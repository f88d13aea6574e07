use std::fmt;

use serde::Serialize;

use crate::{
    gallery::{GalleryRecord, IdentityId},
    metric::{cosine_distance, DimensionMismatch},
    Embedding,
};

/// Maximum cosine distance accepted as a match unless configured otherwise.
pub const DEFAULT_THRESHOLD: f32 = 0.4;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub identity_id: IdentityId,
    pub display_name: String,
    pub age: u32,
    pub distance: f32,
    pub confidence_percent: f32,
}

impl MatchResult {
    /// Confidence rendered with two decimals, e.g. `"87.50%"`.
    pub fn confidence(&self) -> String {
        format!("{:.2}%", self.confidence_percent)
    }
}

impl fmt::Display for MatchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (id {}, age {}) confidence {}",
            self.display_name,
            self.identity_id,
            self.age,
            self.confidence()
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MatchOutcome {
    Matched(MatchResult),
    NoMatch,
}

impl MatchOutcome {
    pub fn matched(&self) -> Option<&MatchResult> {
        match self {
            MatchOutcome::Matched(m) => Some(m),
            MatchOutcome::NoMatch => None,
        }
    }
}

/// A gallery record left out of the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SkippedRecord {
    pub identity_id: IdentityId,
    pub mismatch: DimensionMismatch,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MatchReport {
    pub outcome: MatchOutcome,
    /// Records whose embedding dimension differs from the query's.
    pub skipped: Vec<SkippedRecord>,
}

/// Linear scan for the closest record under `threshold`.
///
/// A record replaces the current best only if it is strictly below the
/// threshold and strictly closer, so the earliest of equally close records
/// wins. Records whose dimension disagrees with the query are reported in
/// [`MatchReport::skipped`] and the scan carries on with the rest.
pub fn find_best_match(query: &Embedding, gallery: &[GalleryRecord], threshold: f32) -> MatchReport {
    let mut best: Option<(&GalleryRecord, f32)> = None;
    let mut skipped = Vec::new();

    for record in gallery {
        let distance = match cosine_distance(&record.embedding, query) {
            Ok(d) => d,
            Err(mismatch) => {
                skipped.push(SkippedRecord {
                    identity_id: record.identity_id,
                    mismatch,
                });
                continue;
            }
        };
        log::trace!(
            "distance to {} ({}): {distance}",
            record.display_name,
            record.identity_id
        );

        let best_distance = best.map_or(f32::INFINITY, |(_, d)| d);
        if distance < threshold && distance < best_distance {
            best = Some((record, distance));
        }
    }

    let outcome = match best {
        Some((record, distance)) => MatchOutcome::Matched(MatchResult {
            identity_id: record.identity_id,
            display_name: record.display_name.clone(),
            age: record.age,
            distance,
            confidence_percent: (1.0 - distance) * 100.0,
        }),
        None => MatchOutcome::NoMatch,
    };
    MatchReport { outcome, skipped }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: IdentityId, v: Vec<f32>) -> GalleryRecord {
        GalleryRecord {
            identity_id: id,
            display_name: format!("user-{id}"),
            age: 20,
            embedding: Embedding::from(v),
        }
    }

    #[test]
    fn exact_match_has_full_confidence() {
        let gallery = vec![record(1, vec![0.0, 1.0]), record(2, vec![1.0, 0.0])];
        let query = Embedding::from(vec![2.0, 0.0]);
        let report = find_best_match(&query, &gallery, DEFAULT_THRESHOLD);
        let m = report.outcome.matched().unwrap();
        assert_eq!(m.identity_id, 2);
        assert!(m.distance < 1e-6);
        assert_eq!(m.confidence(), "100.00%");
        assert!(report.skipped.is_empty());
    }

    #[test]
    fn closer_later_record_replaces_earlier() {
        let gallery = vec![record(1, vec![1.0, 0.3]), record(2, vec![1.0, 0.05])];
        let query = Embedding::from(vec![1.0, 0.0]);
        let report = find_best_match(&query, &gallery, DEFAULT_THRESHOLD);
        assert_eq!(report.outcome.matched().unwrap().identity_id, 2);
    }

    #[test]
    fn distance_equal_to_threshold_is_rejected() {
        let gallery = vec![record(1, vec![0.0, 1.0])];
        let query = Embedding::from(vec![1.0, 0.0]);
        // orthogonal: distance exactly 1.0
        let report = find_best_match(&query, &gallery, 1.0);
        assert_eq!(report.outcome, MatchOutcome::NoMatch);
    }

    #[test]
    fn degenerate_record_never_matches() {
        let gallery = vec![record(1, vec![0.0, 0.0])];
        let query = Embedding::from(vec![1.0, 0.0]);
        assert_eq!(
            find_best_match(&query, &gallery, 1.0).outcome,
            MatchOutcome::NoMatch
        );
    }

    #[test]
    fn nan_record_never_matches() {
        let gallery = vec![record(1, vec![f32::NAN, 1.0])];
        let query = Embedding::from(vec![1.0, 1.0]);
        assert_eq!(
            find_best_match(&query, &gallery, 2.0).outcome,
            MatchOutcome::NoMatch
        );
    }

    #[test]
    fn display_mentions_name_and_confidence() {
        let m = MatchResult {
            identity_id: 7,
            display_name: "Grace".into(),
            age: 40,
            distance: 0.125,
            confidence_percent: 87.5,
        };
        assert_eq!(m.to_string(), "Grace (id 7, age 40) confidence 87.50%");
    }
}
