use rollcall::{
    gallery::GalleryRecord,
    matcher::{find_best_match, MatchOutcome, SkippedRecord, DEFAULT_THRESHOLD},
    metric::{cosine_distance, DimensionMismatch, DEGENERATE_DISTANCE},
    Embedding,
};

fn record(id: u64, v: Vec<f32>) -> GalleryRecord {
    GalleryRecord {
        identity_id: id,
        display_name: format!("user-{id}"),
        age: 30,
        embedding: Embedding::from(v),
    }
}

/// Unit vector at `distance` (cosine) from the x axis.
fn at_distance(distance: f32) -> Vec<f32> {
    let cos = 1.0 - distance;
    vec![cos, (1.0 - cos * cos).sqrt()]
}

fn query() -> Embedding {
    Embedding::from(vec![1.0, 0.0])
}

fn tie_gallery() -> Vec<GalleryRecord> {
    vec![
        record(1, at_distance(0.5)),
        record(2, at_distance(0.3)),
        record(3, at_distance(0.3)),
    ]
}

#[test]
fn distance_to_self_is_zero() {
    let samples = [
        vec![0.1, 0.2, 0.3, 0.4],
        vec![-5.0, 3.0, 0.001, 2.5],
        vec![1e-3, -1e-3, 2e-3, 0.0],
    ];
    for v in samples {
        let a = Embedding::from(v);
        assert!(cosine_distance(&a, &a).unwrap().abs() < 1e-6);
    }
}

#[test]
fn distance_is_symmetric() {
    let a = Embedding::from(vec![0.3, -0.7, 0.2, 0.9]);
    let b = Embedding::from(vec![-0.1, 0.4, 0.8, 0.05]);
    assert_eq!(cosine_distance(&a, &b), cosine_distance(&b, &a));
}

#[test]
fn zero_norm_gives_exact_ceiling() {
    let zero = Embedding::from(vec![0.0; 128]);
    let a = Embedding::from(vec![0.5; 128]);
    assert_eq!(cosine_distance(&zero, &a).unwrap(), 1.0);
    assert_eq!(cosine_distance(&a, &zero).unwrap(), DEGENERATE_DISTANCE);
}

#[test]
fn earliest_of_tied_records_wins() {
    let report = find_best_match(&query(), &tie_gallery(), 0.4);
    let m = report.outcome.matched().expect("match");
    assert_eq!(m.identity_id, 2);
    assert!((m.distance - 0.3).abs() < 1e-5);
    assert_eq!(m.confidence(), "70.00%");
}

#[test]
fn nothing_under_threshold_is_no_match() {
    let report = find_best_match(&query(), &tie_gallery(), 0.2);
    assert_eq!(report.outcome, MatchOutcome::NoMatch);
    assert!(report.skipped.is_empty());
}

#[test]
fn empty_gallery_is_no_match() {
    for threshold in [0.0, DEFAULT_THRESHOLD, 1.0, 2.5] {
        assert_eq!(
            find_best_match(&query(), &[], threshold).outcome,
            MatchOutcome::NoMatch
        );
    }
}

#[test]
fn gallery_order_is_respected() {
    let mut gallery = tie_gallery();
    gallery.reverse();
    let report = find_best_match(&query(), &gallery, 0.4);
    assert_eq!(report.outcome.matched().unwrap().identity_id, 3);
}

#[test]
fn mismatched_record_is_skipped_and_reported() {
    let gallery = vec![
        record(1, vec![1.0, 0.0, 0.0]),
        record(2, at_distance(0.1)),
        record(3, vec![1.0]),
    ];
    let report = find_best_match(&query(), &gallery, DEFAULT_THRESHOLD);

    assert_eq!(report.outcome.matched().unwrap().identity_id, 2);
    assert_eq!(
        report.skipped,
        vec![
            SkippedRecord {
                identity_id: 1,
                mismatch: DimensionMismatch {
                    expected: 3,
                    found: 2
                },
            },
            SkippedRecord {
                identity_id: 3,
                mismatch: DimensionMismatch {
                    expected: 1,
                    found: 2
                },
            },
        ]
    );
}

#[test]
fn only_mismatched_records_is_no_match() {
    let gallery = vec![record(1, vec![1.0, 0.0, 0.0])];
    let report = find_best_match(&query(), &gallery, 2.0);
    assert_eq!(report.outcome, MatchOutcome::NoMatch);
    assert_eq!(report.skipped.len(), 1);
}

#[test]
fn gallery_is_not_modified() {
    let gallery = tie_gallery();
    let before = gallery.clone();
    let _ = find_best_match(&query(), &gallery, 0.4);
    assert_eq!(gallery, before);
}
