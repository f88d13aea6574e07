//! Request-level operations: register a face, verify a face, list the gallery
//! and the attendance log.

use log::{debug, info, warn};
use serde::Serialize;

use crate::{
    error::{Error, Result},
    gallery::{
        AttendanceEntry, AttendanceRecorder, EnrollmentRecorder, GalleryRecord, GallerySource,
        IdentityId,
    },
    matcher::{find_best_match, MatchOutcome},
    Embedding, EmbeddingExtractor,
};

pub const DEFAULT_DISPLAY_NAME: &str = "Unknown User";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub identity_id: IdentityId,
    pub display_name: String,
    pub age: u32,
}

/// Store a new identity. Duplicates of existing faces are accepted.
pub fn enroll<R>(
    recorder: &R,
    display_name: Option<&str>,
    age: Option<u32>,
    embedding: &Embedding,
) -> Result<Registration>
where
    R: EnrollmentRecorder + ?Sized,
{
    let display_name = display_name
        .filter(|name| !name.is_empty())
        .unwrap_or(DEFAULT_DISPLAY_NAME);
    let age = age.unwrap_or(0);

    let identity_id = recorder
        .insert_record(display_name, age, embedding)
        .map_err(Error::Persistence)?;
    info!("enrolled {display_name} as {identity_id}");

    Ok(Registration {
        identity_id,
        display_name: display_name.to_string(),
        age,
    })
}

/// Match `query` against the current gallery and log attendance on a match.
pub fn verify_embedding<S>(store: &S, query: &Embedding, threshold: f32) -> Result<MatchOutcome>
where
    S: GallerySource + AttendanceRecorder + ?Sized,
{
    let gallery = store.list_all_records().map_err(Error::Persistence)?;
    debug!(
        "matching {}-d query against {} record(s), threshold {threshold}",
        query.dim(),
        gallery.len()
    );

    let report = find_best_match(query, &gallery, threshold);
    for skipped in &report.skipped {
        warn!(
            "skipped identity {}: {}",
            skipped.identity_id, skipped.mismatch
        );
    }

    if let MatchOutcome::Matched(m) = &report.outcome {
        store
            .insert_attendance(&m.display_name, m.age)
            .map_err(Error::Persistence)?;
        info!("verified {m}");
    } else {
        info!("no matching face found");
    }
    Ok(report.outcome)
}

fn extract<X>(extractor: &mut X, image_bytes: &[u8]) -> Result<Embedding>
where
    X: EmbeddingExtractor + ?Sized,
{
    extractor
        .extract_embedding(image_bytes)?
        .ok_or(Error::NoFaceDetected)
}

/// Extract a face from `image_bytes` and enroll it.
pub fn register<R, X>(
    recorder: &R,
    extractor: &mut X,
    display_name: Option<&str>,
    age: Option<u32>,
    image_bytes: &[u8],
) -> Result<Registration>
where
    R: EnrollmentRecorder + ?Sized,
    X: EmbeddingExtractor + ?Sized,
{
    let embedding = extract(extractor, image_bytes)?;
    enroll(recorder, display_name, age, &embedding)
}

/// Extract a face from `image_bytes` and verify it against the gallery.
pub fn verify<S, X>(
    store: &S,
    extractor: &mut X,
    image_bytes: &[u8],
    threshold: f32,
) -> Result<MatchOutcome>
where
    S: GallerySource + AttendanceRecorder + ?Sized,
    X: EmbeddingExtractor + ?Sized,
{
    let query = extract(extractor, image_bytes)?;
    verify_embedding(store, &query, threshold)
}

pub fn users<S: GallerySource + ?Sized>(store: &S) -> Result<Vec<GalleryRecord>> {
    store.list_all_records().map_err(Error::Persistence)
}

pub fn attendance<S: AttendanceRecorder + ?Sized>(store: &S) -> Result<Vec<AttendanceEntry>> {
    store.list_attendance().map_err(Error::Persistence)
}
