//! Gallery data model and the store capabilities the service depends on.
//!
//! Each capability is a narrow trait so verification can run against the
//! on-disk [`FileStore`](crate::storage::FileStore) in production and a
//! [`MemoryStore`] in tests.

use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::Embedding;

pub type IdentityId = u64;

/// An enrolled identity. Never mutated after enrollment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GalleryRecord {
    pub identity_id: IdentityId,
    pub display_name: String,
    pub age: u32,
    pub embedding: Embedding,
}

/// One successful verification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceEntry {
    pub id: Uuid,
    pub display_name: String,
    pub age: u32,
    /// Seconds since the Unix epoch.
    pub recorded_at: u64,
}

impl AttendanceEntry {
    pub fn now(display_name: &str, age: u32) -> Self {
        let recorded_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        Self {
            id: Uuid::new_v4(),
            display_name: display_name.to_string(),
            age,
            recorded_at,
        }
    }
}

/// Read side of the gallery: a fresh snapshot per call.
pub trait GallerySource {
    fn list_all_records(&self) -> Result<Vec<GalleryRecord>>;
}

pub trait EnrollmentRecorder {
    /// Persist a new identity and return the id assigned to it.
    fn insert_record(&self, display_name: &str, age: u32, embedding: &Embedding)
        -> Result<IdentityId>;
}

pub trait AttendanceRecorder {
    fn insert_attendance(&self, display_name: &str, age: u32) -> Result<()>;

    fn list_attendance(&self) -> Result<Vec<AttendanceEntry>>;
}

/// Records and attendance log as persisted by a store.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub(crate) struct GalleryState {
    pub(crate) last_id: IdentityId,
    pub(crate) records: Vec<GalleryRecord>,
}

impl GalleryState {
    pub(crate) fn push(&mut self, display_name: &str, age: u32, embedding: &Embedding) -> IdentityId {
        self.last_id += 1;
        self.records.push(GalleryRecord {
            identity_id: self.last_id,
            display_name: display_name.to_string(),
            age,
            embedding: embedding.clone(),
        });
        self.last_id
    }
}

/// In-process store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    gallery: RwLock<GalleryState>,
    attendance: RwLock<Vec<AttendanceEntry>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("memory store lock poisoned")
}

impl GallerySource for MemoryStore {
    fn list_all_records(&self) -> Result<Vec<GalleryRecord>> {
        Ok(self.gallery.read().map_err(poisoned)?.records.clone())
    }
}

impl EnrollmentRecorder for MemoryStore {
    fn insert_record(&self, display_name: &str, age: u32, embedding: &Embedding) -> Result<IdentityId> {
        Ok(self
            .gallery
            .write()
            .map_err(poisoned)?
            .push(display_name, age, embedding))
    }
}

impl AttendanceRecorder for MemoryStore {
    fn insert_attendance(&self, display_name: &str, age: u32) -> Result<()> {
        self.attendance
            .write()
            .map_err(poisoned)?
            .push(AttendanceEntry::now(display_name, age));
        Ok(())
    }

    fn list_attendance(&self) -> Result<Vec<AttendanceEntry>> {
        Ok(self.attendance.read().map_err(poisoned)?.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_increase_from_one() {
        let store = MemoryStore::new();
        let e = Embedding::from(vec![1.0, 0.0]);
        assert_eq!(store.insert_record("a", 1, &e).unwrap(), 1);
        assert_eq!(store.insert_record("b", 2, &e).unwrap(), 2);

        let ids: Vec<_> = store
            .list_all_records()
            .unwrap()
            .iter()
            .map(|r| r.identity_id)
            .collect();
        assert_eq!(ids, vec![1, 2]);
    }

    #[test]
    fn snapshot_is_detached() {
        let store = MemoryStore::new();
        let e = Embedding::from(vec![1.0]);
        store.insert_record("a", 1, &e).unwrap();
        let snapshot = store.list_all_records().unwrap();
        store.insert_record("b", 2, &e).unwrap();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(store.list_all_records().unwrap().len(), 2);
    }

    #[test]
    fn attendance_appends() {
        let store = MemoryStore::new();
        store.insert_attendance("Ada", 36).unwrap();
        store.insert_attendance("Ada", 36).unwrap();
        let log = store.list_attendance().unwrap();
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].display_name, "Ada");
        assert_ne!(log[0].id, log[1].id);
    }
}
