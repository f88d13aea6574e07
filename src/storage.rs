use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{anyhow, Context, Result};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    gallery::{
        AttendanceEntry, AttendanceRecorder, EnrollmentRecorder, GalleryRecord, GallerySource,
        GalleryState, IdentityId,
    },
    Embedding,
};

const GALLERY_FILE: &str = "gallery.bin";
const ATTENDANCE_FILE: &str = "attendance.bin";

/// Postcard-encoded gallery and attendance log under one directory.
///
/// Every write rewrites the whole file through a temp file and a rename, so
/// concurrent readers see either the old or the new contents.
#[derive(Debug)]
pub struct FileStore {
    dir: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn read<T: DeserializeOwned + Default>(&self, name: &str) -> Result<T> {
        let file = self.dir.join(name);
        if !file.exists() {
            return Ok(T::default());
        }
        let data = std::fs::read(&file).with_context(|| format!("reading {}", file.display()))?;
        postcard::from_bytes(&data).with_context(|| format!("decoding {}", file.display()))
    }

    fn write<T: Serialize>(&self, name: &str, value: &T) -> Result<()> {
        let file = self.dir.join(name);
        let tmp = self.dir.join(format!("{name}.tmp"));
        let data = postcard::to_allocvec(value)?;
        std::fs::write(&tmp, data).with_context(|| format!("writing {}", tmp.display()))?;
        std::fs::rename(&tmp, &file).with_context(|| format!("replacing {}", file.display()))?;
        Ok(())
    }

    /// Load, modify, and store one file under the write lock.
    fn update<T, R>(&self, name: &str, f: impl FnOnce(&mut T) -> R) -> Result<R>
    where
        T: Serialize + DeserializeOwned + Default,
    {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| anyhow!("store write lock poisoned"))?;
        let mut value = self.read::<T>(name)?;
        let out = f(&mut value);
        self.write(name, &value)?;
        Ok(out)
    }
}

impl GallerySource for FileStore {
    fn list_all_records(&self) -> Result<Vec<GalleryRecord>> {
        Ok(self.read::<GalleryState>(GALLERY_FILE)?.records)
    }
}

impl EnrollmentRecorder for FileStore {
    fn insert_record(&self, display_name: &str, age: u32, embedding: &Embedding) -> Result<IdentityId> {
        self.update(GALLERY_FILE, |state: &mut GalleryState| {
            state.push(display_name, age, embedding)
        })
    }
}

impl AttendanceRecorder for FileStore {
    fn insert_attendance(&self, display_name: &str, age: u32) -> Result<()> {
        let entry = AttendanceEntry::now(display_name, age);
        self.update(ATTENDANCE_FILE, |log: &mut Vec<AttendanceEntry>| log.push(entry))
    }

    fn list_attendance(&self) -> Result<Vec<AttendanceEntry>> {
        self.read(ATTENDANCE_FILE)
    }
}
