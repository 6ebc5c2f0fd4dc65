//! JSON file backed record store.
//!
//! The whole catalog is kept in memory and written back as a pretty-printed
//! JSON array after every change. Writes go to a sibling temp file which is
//! then renamed over the catalog, so a crash never leaves a half-written file.
//!
//! Catalog files written before records carried an `id` or `credits` still
//! open: every value may be text, missing ids are issued on load and the file
//! is rewritten so those ids stay stable across restarts.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use serde::Deserialize;

use crate::catalog::types::{CourseCandidate, CourseDraft, CourseId, CourseRecord};
use crate::store::{CourseStore, StoreError};

/// On-disk form of a record, as loose as the files that exist in the wild.
#[derive(Deserialize)]
struct StoredCourse {
    id: Option<CourseId>,
    #[serde(flatten)]
    fields: CourseCandidate,
}

impl StoredCourse {
    /// Returns the record and whether it had to be issued an id.
    fn into_record(self) -> (CourseRecord, bool) {
        let issued = self.id.is_none();
        let fields = self.fields;
        let credits = fields.credits.as_ref().and_then(|c| c.as_positive());
        if credits.is_none() && fields.credits.is_some() {
            tracing::warn!(code = %fields.code, "Stored course has unreadable credits, dropping them");
        }

        let record = CourseRecord {
            id: self.id.unwrap_or_else(CourseId::generate),
            name: fields.name.trim().to_string(),
            code: fields.code.trim().to_string(),
            credits,
            instructor: fields.instructor.trim().to_string(),
            details: fields.details.normalized(),
        };
        (record, issued)
    }
}

pub struct JsonFileStore {
    path: PathBuf,
    records: RwLock<Vec<CourseRecord>>,
}

impl JsonFileStore {
    /// Open the catalog at `path`, starting empty if the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if !path.exists() {
            tracing::info!(path = %path.display(), "Catalog file not found, starting empty");
            return Ok(Self {
                path,
                records: RwLock::new(Vec::new()),
            });
        }

        let reader = BufReader::new(File::open(&path)?);
        let stored: Vec<StoredCourse> = serde_json::from_reader(reader)?;
        let mut issued = 0;
        let records: Vec<CourseRecord> = stored
            .into_iter()
            .map(|course| {
                let (record, new_id) = course.into_record();
                issued += usize::from(new_id);
                record
            })
            .collect();
        tracing::info!(path = %path.display(), count = records.len(), "Loaded course catalog");

        let store = Self {
            path,
            records: RwLock::new(Vec::new()),
        };
        if issued > 0 {
            store.persist(&records)?;
            tracing::info!(issued, "Issued ids to imported courses");
        }
        Ok(Self {
            records: RwLock::new(records),
            ..store
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, records: &[CourseRecord]) -> Result<(), StoreError> {
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        {
            let mut writer = BufWriter::new(File::create(&tmp)?);
            serde_json::to_writer_pretty(&mut writer, records)?;
            writer.flush()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl CourseStore for JsonFileStore {
    fn create(&self, draft: CourseDraft) -> Result<CourseRecord, StoreError> {
        let record = draft.into_record(CourseId::generate());
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        records.push(record.clone());

        if let Err(e) = self.persist(&records) {
            records.pop();
            return Err(e);
        }
        Ok(record)
    }

    fn list(&self) -> Result<Vec<CourseRecord>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.clone())
    }

    fn get(&self, id: &CourseId) -> Result<Option<CourseRecord>, StoreError> {
        let records = self.records.read().map_err(|_| StoreError::Poisoned)?;
        Ok(records.iter().find(|r| &r.id == id).cloned())
    }

    fn delete(&self, id: &CourseId) -> Result<Option<CourseRecord>, StoreError> {
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        let Some(index) = records.iter().position(|r| &r.id == id) else {
            return Ok(None);
        };

        let removed = records.remove(index);
        if let Err(e) = self.persist(&records) {
            records.insert(index, removed);
            return Err(e);
        }
        Ok(Some(removed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::CourseCandidate;

    fn draft(code: &str) -> CourseDraft {
        let mut candidate = CourseCandidate::new("Course", code, 3, "Dr. A");
        candidate.details.semester = Some("Fall".into());
        candidate.to_draft().unwrap()
    }

    #[test]
    fn test_persistence_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("course_catalog.json");

        let store = JsonFileStore::open(&path).unwrap();
        let a = store.create(draft("CS101")).unwrap();
        let b = store.create(draft("CS102")).unwrap();
        store.delete(&a.id).unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.list().unwrap(), vec![b]);
    }

    #[test]
    fn test_file_format_is_flat_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.create(draft("CS101")).unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        let first = &raw.as_array().unwrap()[0];
        assert_eq!(first["code"], "CS101");
        assert_eq!(first["semester"], "Fall");
        assert!(first.get("description").is_none());
    }

    #[test]
    fn test_failed_persist_rolls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        let store = JsonFileStore::open(&path).unwrap();
        let kept = store.create(draft("CS101")).unwrap();

        // Removing the directory makes every later write fail.
        drop(dir);

        assert!(store.create(draft("CS102")).is_err());
        assert!(store.delete(&kept.id).is_err());
        assert_eq!(store.list().unwrap(), vec![kept]);
    }

    #[test]
    fn test_opens_catalog_without_ids_or_credits() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("course_catalog.json");
        fs::write(
            &path,
            r#"[
                {"code": "CS203", "name": "SE", "instructor": "Dr. X", "semester": "Fall",
                 "schedule": "", "classroom": "B12", "prerequisites": "", "grading": "A-F"},
                {"code": "CS204", "name": "OS", "instructor": "Dr. Y", "credits": "3"}
            ]"#,
        )
        .unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        let records = store.list().unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].code, "CS203");
        assert_eq!(records[0].credits, None);
        assert_eq!(records[0].details.semester.as_deref(), Some("Fall"));
        assert_eq!(records[0].details.schedule, None);
        assert_eq!(records[1].credits, Some(3));
        assert_ne!(records[0].id, records[1].id);

        // Issued ids were written back.
        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.list().unwrap(), records);
        assert_eq!(reopened.get(&records[0].id).unwrap().unwrap().name, "SE");
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        fs::write(&path, "{not json").unwrap();

        assert!(matches!(JsonFileStore::open(&path), Err(StoreError::Corrupt(_))));
    }
}
