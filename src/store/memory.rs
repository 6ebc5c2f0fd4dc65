//! In-memory record store.

use std::sync::RwLock;

use crate::catalog::types::{CourseDraft, CourseId, CourseRecord};
use crate::store::{CourseStore, StoreError};

/// Process-local store keeping records in insertion order.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<CourseRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CourseStore for MemoryStore {
    fn create(&self, draft: CourseDraft) -> Result<CourseRecord, StoreError> {
        let record = draft.into_record(CourseId::generate());
        let mut records = self.records.write().map_err(|_| StoreError::Poisoned)?;
        records.push(record.clone());
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
        Ok(records
            .iter()
            .position(|r| &r.id == id)
            .map(|index| records.remove(index)))
    }
}
