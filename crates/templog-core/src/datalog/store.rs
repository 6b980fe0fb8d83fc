//! Record store
//!
//! Holds every record received in the current session, in arrival order.

use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::Record;

/// Append-only, shareable record collection.
///
/// Clones share the same underlying storage. The ingestion thread appends;
/// display and export code read through [`snapshot`](Self::snapshot), which
/// copies, so a reader never holds the lock while it works.
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    records: Arc<RwLock<Vec<Record>>>,
}

impl RecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, Vec<Record>> {
        // A panicking writer can only have completed or skipped a push
        self.records.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Vec<Record>> {
        self.records.write().unwrap_or_else(|e| e.into_inner())
    }

    /// Add a record at the end
    pub fn append(&self, record: Record) {
        self.write().push(record);
    }

    /// Point-in-time copy of all records
    pub fn snapshot(&self) -> Vec<Record> {
        self.read().clone()
    }

    /// Copy of the records appended after the first `offset`
    pub fn since(&self, offset: usize) -> Vec<Record> {
        let records = self.read();
        records.get(offset..).map(<[Record]>::to_vec).unwrap_or_default()
    }

    /// Number of records stored
    pub fn len(&self) -> usize {
        self.read().len()
    }

    /// True before the first record arrives
    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Most recently appended record
    pub fn last(&self) -> Option<Record> {
        self.read().last().cloned()
    }
}

impl FromIterator<Record> for RecordStore {
    fn from_iter<I: IntoIterator<Item = Record>>(iter: I) -> Self {
        Self {
            records: Arc::new(RwLock::new(iter.into_iter().collect())),
        }
    }
}
