//! The decrypted record collection handed to vault callbacks.

use chrono::{DateTime, Utc};

use super::record::{RecordSummary, VaultRecord};
use crate::errors::{Result, VaultError};

/// In-memory record collection for a single unlocked operation.
///
/// Tracks whether the callback changed anything so the store only
/// re-encrypts when needed.
#[derive(Debug)]
pub struct RecordSet {
    records: Vec<VaultRecord>,
    dirty: bool,
    now: DateTime<Utc>,
}

impl RecordSet {
    pub(crate) fn new(records: Vec<VaultRecord>, now: DateTime<Utc>) -> Self {
        Self {
            records,
            dirty: false,
            now,
        }
    }

    /// The time the operation started. Used for record timestamps.
    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    pub fn records(&self) -> &[VaultRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn summaries(&self) -> Vec<RecordSummary> {
        self.records.iter().map(VaultRecord::summary).collect()
    }

    pub fn get(&self, id: &str) -> Option<&VaultRecord> {
        self.records.iter().find(|r| r.id() == id)
    }

    /// Insert `record`, or replace the one with the same id.
    ///
    /// A replaced record keeps its original `created_at`.
    pub fn upsert(&mut self, mut record: VaultRecord) {
        match self.records.iter().position(|r| r.id() == record.id()) {
            Some(idx) => {
                let created = self.records[idx].created_at();
                record.set_timestamps(created, self.now);
                self.records[idx] = record;
            }
            None => {
                record.set_timestamps(self.now, self.now);
                self.records.push(record);
            }
        }
        self.dirty = true;
    }

    /// Remove the record with `id`, returning it.
    pub fn remove(&mut self, id: &str) -> Result<VaultRecord> {
        let idx = self
            .records
            .iter()
            .position(|r| r.id() == id)
            .ok_or_else(|| VaultError::RecordNotFound(id.to_string()))?;
        self.dirty = true;
        Ok(self.records.remove(idx))
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub(crate) fn into_records(self) -> Vec<VaultRecord> {
        self.records
    }
}
