//! In-memory snapshot catalog.

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Mutex;

use crate::catalog::SnapshotCatalog;
use crate::error::GcResult;
use crate::models::{GcEvent, SnapshotRecord, SnapshotState};

/// In-memory implementation of the snapshot catalog.
///
/// Nothing is persisted; recorded events are retained so tests can assert on
/// the audit trail.
#[derive(Default)]
pub struct MemoryCatalog {
    records: DashMap<String, SnapshotRecord>,
    events: Mutex<Vec<GcEvent>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a record, replacing any existing one with the same id.
    pub fn insert(&self, record: SnapshotRecord) {
        self.records.insert(record.id.clone(), record);
    }

    /// Returns all events recorded so far, in call order.
    pub fn events(&self) -> Vec<GcEvent> {
        self.events.lock().expect("event log poisoned").clone()
    }
}

#[async_trait]
impl SnapshotCatalog for MemoryCatalog {
    async fn list_all(&self) -> GcResult<Vec<SnapshotRecord>> {
        Ok(self
            .records
            .iter()
            .map(|entry| entry.value().clone())
            .collect())
    }

    async fn get(&self, id: &str) -> GcResult<Option<SnapshotRecord>> {
        Ok(self.records.get(id).map(|entry| entry.value().clone()))
    }

    async fn transition_state(
        &self,
        id: &str,
        expected: SnapshotState,
        desired: SnapshotState,
    ) -> GcResult<bool> {
        match self.records.get_mut(id) {
            Some(mut record) if record.state == expected => {
                record.state = desired;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn upsert(&self, record: SnapshotRecord) -> GcResult<bool> {
        self.records.insert(record.id.clone(), record);
        Ok(true)
    }

    async fn record_event(&self, event: GcEvent) -> GcResult<()> {
        self.events.lock().expect("event log poisoned").push(event);
        Ok(())
    }
}
