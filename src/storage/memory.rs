//! In-memory storage backend.

use async_trait::async_trait;
use bytes::Bytes;
use dashmap::DashMap;
use std::sync::Mutex;

use crate::error::{GcError, GcResult};
use crate::storage::{BatchDeleteOutcome, StorageBackend};

/// In-memory payload store.
///
/// Supports per-id failure injection and a catastrophic batch-level error,
/// and records every delete call, so tests can drive the engine's retry and
/// quarantine paths.
#[derive(Default)]
pub struct MemoryStorageBackend {
    payloads: DashMap<String, Bytes>,
    failing: DashMap<String, String>,
    batch_error: Mutex<Option<String>>,
    delete_calls: Mutex<Vec<String>>,
}

impl MemoryStorageBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a payload under the given id.
    pub fn insert(&self, id: impl Into<String>, data: Bytes) {
        self.payloads.insert(id.into(), data);
    }

    /// Makes every delete of `id` fail with `message` until cleared.
    pub fn fail_on(&self, id: impl Into<String>, message: impl Into<String>) {
        self.failing.insert(id.into(), message.into());
    }

    /// Clears a per-id failure injection.
    pub fn clear_failure(&self, id: &str) {
        self.failing.remove(id);
    }

    /// Makes the next batch calls fail wholesale with `message`, reporting
    /// no per-id failures.
    pub fn set_batch_error(&self, message: impl Into<String>) {
        *self.batch_error.lock().expect("batch error poisoned") = Some(message.into());
    }

    pub fn clear_batch_error(&self) {
        *self.batch_error.lock().expect("batch error poisoned") = None;
    }

    /// Every id passed to `delete_payload` so far, in call order.
    pub fn delete_calls(&self) -> Vec<String> {
        self.delete_calls.lock().expect("call log poisoned").clone()
    }
}

#[async_trait]
impl StorageBackend for MemoryStorageBackend {
    async fn delete_payload(&self, id: &str) -> GcResult<()> {
        self.delete_calls
            .lock()
            .expect("call log poisoned")
            .push(id.to_string());

        if let Some(message) = self.failing.get(id) {
            return Err(GcError::storage(message.value()));
        }
        // Deleting an absent payload succeeds.
        self.payloads.remove(id);
        Ok(())
    }

    async fn delete_payload_batch(&self, ids: &[String]) -> BatchDeleteOutcome {
        let batch_error = self
            .batch_error
            .lock()
            .expect("batch error poisoned")
            .clone();
        if let Some(message) = batch_error {
            return BatchDeleteOutcome {
                all_ok: false,
                failed: Vec::new(),
                error: Some(message),
            };
        }

        let mut failed = Vec::new();
        for id in ids {
            if self.delete_payload(id).await.is_err() {
                failed.push(id.clone());
            }
        }
        BatchDeleteOutcome {
            all_ok: failed.is_empty(),
            failed,
            error: None,
        }
    }

    async fn exists(&self, id: &str) -> bool {
        self.payloads.contains_key(id)
    }
}
