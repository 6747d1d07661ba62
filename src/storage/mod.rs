//! Storage backends for snapshot payloads.

use async_trait::async_trait;

use crate::error::GcResult;

mod fs;
mod memory;

pub use fs::*;
pub use memory::*;

/// Outcome of a batch payload deletion.
#[derive(Debug, Clone, Default)]
pub struct BatchDeleteOutcome {
    /// True when every payload in the batch was deleted.
    pub all_ok: bool,
    /// Ids whose deletion failed.
    pub failed: Vec<String>,
    /// Batch-level error. When `all_ok` is false and `failed` is empty, a
    /// non-empty error means the whole batch failed (e.g. the backend
    /// rejected the credentials) and every id is treated as failed.
    pub error: Option<String>,
}

/// Store of snapshot payloads, addressed by snapshot id.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Deletes one payload. Idempotent: deleting an absent payload succeeds.
    /// Must not succeed while the bytes remain retrievable.
    async fn delete_payload(&self, id: &str) -> GcResult<()>;

    /// Deletes a batch of payloads. Backends with a native bulk API may
    /// override this; the default loops over single deletes and accumulates
    /// the ids that failed.
    async fn delete_payload_batch(&self, ids: &[String]) -> BatchDeleteOutcome {
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

    /// Whether a payload currently exists. Diagnostic only; not on the GC
    /// hot path.
    async fn exists(&self, id: &str) -> bool;
}
