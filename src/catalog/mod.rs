//! Snapshot catalog abstractions and implementations.

use async_trait::async_trait;

use crate::error::GcResult;
use crate::models::{GcEvent, SnapshotRecord, SnapshotState};

mod journal;
mod memory;

pub use journal::*;
pub use memory::*;

/// Durable store of snapshot records and the GC audit log.
#[async_trait]
pub trait SnapshotCatalog: Send + Sync {
    /// Returns a consistent snapshot of all records at call time; order is
    /// unspecified.
    async fn list_all(&self) -> GcResult<Vec<SnapshotRecord>>;

    /// Looks up a single record.
    async fn get(&self, id: &str) -> GcResult<Option<SnapshotRecord>>;

    /// Compare-and-swap on `state`: succeeds and persists iff the record
    /// exists and its current state equals `expected`. This is the only
    /// sanctioned way to change a record's state.
    async fn transition_state(
        &self,
        id: &str,
        expected: SnapshotState,
        desired: SnapshotState,
    ) -> GcResult<bool>;

    /// Replaces the full record, persisting before returning true. Does not
    /// itself enforce state-transition rules; callers use it to update
    /// non-state fields.
    async fn upsert(&self, record: SnapshotRecord) -> GcResult<bool>;

    /// Appends an audit entry. Durability is best-effort but in-order.
    async fn record_event(&self, event: GcEvent) -> GcResult<()>;
}
