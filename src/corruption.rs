//! Corruption bookkeeping hook.

use async_trait::async_trait;
use dashmap::DashMap;

/// Tracks corrupt regions of snapshot payloads across restarts.
///
/// Recording is driven by the serving path; the GC engine only calls
/// [`CorruptionTracker::forget_for_snapshot`], exactly once per successful
/// hard delete, so stale corruption state does not outlive the payload.
#[async_trait]
pub trait CorruptionTracker: Send + Sync {
    /// Remembers a corrupt offset inside a snapshot payload.
    async fn record_corruption(&self, snapshot_id: &str, offset: u64);

    /// Drops all corruption state held for a snapshot.
    async fn forget_for_snapshot(&self, snapshot_id: &str);
}

/// In-memory corruption tracker.
#[derive(Default)]
pub struct MemoryCorruptionTracker {
    offsets: DashMap<String, Vec<u64>>,
}

impl MemoryCorruptionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any corruption state is held for the snapshot.
    pub fn is_tracked(&self, snapshot_id: &str) -> bool {
        self.offsets.contains_key(snapshot_id)
    }
}

#[async_trait]
impl CorruptionTracker for MemoryCorruptionTracker {
    async fn record_corruption(&self, snapshot_id: &str, offset: u64) {
        self.offsets
            .entry(snapshot_id.to_string())
            .or_default()
            .push(offset);
    }

    async fn forget_for_snapshot(&self, snapshot_id: &str) {
        self.offsets.remove(snapshot_id);
    }
}
