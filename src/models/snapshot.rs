//! Snapshot metadata models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Tags that pin a snapshot into the live set regardless of age.
pub const LIVE_PIN_TAGS: [&str; 3] = ["pin", "retain", "legal"];

/// Lifecycle state of a snapshot record.
///
/// The only transitions the GC performs are Active→Tombstoned,
/// Tombstoned→Deleting, Deleting→Deleted, Deleting→Tombstoned (retry) and
/// Deleting→Quarantined. Deleted and Quarantined are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SnapshotState {
    Active,
    /// Soft-deleted: the record is no longer servable but the payload may
    /// still exist until the grace period elapses.
    Tombstoned,
    /// Payload deletion in progress.
    Deleting,
    /// Payload permanently removed.
    Deleted,
    /// Repeated delete failures; requires manual investigation.
    Quarantined,
}

impl SnapshotState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SnapshotState::Active => "Active",
            SnapshotState::Tombstoned => "Tombstoned",
            SnapshotState::Deleting => "Deleting",
            SnapshotState::Deleted => "Deleted",
            SnapshotState::Quarantined => "Quarantined",
        }
    }

    /// Stable integer used by the journal wire format.
    pub fn as_int(&self) -> i64 {
        match self {
            SnapshotState::Active => 0,
            SnapshotState::Tombstoned => 1,
            SnapshotState::Deleting => 2,
            SnapshotState::Deleted => 3,
            SnapshotState::Quarantined => 4,
        }
    }

    pub fn from_int(value: i64) -> Option<Self> {
        match value {
            0 => Some(SnapshotState::Active),
            1 => Some(SnapshotState::Tombstoned),
            2 => Some(SnapshotState::Deleting),
            3 => Some(SnapshotState::Deleted),
            4 => Some(SnapshotState::Quarantined),
            _ => None,
        }
    }
}

/// Catalog record for one snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    /// Stable identifier; also the payload key in the storage backend.
    pub id: String,
    /// Creation instant; never mutated after the record is first written.
    pub created: DateTime<Utc>,
    /// Payload size. Informational only to the GC.
    pub size_bytes: u64,
    /// Lifecycle state.
    pub state: SnapshotState,
    /// Parent of an incremental chain; the child depends on the parent's
    /// payload, so a live child keeps its parents live.
    pub parent_id: Option<String>,
    /// Free-form labels. `pin`, `retain` and `legal` are recognized pins.
    pub tags: HashSet<String>,
    /// Number of active readers. A leased record is always live.
    pub lease_count: u32,
    /// Last read access, when the serving path reports it.
    pub last_access: Option<DateTime<Utc>>,
    /// Hard-delete eligibility instant. Set exactly once at tombstone time
    /// and never recomputed from later policy changes.
    pub hard_delete_after: Option<DateTime<Utc>>,
    /// Failed hard-delete attempts so far.
    pub delete_failures: u32,
    /// Earliest instant of the next hard-delete attempt.
    pub next_retry_after: Option<DateTime<Utc>>,
    /// Most recent delete error, empty when none.
    pub last_error: String,
}

impl SnapshotRecord {
    /// Creates a new Active record with empty bookkeeping.
    pub fn new(id: impl Into<String>, created: DateTime<Utc>, size_bytes: u64) -> Self {
        Self {
            id: id.into(),
            created,
            size_bytes,
            state: SnapshotState::Active,
            parent_id: None,
            tags: HashSet::new(),
            lease_count: 0,
            last_access: None,
            hard_delete_after: None,
            delete_failures: 0,
            next_retry_after: None,
            last_error: String::new(),
        }
    }

    /// Whether any recognized pin tag is present.
    pub fn is_pinned_by_tag(&self) -> bool {
        LIVE_PIN_TAGS.iter().any(|tag| self.tags.contains(*tag))
    }
}
