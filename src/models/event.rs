//! GC audit events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Fixed vocabulary of audit event tags emitted by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GcEventType {
    Tombstone,
    DryRunTombstone,
    InactiveEligible,
    DeleteOk,
    DeleteFail,
    DryRunDelete,
    Quarantine,
}

impl GcEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GcEventType::Tombstone => "TOMBSTONE",
            GcEventType::DryRunTombstone => "DRYRUN_TOMBSTONE",
            GcEventType::InactiveEligible => "INACTIVE_ELIGIBLE",
            GcEventType::DeleteOk => "DELETE_OK",
            GcEventType::DeleteFail => "DELETE_FAIL",
            GcEventType::DryRunDelete => "DRYRUN_DELETE",
            GcEventType::Quarantine => "QUARANTINE",
        }
    }
}

/// Append-only audit record. The engine only ever writes events; it never
/// reads them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GcEvent {
    pub when: DateTime<Utc>,
    pub snapshot_id: String,
    pub event_type: GcEventType,
    pub details: String,
}

impl GcEvent {
    pub fn new(
        when: DateTime<Utc>,
        snapshot_id: impl Into<String>,
        event_type: GcEventType,
        details: impl Into<String>,
    ) -> Self {
        Self {
            when,
            snapshot_id: snapshot_id.into(),
            event_type,
            details: details.into(),
        }
    }
}
