//! Common test utilities.

#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};

use snapgc::{GcEvent, GcEventType, MemoryCatalog, SnapshotRecord, SnapshotState};

/// Base instant shared by the scenarios: 2024-01-01T00:00:00Z.
pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn hours(n: i64) -> Duration {
    Duration::hours(n)
}

pub fn seconds(n: i64) -> Duration {
    Duration::seconds(n)
}

/// A fresh Active record created at the given instant.
pub fn record(id: &str, created: DateTime<Utc>) -> SnapshotRecord {
    SnapshotRecord::new(id, created, 1024)
}

/// A Tombstoned record whose grace deadline is already fixed.
pub fn tombstoned(id: &str, created: DateTime<Utc>, hard_delete_after: DateTime<Utc>) -> SnapshotRecord {
    let mut rec = record(id, created);
    rec.state = SnapshotState::Tombstoned;
    rec.hard_delete_after = Some(hard_delete_after);
    rec
}

/// Current state of a record in the catalog, panicking when absent.
pub async fn state_of(catalog: &MemoryCatalog, id: &str) -> SnapshotState {
    use snapgc::SnapshotCatalog;
    catalog
        .get(id)
        .await
        .unwrap()
        .unwrap_or_else(|| panic!("record {id} missing"))
        .state
}

/// Events of one type, in call order.
pub fn events_of(catalog: &MemoryCatalog, event_type: GcEventType) -> Vec<GcEvent> {
    catalog
        .events()
        .into_iter()
        .filter(|event| event.event_type == event_type)
        .collect()
}
