//! Snapshot garbage collection engine.
//!
//! A pass tombstones unreferenced Active snapshots, then hard-deletes
//! Tombstoned snapshots whose grace period has elapsed, batching payload
//! deletions and journaling every state change through the catalog. Failed
//! deletions are retried in later passes with exponential backoff and end up
//! Quarantined after too many failures.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::time;
use tracing::{debug, info, warn};

use crate::catalog::SnapshotCatalog;
use crate::config::{GcOptions, RetentionPolicy};
use crate::corruption::CorruptionTracker;
use crate::elector::LeaderElector;
use crate::error::GcResult;
use crate::models::{GcEvent, GcEventType, SnapshotRecord, SnapshotState};
use crate::storage::StorageBackend;

/// Counters for one completed pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct GcMetrics {
    /// Records seen by the initial catalog scan.
    pub scanned: usize,
    /// Active records transitioned to Tombstoned.
    pub tombstoned: usize,
    /// Payloads hard-deleted, records now Deleted.
    pub deleted: usize,
    /// Records moved to Quarantined after repeated failures.
    pub quarantined: usize,
    /// Payload deletions that failed this pass.
    pub delete_failed: usize,
    /// Inactivity signals emitted for unreferenced idle records.
    pub inactive_loaded_signals: usize,
}

/// Two-stage snapshot garbage collector.
pub struct GcEngine {
    catalog: Arc<dyn SnapshotCatalog>,
    storage: Arc<dyn StorageBackend>,
    policy: RetentionPolicy,
    options: GcOptions,
    elector: Option<Arc<dyn LeaderElector>>,
    corruption: Option<Arc<dyn CorruptionTracker>>,
}

impl GcEngine {
    pub fn new(
        catalog: Arc<dyn SnapshotCatalog>,
        storage: Arc<dyn StorageBackend>,
        policy: RetentionPolicy,
        options: GcOptions,
    ) -> Self {
        Self {
            catalog,
            storage,
            policy,
            options,
            elector: None,
            corruption: None,
        }
    }

    /// Coordinates passes through a leader elector so only one GC instance
    /// acts on a shared dataset.
    pub fn with_elector(mut self, elector: Arc<dyn LeaderElector>) -> Self {
        self.elector = Some(elector);
        self
    }

    /// Forgets corruption state for snapshots the GC hard-deletes.
    pub fn with_corruption_tracker(mut self, corruption: Arc<dyn CorruptionTracker>) -> Self {
        self.corruption = Some(corruption);
        self
    }

    /// Runs passes forever at the given interval.
    pub async fn run(&self, interval: Duration) {
        let mut ticker = time::interval(interval);
        loop {
            ticker.tick().await;
            match self.run_once().await {
                Ok(metrics) => info!(?metrics, "gc pass complete"),
                Err(err) => warn!("gc pass failed: {err}"),
            }
        }
    }

    /// Runs a single pass against the current wall clock.
    pub async fn run_once(&self) -> GcResult<GcMetrics> {
        self.run_once_at(Utc::now()).await
    }

    /// Runs a single pass against a fixed instant. The whole pass, including
    /// event timestamps and backoff deadlines, observes this one `now`.
    pub async fn run_once_at(&self, now: DateTime<Utc>) -> GcResult<GcMetrics> {
        if let Some(elector) = &self.elector {
            if !elector.try_acquire().await {
                debug!("not the gc leader; skipping pass");
                return Ok(GcMetrics::default());
            }
        }

        let result = self.pass(now).await;

        // Released on every exit path, success or error.
        if let Some(elector) = &self.elector {
            elector.release().await;
        }
        result
    }

    /// Reverts records left in Deleting by an interrupted pass back to
    /// Tombstoned, making them eligible again. Intended to run once at boot,
    /// before the first pass.
    pub async fn recover_interrupted(&self) -> GcResult<usize> {
        let mut recovered = 0;
        for record in self.catalog.list_all().await? {
            if record.state != SnapshotState::Deleting {
                continue;
            }
            if self
                .catalog
                .transition_state(&record.id, SnapshotState::Deleting, SnapshotState::Tombstoned)
                .await?
            {
                warn!(id = %record.id, "recovered snapshot stuck in Deleting");
                recovered += 1;
            }
        }
        Ok(recovered)
    }

    async fn pass(&self, now: DateTime<Utc>) -> GcResult<GcMetrics> {
        let mut metrics = GcMetrics::default();

        let all = self.catalog.list_all().await?;
        metrics.scanned = all.len();

        let live = self.compute_live_set(&all, now).await?;

        if self.options.enable_tombstone_stage {
            self.tombstone_candidates(&all, &live, now, &mut metrics)
                .await?;
        }
        if self.options.enable_hard_delete_stage {
            self.hard_delete_eligible(now, &mut metrics).await?;
        }
        Ok(metrics)
    }

    /// Snapshot ids the retention policy requires to survive this pass:
    /// the keep-last-N most recent, anything inside the age window, leased
    /// or pin-tagged records, and transitively the parents of all of those.
    async fn compute_live_set(
        &self,
        all: &[SnapshotRecord],
        now: DateTime<Utc>,
    ) -> GcResult<HashSet<String>> {
        let mut live = HashSet::new();
        let cutoff = now - self.policy.max_age;

        // Deleted records neither survive nor consume keep-last-N slots.
        let mut candidates: Vec<&SnapshotRecord> = all
            .iter()
            .filter(|record| record.state != SnapshotState::Deleted)
            .collect();
        candidates.sort_by(|a, b| b.created.cmp(&a.created));

        for record in candidates.iter().take(self.policy.keep_last_n) {
            self.mark_live_with_parents(record, &mut live).await?;
        }

        for record in &candidates {
            if record.created >= cutoff || record.lease_count > 0 || record.is_pinned_by_tag() {
                self.mark_live_with_parents(record, &mut live).await?;
            }
        }
        Ok(live)
    }

    /// Marks a record live, then walks `parent_id` links through the catalog
    /// marking each ancestor. A missing parent ends the chain without error;
    /// dedup on id makes cycles safe.
    async fn mark_live_with_parents(
        &self,
        record: &SnapshotRecord,
        live: &mut HashSet<String>,
    ) -> GcResult<()> {
        let mut current = record.clone();
        loop {
            if !live.insert(current.id.clone()) {
                return Ok(());
            }
            let Some(parent_id) = current.parent_id.clone() else {
                return Ok(());
            };
            match self.catalog.get(&parent_id).await? {
                Some(parent) => current = parent,
                None => return Ok(()),
            }
        }
    }

    async fn tombstone_candidates(
        &self,
        all: &[SnapshotRecord],
        live: &HashSet<String>,
        now: DateTime<Utc>,
        metrics: &mut GcMetrics,
    ) -> GcResult<()> {
        for record in all {
            if record.state != SnapshotState::Active {
                continue;
            }
            if live.contains(&record.id) {
                continue;
            }
            if record.lease_count > 0 {
                continue;
            }

            if self.options.dry_run {
                self.catalog
                    .record_event(GcEvent::new(
                        now,
                        &record.id,
                        GcEventType::DryRunTombstone,
                        "would tombstone",
                    ))
                    .await?;
                continue;
            }

            // A lost CAS means a concurrent mutation; the candidate is
            // dropped for this pass.
            if !self
                .catalog
                .transition_state(&record.id, SnapshotState::Active, SnapshotState::Tombstoned)
                .await?
            {
                continue;
            }

            if let Some(mut current) = self.catalog.get(&record.id).await? {
                // The grace deadline is fixed here, once; later policy
                // changes never move it.
                current.hard_delete_after = Some(now + self.options.grace_period);
                current.next_retry_after = None;
                current.last_error.clear();
                self.catalog.upsert(current).await?;
                self.catalog
                    .record_event(GcEvent::new(
                        now,
                        &record.id,
                        GcEventType::Tombstone,
                        "soft-deleted; hard delete scheduled",
                    ))
                    .await?;
                metrics.tombstoned += 1;
            }
        }

        // Inactivity telemetry for unreferenced records idle past the
        // window. No state changes; the serving path consumes the signal.
        for record in all {
            if record.state != SnapshotState::Active {
                continue;
            }
            if live.contains(&record.id) {
                continue;
            }
            let Some(last_access) = record.last_access else {
                continue;
            };
            if last_access + self.options.inactive_timeout <= now {
                self.catalog
                    .record_event(GcEvent::new(
                        now,
                        &record.id,
                        GcEventType::InactiveEligible,
                        "unreferenced and inactive past the timeout",
                    ))
                    .await?;
                metrics.inactive_loaded_signals += 1;
            }
        }
        Ok(())
    }

    async fn hard_delete_eligible(
        &self,
        now: DateTime<Utc>,
        metrics: &mut GcMetrics,
    ) -> GcResult<()> {
        // Re-list to observe tombstones written earlier in this pass.
        let all = self.catalog.list_all().await?;

        let mut eligible: Vec<SnapshotRecord> = all
            .into_iter()
            .filter(|record| {
                record.state == SnapshotState::Tombstoned
                    && record.lease_count == 0
                    && record.hard_delete_after.is_some_and(|t| t <= now)
                    && record.next_retry_after.map_or(true, |t| t <= now)
            })
            .collect();

        eligible.truncate(self.options.max_deletes_per_run);
        let chunk_size = self.options.batch_delete_size.max(1);

        for chunk in eligible.chunks(chunk_size) {
            if self.options.dry_run {
                for record in chunk {
                    self.catalog
                        .record_event(GcEvent::new(
                            now,
                            &record.id,
                            GcEventType::DryRunDelete,
                            "would hard-delete payload",
                        ))
                        .await?;
                }
                continue;
            }

            // CAS into Deleting first: the barrier that stops another GC
            // instance from deleting the same payload.
            let mut deleting_ids = Vec::with_capacity(chunk.len());
            for record in chunk {
                if self
                    .catalog
                    .transition_state(
                        &record.id,
                        SnapshotState::Tombstoned,
                        SnapshotState::Deleting,
                    )
                    .await?
                {
                    deleting_ids.push(record.id.clone());
                }
            }
            if deleting_ids.is_empty() {
                continue;
            }

            let outcome = self.storage.delete_payload_batch(&deleting_ids).await;
            // No per-id failures plus a batch-level error means the whole
            // batch failed; every id is treated as failed.
            let catastrophic = !outcome.all_ok
                && outcome.failed.is_empty()
                && outcome.error.as_deref().is_some_and(|e| !e.is_empty());

            for id in &deleting_ids {
                let failed = catastrophic || outcome.failed.iter().any(|f| f == id);
                if failed {
                    self.finalize_failed_delete(id, outcome.error.as_deref(), now, metrics)
                        .await?;
                } else {
                    self.finalize_deleted(id, now, metrics).await?;
                }
            }
        }
        Ok(())
    }

    async fn finalize_deleted(
        &self,
        id: &str,
        now: DateTime<Utc>,
        metrics: &mut GcMetrics,
    ) -> GcResult<()> {
        self.catalog
            .transition_state(id, SnapshotState::Deleting, SnapshotState::Deleted)
            .await?;
        self.catalog
            .record_event(GcEvent::new(
                now,
                id,
                GcEventType::DeleteOk,
                "payload permanently deleted",
            ))
            .await?;
        metrics.deleted += 1;

        if let Some(corruption) = &self.corruption {
            corruption.forget_for_snapshot(id).await;
        }
        Ok(())
    }

    async fn finalize_failed_delete(
        &self,
        id: &str,
        error: Option<&str>,
        now: DateTime<Utc>,
        metrics: &mut GcMetrics,
    ) -> GcResult<()> {
        metrics.delete_failed += 1;

        let Some(record) = self.catalog.get(id).await? else {
            return Ok(());
        };
        let failures = record.delete_failures.saturating_add(1);
        let message = match error {
            Some(e) if !e.is_empty() => e.to_string(),
            _ => "Delete failed".to_string(),
        };
        let backoff = self.options.base_retry_backoff * (1i32 << failures.min(10));

        if failures >= self.options.max_delete_failures_before_quarantine {
            self.catalog
                .transition_state(id, SnapshotState::Deleting, SnapshotState::Quarantined)
                .await?;
            self.catalog
                .record_event(GcEvent::new(
                    now,
                    id,
                    GcEventType::Quarantine,
                    format!("too many delete failures: {message}"),
                ))
                .await?;
            metrics.quarantined += 1;
        } else {
            // Revert so a later pass retries once the backoff elapses.
            self.catalog
                .transition_state(id, SnapshotState::Deleting, SnapshotState::Tombstoned)
                .await?;
            self.catalog
                .record_event(GcEvent::new(
                    now,
                    id,
                    GcEventType::DeleteFail,
                    format!("will retry after backoff: {message}"),
                ))
                .await?;
        }

        // Upsert replaces the whole record, so the bookkeeping goes onto the
        // post-transition copy to keep the state the CAS just wrote.
        if let Some(mut current) = self.catalog.get(id).await? {
            current.delete_failures = failures;
            current.last_error = message;
            current.next_retry_after = Some(now + backoff);
            self.catalog.upsert(current).await?;
        }
        Ok(())
    }
}
