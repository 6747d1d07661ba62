//! Journal-backed snapshot catalog.
//!
//! An append-only UTF-8 text journal paired with an in-memory map keyed by
//! snapshot id. The journal is replayed on open to rebuild the map; every
//! subsequent mutation appends one line and updates the map under a single
//! catalog-wide exclusive lock. Three line shapes exist on disk:
//!
//! ```text
//! UPSERT <id>|<createdMs>|<sizeBytes>|<state>|<leaseCount>|<lastAccessMs>|<hardDeleteMs|-1>|<failures>|<nextRetryMs|-1>|<lastError>
//! STATE  <id> <expected> <desired>
//! EVENT  <id> <type> <details>
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::catalog::SnapshotCatalog;
use crate::error::{GcError, GcResult};
use crate::models::{GcEvent, SnapshotRecord, SnapshotState};

/// Snapshot catalog persisted as an append-only line journal.
pub struct JournalCatalog {
    path: PathBuf,
    records: Mutex<HashMap<String, SnapshotRecord>>,
}

impl JournalCatalog {
    /// Opens the catalog, replaying the journal at `path` if it exists.
    pub async fn open(path: impl Into<PathBuf>) -> GcResult<Self> {
        let path = path.into();
        let mut records = HashMap::new();

        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => replay(&contents, &mut records)?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        Ok(Self {
            path,
            records: Mutex::new(records),
        })
    }

    /// Number of records currently in the catalog.
    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.lock().await.is_empty()
    }

    /// Appends one journal line. The handle is reopened per append; callers
    /// must already hold the record lock so lines land in mutation order.
    async fn append(&self, line: &str) -> GcResult<()> {
        let mut file = tokio::fs::OpenOptions::new()
            .append(true)
            .create(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.write_all(b"\n").await?;
        file.flush().await?;
        Ok(())
    }
}

#[async_trait]
impl SnapshotCatalog for JournalCatalog {
    async fn list_all(&self) -> GcResult<Vec<SnapshotRecord>> {
        let records = self.records.lock().await;
        Ok(records.values().cloned().collect())
    }

    async fn get(&self, id: &str) -> GcResult<Option<SnapshotRecord>> {
        let records = self.records.lock().await;
        Ok(records.get(id).cloned())
    }

    async fn transition_state(
        &self,
        id: &str,
        expected: SnapshotState,
        desired: SnapshotState,
    ) -> GcResult<bool> {
        let mut records = self.records.lock().await;
        match records.get_mut(id) {
            Some(record) if record.state == expected => {
                // Journal first: the map must never advance past what was
                // durably written.
                let line = format!("STATE {} {} {}", id, expected.as_int(), desired.as_int());
                self.append(&line).await?;
                record.state = desired;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn upsert(&self, record: SnapshotRecord) -> GcResult<bool> {
        let mut records = self.records.lock().await;
        let line = format!("UPSERT {}", serialize_record(&record));
        self.append(&line).await?;
        records.insert(record.id.clone(), record);
        Ok(true)
    }

    async fn record_event(&self, event: GcEvent) -> GcResult<()> {
        // Hold the record lock so events interleave with mutations in call
        // order. Event durability is best-effort: an append failure is
        // logged, not propagated.
        let _records = self.records.lock().await;
        let line = format!(
            "EVENT {} {} {}",
            event.snapshot_id,
            event.event_type.as_str(),
            escape(&event.details)
        );
        if let Err(err) = self.append(&line).await {
            warn!(snapshot_id = %event.snapshot_id, "failed to append gc event: {err}");
        }
        Ok(())
    }
}

fn replay(contents: &str, records: &mut HashMap<String, SnapshotRecord>) -> GcResult<()> {
    let lines: Vec<&str> = contents.lines().collect();
    let total = lines.len();

    for (idx, line) in lines.iter().enumerate() {
        let line_no = idx + 1;
        if let Err(err) = apply_line(line, records) {
            // A malformed final line is an interrupted append; everything
            // before it is already durable.
            if line_no == total {
                warn!("dropping torn journal tail at line {line_no}: {err}");
                return Ok(());
            }
            return Err(GcError::JournalParse(format!("line {line_no}: {err}")));
        }
    }
    Ok(())
}

fn apply_line(line: &str, records: &mut HashMap<String, SnapshotRecord>) -> Result<(), String> {
    if line.is_empty() {
        return Ok(());
    }

    if let Some(payload) = line.strip_prefix("UPSERT ") {
        let record = parse_record(payload)?;
        records.insert(record.id.clone(), record);
    } else if let Some(rest) = line.strip_prefix("STATE ") {
        let mut parts = rest.split_whitespace();
        let id = parts.next().ok_or("STATE record missing id")?;
        let expected = parse_state(parts.next().ok_or("STATE record missing expected state")?)?;
        let desired = parse_state(parts.next().ok_or("STATE record missing desired state")?)?;

        // Transitions were only journaled on CAS success, so a mismatch here
        // means the file was edited or written by an uncoordinated process.
        if let Some(record) = records.get_mut(id) {
            if record.state != expected {
                warn!(
                    id,
                    found = record.state.as_str(),
                    expected = expected.as_str(),
                    "journal STATE record does not match replayed state"
                );
            }
            record.state = desired;
        }
    } else if line.starts_with("EVENT ") {
        // Audit entries are not reloaded into any queryable structure.
    } else {
        // Unknown leading tokens are skipped for forward compatibility.
        debug!("skipping unknown journal record: {line}");
    }
    Ok(())
}

/// Encodes a record as the pipe-delimited UPSERT payload. Timestamps are
/// milliseconds since the Unix epoch; absent optionals serialize as `-1`.
pub fn serialize_record(record: &SnapshotRecord) -> String {
    let last_access = record.last_access.map_or(-1, |t| t.timestamp_millis());
    let hard_delete = record.hard_delete_after.map_or(-1, |t| t.timestamp_millis());
    let next_retry = record.next_retry_after.map_or(-1, |t| t.timestamp_millis());

    format!(
        "{}|{}|{}|{}|{}|{}|{}|{}|{}|{}",
        record.id,
        record.created.timestamp_millis(),
        record.size_bytes,
        record.state.as_int(),
        record.lease_count,
        last_access,
        hard_delete,
        record.delete_failures,
        next_retry,
        escape(&record.last_error),
    )
}

/// Decodes an UPSERT payload produced by [`serialize_record`].
///
/// Parent links and tags are not part of the wire format; they come back
/// empty and are repopulated by whatever wrote them originally.
pub fn deserialize_record(payload: &str) -> GcResult<SnapshotRecord> {
    parse_record(payload).map_err(GcError::JournalParse)
}

fn parse_record(payload: &str) -> Result<SnapshotRecord, String> {
    // The trailing field keeps any literal pipes; only the first nine
    // delimiters are structural.
    let parts: Vec<&str> = payload.splitn(10, '|').collect();
    if parts.len() != 10 {
        return Err(format!("expected 10 fields, found {}", parts.len()));
    }

    let created = parse_instant(parts[1], "created")?
        .ok_or_else(|| "created timestamp out of range".to_string())?;
    let state = parse_state(parts[3])?;

    Ok(SnapshotRecord {
        id: parts[0].to_string(),
        created,
        size_bytes: parse_int(parts[2], "sizeBytes")?,
        state,
        parent_id: None,
        tags: Default::default(),
        lease_count: parse_int(parts[4], "leaseCount")?,
        // Writers that predate the -1 sentinel encoded "never accessed" as
        // epoch zero; accept both.
        last_access: parse_optional_instant(parts[5], "lastAccess")?
            .filter(|t| t.timestamp_millis() > 0),
        hard_delete_after: parse_optional_instant(parts[6], "hardDeleteAfter")?,
        delete_failures: parse_int(parts[7], "deleteFailures")?,
        next_retry_after: parse_optional_instant(parts[8], "nextRetryAfter")?,
        last_error: unescape(parts[9]),
    })
}

fn parse_int<T: std::str::FromStr>(value: &str, field: &str) -> Result<T, String> {
    value
        .parse()
        .map_err(|_| format!("invalid {field}: {value:?}"))
}

fn parse_state(value: &str) -> Result<SnapshotState, String> {
    let code: i64 = parse_int(value, "state")?;
    SnapshotState::from_int(code).ok_or_else(|| format!("unknown state code {code}"))
}

fn parse_instant(value: &str, field: &str) -> Result<Option<DateTime<Utc>>, String> {
    let ms: i64 = parse_int(value, field)?;
    Ok(DateTime::<Utc>::from_timestamp_millis(ms))
}

fn parse_optional_instant(value: &str, field: &str) -> Result<Option<DateTime<Utc>>, String> {
    let ms: i64 = parse_int(value, field)?;
    if ms < 0 {
        return Ok(None);
    }
    match DateTime::<Utc>::from_timestamp_millis(ms) {
        Some(t) => Ok(Some(t)),
        None => Err(format!("{field} timestamp out of range: {ms}")),
    }
}

/// Escapes newlines, carriage returns and backslashes so free text stays on
/// one journal line.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out
}

/// Inverse of [`escape`]; unknown escapes pass through literally.
fn unescape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}
