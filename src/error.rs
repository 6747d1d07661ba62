//! Error types for catalog, storage and engine operations.

use thiserror::Error;

/// Errors surfaced by GC components.
///
/// Per-snapshot payload-delete failures are not errors at this level; the
/// engine records them against the snapshot and schedules a retry. Variants
/// here mean the pass itself cannot make progress.
#[derive(Debug, Error)]
pub enum GcError {
    /// Catalog I/O failed. The catalog's in-memory view never advances past
    /// the last durable write, so the pass must stop.
    #[error("catalog error: {0}")]
    Catalog(String),

    /// The journal contains a line that cannot be parsed.
    #[error("journal parse error: {0}")]
    JournalParse(String),

    /// Storage backend failed in a way that is not a per-payload outcome.
    #[error("storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl GcError {
    /// Creates a catalog error from a display-able cause.
    pub fn catalog(err: impl std::fmt::Display) -> Self {
        GcError::Catalog(err.to_string())
    }

    /// Creates a storage error from a display-able cause.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        GcError::Storage(err.to_string())
    }
}

/// Result type alias for GC operations.
pub type GcResult<T> = Result<T, GcError>;
