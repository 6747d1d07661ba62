//! snapgc: a snapshot garbage collector with a journaled catalog.
//!
//! Reclaims storage held by snapshots that are no longer referenced, pinned,
//! leased or inside the retention window. Reclamation is a two-stage state
//! machine — tombstone, then hard delete after a grace period — driven by
//! [`GcEngine::run_once`], with every state change journaled through the
//! catalog so interrupted passes reconcile on the next run.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use snapgc::{GcEngine, GcOptions, MemoryCatalog, MemoryStorageBackend, RetentionPolicy};
//!
//! #[tokio::main]
//! async fn main() {
//!     let catalog = Arc::new(MemoryCatalog::new());
//!     let storage = Arc::new(MemoryStorageBackend::new());
//!     let engine = GcEngine::new(
//!         catalog,
//!         storage,
//!         RetentionPolicy::default(),
//!         GcOptions::default(),
//!     );
//!     let metrics = engine.run_once().await.unwrap();
//!     println!("tombstoned {}, deleted {}", metrics.tombstoned, metrics.deleted);
//! }
//! ```

pub mod catalog;
pub mod config;
pub mod corruption;
pub mod elector;
pub mod error;
pub mod gc;
pub mod models;
pub mod storage;

// Re-exports for convenience
pub use catalog::{JournalCatalog, MemoryCatalog, SnapshotCatalog};
pub use config::{Args, Config, GcOptions, RetentionPolicy};
pub use corruption::{CorruptionTracker, MemoryCorruptionTracker};
pub use elector::{FileLockElector, LeaderElector};
pub use error::{GcError, GcResult};
pub use gc::{GcEngine, GcMetrics};
pub use models::{GcEvent, GcEventType, SnapshotRecord, SnapshotState};
pub use storage::{BatchDeleteOutcome, FsStorageBackend, MemoryStorageBackend, StorageBackend};
