//! Leader election for mutually exclusive GC passes.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::io::AsyncWriteExt;
use tracing::warn;

/// Mutually-exclusive "I may act now" handshake.
///
/// At most one live holder exists per dataset; the engine acquires once per
/// pass and releases on every exit path.
#[async_trait]
pub trait LeaderElector: Send + Sync {
    /// Attempts to become the single live GC instance. Returns false when
    /// another holder exists; that is a normal outcome, not an error.
    async fn try_acquire(&self) -> bool;

    /// Releases leadership. Idempotent and side-effect-free when leadership
    /// was never acquired.
    async fn release(&self);
}

/// File-based leader elector: the lock is the file's presence, created with
/// create-new semantics and removed on release.
///
/// A holder that crashes leaves a stale lock file behind; this elector does
/// not detect that, and the operator must remove the file before another
/// instance can acquire leadership.
pub struct FileLockElector {
    path: PathBuf,
    acquired: AtomicBool,
}

impl FileLockElector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            acquired: AtomicBool::new(false),
        }
    }
}

#[async_trait]
impl LeaderElector for FileLockElector {
    async fn try_acquire(&self) -> bool {
        let mut file = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
            .await
        {
            Ok(file) => file,
            Err(_) => return false,
        };

        // Contents are advisory; only presence matters.
        let _ = file
            .write_all(format!("{}\n", std::process::id()).as_bytes())
            .await;
        self.acquired.store(true, Ordering::SeqCst);
        true
    }

    async fn release(&self) {
        if !self.acquired.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Err(err) = tokio::fs::remove_file(&self.path).await {
            warn!("failed to remove leader lock {:?}: {err}", self.path);
        }
    }
}

impl Drop for FileLockElector {
    fn drop(&mut self) {
        // Best-effort cleanup for holders that exit without releasing.
        if self.acquired.load(Ordering::SeqCst) {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
