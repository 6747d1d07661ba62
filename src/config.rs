//! Retention policy, GC options and CLI configuration.

use chrono::Duration;
use clap::Parser;
use std::path::PathBuf;

/// Default number of most-recent snapshots kept regardless of age.
pub const DEFAULT_KEEP_LAST_N: usize = 10;

/// Default retention window in days.
pub const DEFAULT_MAX_AGE_DAYS: i64 = 30;

/// Default tombstone grace period in days.
pub const DEFAULT_GRACE_PERIOD_DAYS: i64 = 7;

/// Default inactivity window in days.
pub const DEFAULT_INACTIVE_TIMEOUT_DAYS: i64 = 7;

/// Default cap on hard deletes per pass.
pub const DEFAULT_MAX_DELETES_PER_RUN: usize = 1000;

/// Default payload-delete batch size.
pub const DEFAULT_BATCH_DELETE_SIZE: usize = 50;

/// Default failure count that moves a record to Quarantined.
pub const DEFAULT_MAX_DELETE_FAILURES: u32 = 5;

/// Default base for the exponential retry backoff, in seconds.
pub const DEFAULT_BASE_RETRY_BACKOFF_SECS: i64 = 10;

/// Which snapshots must survive a GC pass.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    /// The N most recently created snapshots are always kept.
    pub keep_last_n: usize,
    /// Snapshots younger than this are always kept.
    pub max_age: Duration,
    /// Checkpointing flags; carried for the surrounding system, not consumed
    /// by the GC core.
    pub enable_checkpointing: bool,
    pub checkpoint_interval: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            keep_last_n: DEFAULT_KEEP_LAST_N,
            max_age: Duration::days(DEFAULT_MAX_AGE_DAYS),
            enable_checkpointing: false,
            checkpoint_interval: Duration::days(7),
        }
    }
}

/// Tuning knobs for a GC pass.
#[derive(Debug, Clone)]
pub struct GcOptions {
    /// Report candidates without mutating anything.
    pub dry_run: bool,
    /// Enables the Active→Tombstoned stage.
    pub enable_tombstone_stage: bool,
    /// Enables the Tombstoned→Deleted stage.
    pub enable_hard_delete_stage: bool,
    /// Unreferenced records idle longer than this emit an inactivity signal.
    pub inactive_timeout: Duration,
    /// Delay between tombstoning and hard-delete eligibility.
    pub grace_period: Duration,
    /// Cap on hard deletes in a single pass.
    pub max_deletes_per_run: usize,
    /// Payload deletions per storage batch call.
    pub batch_delete_size: usize,
    /// Delete failures tolerated before quarantining a record.
    pub max_delete_failures_before_quarantine: u32,
    /// Base of the exponential retry backoff.
    pub base_retry_backoff: Duration,
}

impl Default for GcOptions {
    fn default() -> Self {
        Self {
            dry_run: false,
            enable_tombstone_stage: true,
            enable_hard_delete_stage: true,
            inactive_timeout: Duration::days(DEFAULT_INACTIVE_TIMEOUT_DAYS),
            grace_period: Duration::days(DEFAULT_GRACE_PERIOD_DAYS),
            max_deletes_per_run: DEFAULT_MAX_DELETES_PER_RUN,
            batch_delete_size: DEFAULT_BATCH_DELETE_SIZE,
            max_delete_failures_before_quarantine: DEFAULT_MAX_DELETE_FAILURES,
            base_retry_backoff: Duration::seconds(DEFAULT_BASE_RETRY_BACKOFF_SECS),
        }
    }
}

/// Command-line arguments for the GC daemon.
#[derive(Parser, Debug, Clone)]
#[command(name = "snapgc")]
#[command(about = "Snapshot garbage collector")]
#[command(version)]
pub struct Args {
    /// Path to the catalog journal file.
    #[arg(long, default_value = "catalog.log")]
    pub journal: PathBuf,

    /// Root directory holding snapshot payloads.
    #[arg(long, default_value = "snapshots")]
    pub snapshot_root: PathBuf,

    /// Leader-election lock file. Omit to run without an elector.
    #[arg(long)]
    pub lock_file: Option<PathBuf>,

    /// Run a single pass and exit.
    #[arg(long)]
    pub once: bool,

    /// Seconds between passes when running as a daemon.
    #[arg(long, default_value_t = 300)]
    pub interval_secs: u64,

    /// Report candidates without mutating anything.
    #[arg(long)]
    pub dry_run: bool,

    /// Number of most-recent snapshots always kept.
    #[arg(long, default_value_t = DEFAULT_KEEP_LAST_N)]
    pub keep_last_n: usize,

    /// Retention window in days.
    #[arg(long, default_value_t = DEFAULT_MAX_AGE_DAYS)]
    pub max_age_days: i64,

    /// Tombstone grace period in hours.
    #[arg(long, default_value_t = DEFAULT_GRACE_PERIOD_DAYS * 24)]
    pub grace_period_hours: i64,

    /// Disable the tombstone stage.
    #[arg(long)]
    pub no_tombstone: bool,

    /// Disable the hard-delete stage.
    #[arg(long)]
    pub no_hard_delete: bool,

    /// Cap on hard deletes per pass.
    #[arg(long, default_value_t = DEFAULT_MAX_DELETES_PER_RUN)]
    pub max_deletes_per_run: usize,

    /// Payload deletions per storage batch call.
    #[arg(long, default_value_t = DEFAULT_BATCH_DELETE_SIZE)]
    pub batch_delete_size: usize,

    /// Print pass metrics as JSON on stdout.
    #[arg(long)]
    pub json: bool,

    /// Enable debug logging.
    #[arg(long, short = 'd')]
    pub debug: bool,

    /// Enable silent mode (errors only).
    #[arg(long, short = 's')]
    pub silent: bool,
}

/// Daemon configuration derived from command-line arguments.
#[derive(Debug, Clone)]
pub struct Config {
    pub journal: PathBuf,
    pub snapshot_root: PathBuf,
    pub lock_file: Option<PathBuf>,
    pub once: bool,
    pub interval_secs: u64,
    pub json: bool,
    pub policy: RetentionPolicy,
    pub options: GcOptions,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        let policy = RetentionPolicy {
            keep_last_n: args.keep_last_n,
            max_age: Duration::days(args.max_age_days),
            ..RetentionPolicy::default()
        };
        let options = GcOptions {
            dry_run: args.dry_run,
            enable_tombstone_stage: !args.no_tombstone,
            enable_hard_delete_stage: !args.no_hard_delete,
            grace_period: Duration::hours(args.grace_period_hours),
            max_deletes_per_run: args.max_deletes_per_run,
            batch_delete_size: args.batch_delete_size,
            ..GcOptions::default()
        };
        Self {
            journal: args.journal,
            snapshot_root: args.snapshot_root,
            lock_file: args.lock_file,
            once: args.once,
            interval_secs: args.interval_secs,
            json: args.json,
            policy,
            options,
        }
    }
}
