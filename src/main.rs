//! snapgc: snapshot garbage collector daemon.
//!
//! Assembles the journal catalog, filesystem storage and file-lock elector,
//! then runs GC passes once or on an interval.

use clap::Parser;
use std::sync::Arc;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use snapgc::{Args, Config, FileLockElector, FsStorageBackend, GcEngine, JournalCatalog};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Parse command-line arguments
    let args = Args::parse();

    // Set up logging
    let log_level = if args.debug {
        Level::DEBUG
    } else if args.silent {
        Level::ERROR
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let config = Config::from(args);

    // Assemble the adapters
    let catalog = Arc::new(JournalCatalog::open(config.journal.clone()).await?);
    let storage = Arc::new(FsStorageBackend::new(config.snapshot_root.clone()).await?);

    let mut engine = GcEngine::new(
        catalog,
        storage,
        config.policy.clone(),
        config.options.clone(),
    );
    if let Some(lock_file) = &config.lock_file {
        engine = engine.with_elector(Arc::new(FileLockElector::new(lock_file.clone())));
    }

    // Sweep records a crashed pass left mid-deletion.
    let recovered = engine.recover_interrupted().await?;
    if recovered > 0 {
        info!("recovered {recovered} snapshots stuck in Deleting");
    }

    if config.once {
        let metrics = engine.run_once().await?;
        if config.json {
            println!("{}", serde_json::to_string_pretty(&metrics)?);
        } else {
            info!(?metrics, "gc pass complete");
        }
        return Ok(());
    }

    info!(
        "snapgc starting; journal={} interval={}s",
        config.journal.display(),
        config.interval_secs
    );
    engine
        .run(std::time::Duration::from_secs(config.interval_secs))
        .await;
    Ok(())
}
