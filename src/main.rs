use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use gloss_video_sync::{
    PgGlossDictionary, S3VideoStore, SyncConfig, SyncReport, Synchronizer, logging,
};

#[tokio::main]
async fn main() -> ExitCode {
    if let Err(e) = logging::init() {
        eprintln!("Failed to initialise logging: {}", e);
    }

    match run().await {
        Ok(report) => {
            print_summary(&report);
            info!("Sync completed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Script failed: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<SyncReport> {
    let config = SyncConfig::from_env()?;
    info!("Config: {}", serde_json::to_string(&config)?);

    let store = S3VideoStore::connect(&config).await;
    info!("Connecting to {}", config.redacted_database_url());
    let dictionary = PgGlossDictionary::connect(&config.database_url)
        .await
        .context("Database error")?;

    let mut synchronizer = Synchronizer::new(store, dictionary);
    let result = synchronizer.sync().await;

    // Release the connection whether or not the pass succeeded
    let (_, dictionary) = synchronizer.into_parts();
    if let Err(e) = dictionary.close().await {
        warn!("{:#}", e);
    }

    result.context("Database error")
}

fn print_summary(report: &SyncReport) {
    let stats = &report.stats;

    info!(
        "Summary: {} renamed, {} skipped, {} failed out of {} records",
        stats.succeeded,
        stats.skipped(),
        stats.failed,
        stats.total
    );

    for failure in report.failures() {
        warn!(id = failure.id, "✗ {:?}: {:?}", failure.video_file_name, failure.outcome);
    }

    if stats.failed == 0 {
        info!("✓ All records are in sync");
    } else if stats.succeeded > 0 {
        warn!("⚠ Some records were renamed, but there were errors with others.");
    } else {
        warn!("✗ No records were renamed.");
    }

    match serde_json::to_string(stats) {
        Ok(json) => info!("Stats: {}", json),
        Err(e) => warn!("Could not serialize stats: {}", e),
    }
}
