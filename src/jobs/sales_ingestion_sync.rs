//! Sales Ingestion Job
//!
//! Runs the incremental ingestion engine on an interval inside the API server.
//! Supports graceful shutdown via SIGINT: the running pass stops between pages
//! and flushes what it has.

use std::env;
use std::future::Future;
use std::sync::Arc;

use sea_orm::DatabaseConnection;
use tokio::sync::watch;
use tokio::time::{Duration as TokioDuration, interval};
use tracing::{error, info, warn};

use crate::ingestion::{IngestConfig, IngestionEngine, RunOptions};
use crate::services::sync_status::{self, intervals, jobs};

/// Environment variable enabling the job
pub const ENV_INGESTION_ENABLED: &str = "SALES_INGESTION_ENABLED";

/// Environment variable for the run interval
const ENV_INGESTION_INTERVAL: &str = "SALES_INGESTION_INTERVAL_SECS";

pub fn ingestion_enabled() -> bool {
    env::var(ENV_INGESTION_ENABLED)
        .map(|v| v.to_lowercase() == "true")
        .unwrap_or(false)
}

/// Start the sales ingestion job
///
/// # Environment Variables
///
/// * `SALES_INGESTION_INTERVAL_SECS` - Interval in seconds (default: 3600)
/// * every `SALES_*` ingestion setting, see [`IngestConfig`]
pub async fn start_sales_ingestion_job(db: Arc<DatabaseConnection>, database_url: String) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // One listener for the whole job, so a signal during a pass still reaches the workers
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Shutdown signal received, stopping sales ingestion job");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => error!("Could not listen for shutdown signal: {}", e),
        }
    });

    tokio::spawn(async move {
        let interval_secs: u64 = env::var(ENV_INGESTION_INTERVAL)
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|s| *s > 0)
            .unwrap_or(intervals::SALES_INGESTION as u64);
        let min_interval = i32::try_from(interval_secs).unwrap_or(intervals::SALES_INGESTION);

        let config = IngestConfig::from_env();
        info!(
            interval_secs,
            workers = config.worker_count,
            max_pages = config.max_pages,
            "Initializing sales ingestion job"
        );

        let engine = IngestionEngine::postgres(config, &database_url);
        let db = db.as_ref();
        let engine = &engine;

        run_schedule(
            TokioDuration::from_secs(interval_secs),
            shutdown_rx,
            move |pass_shutdown| async move {
                match sync_status::should_sync(db, jobs::SALES_INGESTION).await {
                    Ok(false) => return,
                    Ok(true) => {}
                    Err(e) => warn!("Could not read sync status, running anyway: {}", e),
                }
                run_once(db, engine, min_interval, pass_shutdown).await;
            },
        )
        .await;

        info!("Sales ingestion job stopped");
    });
}

/// Run `pass` on every tick until shutdown is signalled. Each pass gets its own
/// receiver, so a signal that arrives mid-pass is visible to it immediately.
pub async fn run_schedule<F, Fut>(period: TokioDuration, mut shutdown: watch::Receiver<bool>, mut pass: F)
where
    F: FnMut(watch::Receiver<bool>) -> Fut,
    Fut: Future<Output = ()>,
{
    let mut interval = interval(period);

    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            Ok(()) = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
            _ = interval.tick() => {
                pass(shutdown.clone()).await;
            }
        }
    }
}

async fn run_once(
    db: &DatabaseConnection,
    engine: &IngestionEngine,
    min_interval: i32,
    shutdown: watch::Receiver<bool>,
) {
    match engine.run(RunOptions::default(), shutdown).await {
        Ok(summary) => {
            info!(
                run_id = %summary.run_id,
                records = summary.records_extracted,
                persisted = summary.records_persisted,
                "Sales ingestion completed"
            );
            if let Err(e) = sync_status::record_success(
                db,
                jobs::SALES_INGESTION,
                min_interval,
                &summary.run_id,
                summary.records_persisted as u64,
            )
            .await
            {
                warn!("Failed to record sync success: {}", e);
            }
        }
        Err(e) => {
            error!(error = %e, "Sales ingestion failed");
            if let Err(e) =
                sync_status::record_failure(db, jobs::SALES_INGESTION, min_interval, &e.to_string())
                    .await
            {
                warn!("Failed to record sync failure: {}", e);
            }
        }
    }
}
