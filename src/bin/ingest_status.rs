use std::env;
use std::sync::Arc;

use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sales_indexer_backend::ingestion::{IngestConfig, ProgressTracker};
use sales_indexer_backend::services::sales_store::{SalesStore, SeaOrmConnector, SeaOrmSalesStore};
use sales_indexer_backend::services::sync_status::{self, jobs};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,sales_indexer_backend=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let config = IngestConfig::from_env();
    let tracker = ProgressTracker::new(config.progress_file.clone());

    println!("Progress file: {}", tracker.path().display());
    match tracker.load().await? {
        None => println!("  no run has recorded progress yet"),
        Some(snapshot) => {
            let stale = snapshot.is_stale(Utc::now(), config.progress_stale_after);
            println!(
                "  {}/{} units ({:.2}%), {} records, updated {}{}",
                snapshot.units_completed,
                snapshot.total_units,
                snapshot.completion_fraction,
                snapshot.records_so_far,
                snapshot.timestamp.to_rfc3339(),
                if stale { " [STALE]" } else { "" }
            );
        }
    }

    let database_url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;
    let db = Arc::new(SeaOrmConnector::new(database_url).connect_pool(1).await?);

    let stats = SeaOrmSalesStore::new(Arc::clone(&db)).get_stats().await?;
    println!("Store:");
    println!(
        "  {} transactions ({} automated, {} human)",
        stats.total_records, stats.automated_records, stats.human_records
    );
    println!("  {} scraped pages", stats.scraped_pages);
    if let (Some(page), Some(at)) = (stats.last_scraped_page, stats.last_scraped_at) {
        println!("  last scraped page {} at {}", page, at);
    }
    match &stats.date_range {
        Some(range) => println!("  dates {} .. {}", range.first_date, range.last_date),
        None => println!("  no dated transactions stored"),
    }

    match sync_status::get_status(&db, jobs::SALES_INGESTION).await? {
        None => println!("Scheduled job: never ran"),
        Some(status) => {
            println!(
                "Scheduled job: {} successes, {} failures",
                status.success_count, status.error_count
            );
            if let Some(at) = status.last_success_at {
                println!("  last success {}", at);
            }
            if let Some(error) = status.last_error {
                println!("  last error: {}", error);
            }
        }
    }

    Ok(())
}
