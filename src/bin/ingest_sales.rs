use std::env;

use tokio::sync::watch;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sales_indexer_backend::ingestion::{IngestConfig, IngestionEngine, RunOptions};

/// Positional page argument; anything unparseable means "use the default".
fn page_arg(args: &[String], index: usize, name: &str) -> Option<u32> {
    let raw = args.get(index)?;
    match raw.parse::<u32>() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!("Invalid {} '{}', using default", name, raw);
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sales_indexer_backend=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    // Usage: cargo run --bin ingest_sales [startPage] [maxPages]
    let args: Vec<String> = env::args().collect();
    let options = RunOptions {
        start_page: page_arg(&args, 1, "startPage").unwrap_or(0),
        max_pages: page_arg(&args, 2, "maxPages"),
    };

    let database_url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;
    let engine = IngestionEngine::postgres(IngestConfig::from_env(), &database_url);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received, finishing current pages");
            let _ = shutdown_tx.send(true);
        }
    });

    let summary = engine.run(options, shutdown_rx).await.inspect_err(|e| {
        tracing::error!(error = %e, "Sales ingestion aborted");
    })?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
