use std::env;
use std::error::Error;
use std::sync::Arc;

use sea_orm::Database;
use sea_orm_migration::MigratorTrait;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sales_indexer_backend::ingestion::{IngestConfig, ProgressTracker};
use sales_indexer_backend::jobs::sales_ingestion_sync::{ingestion_enabled, start_sales_ingestion_job};
use sales_indexer_backend::{AppState, router};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
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

    let database_url = env::var("DATABASE_URL").map_err(|_| "DATABASE_URL must be set")?;
    tracing::info!("Connecting to database...");
    let db = Arc::new(Database::connect(&database_url).await?);

    tracing::info!("Running migrations...");
    migration::Migrator::up(db.as_ref(), None).await?;

    let config = IngestConfig::from_env();

    if ingestion_enabled() {
        start_sales_ingestion_job(Arc::clone(&db), database_url.clone()).await;
    } else {
        tracing::info!("Sales ingestion job disabled");
    }

    let state = AppState::new(
        db,
        ProgressTracker::new(config.progress_file.clone()),
        config.progress_stale_after,
    );

    let app = router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
