// src/lib.rs

use std::sync::Arc;
use std::time::Duration;

use axum::{Router, routing::get};
use moka::future::Cache;
use sea_orm::DatabaseConnection;

use ingestion::ProgressTracker;
use models::transaction::FiltersResponse;

/// How long /api/filters answers from memory
pub const FILTER_CACHE_TTL: Duration = Duration::from_secs(300);

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub progress: ProgressTracker,
    pub progress_stale_after: Duration,
    pub filter_cache: Cache<&'static str, FiltersResponse>,
}

impl AppState {
    pub fn new(
        db: Arc<DatabaseConnection>,
        progress: ProgressTracker,
        progress_stale_after: Duration,
    ) -> Self {
        let filter_cache = Cache::builder()
            .max_capacity(1)
            .time_to_live(FILTER_CACHE_TTL)
            .build();

        Self {
            db,
            progress,
            progress_stale_after,
            filter_cache,
        }
    }
}

/// Read API routes, without middleware.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::stats::health))
        .route("/api/stats", get(handlers::stats::get_stats))
        .route("/api/transactions", get(handlers::transactions::list_transactions))
        .route("/api/filters", get(handlers::transactions::get_filters))
        .route(
            "/api/price_history/{item_name}",
            get(handlers::price_history::get_price_history),
        )
        .with_state(state)
}

pub mod entities {
    pub mod prelude;
    pub mod sales_transactions;
    pub mod scraped_pages;
    pub mod sync_status;
}

pub mod services {
    pub mod price_history;
    pub mod sales_store;
    pub mod sync_status;
}

pub mod ingestion;
pub mod jobs;
pub mod scrapers;

pub mod models;
pub mod handlers;
