//! Store statistics and health

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode};
use chrono::Utc;
use tracing::{error, warn};

use crate::AppState;
use crate::models::ErrorResponse;
use crate::models::stats::{HealthResponse, StatsResponse};
use crate::services::sales_store::{SalesStore, SeaOrmSalesStore};

/// GET /api/stats
pub async fn get_stats(
    State(state): State<AppState>,
) -> Result<Json<StatsResponse>, (StatusCode, Json<ErrorResponse>)> {
    let store = SeaOrmSalesStore::new(Arc::clone(&state.db));

    let stats = store.get_stats().await.map_err(|e| {
        error!(error = %e, "Failed to compute store stats");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(e.to_string(), "DATABASE_ERROR")),
        )
    })?;

    Ok(Json(StatsResponse { store: stats }))
}

/// GET /health
///
/// Always 200; `status` is "degraded" when the database is unreachable or the
/// progress snapshot is stale.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let database = state.db.ping().await.is_ok();

    let progress = match state.progress.load().await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            warn!(error = %e, "Could not read progress snapshot");
            None
        }
    };

    let stale = progress
        .as_ref()
        .is_none_or(|p| p.is_stale(Utc::now(), state.progress_stale_after));

    let status = if database && !stale { "ok" } else { "degraded" };

    Json(HealthResponse {
        status: status.to_string(),
        database,
        progress,
        stale,
    })
}
