//! Item price history handler
//!
//! GET /api/price_history/{item_name}

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use tracing::{error, info};

use crate::AppState;
use crate::models::ErrorResponse;
use crate::models::price_history::{PriceHistoryQuery, PriceHistoryResponse};
use crate::services::price_history::{self, PriceHistoryFilter};

/// GET /api/price_history/{item_name}
///
/// Sales of one exact item name sorted by time, with per-day avg/min/max.
///
/// # Response
/// - 200: Points and daily aggregates (empty when the item is unknown)
/// - 400: Invalid actor_role
/// - 500: Database error
pub async fn get_price_history(
    State(state): State<AppState>,
    Path(item_name): Path<String>,
    Query(query): Query<PriceHistoryQuery>,
) -> Result<Json<PriceHistoryResponse>, (StatusCode, Json<ErrorResponse>)> {
    info!(item_name = %item_name, "Fetching item price history");

    let actor_role = query.validate().map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(e, "INVALID_PARAMETER")),
        )
    })?;

    let filter = PriceHistoryFilter {
        transaction_type: query.transaction_type.clone(),
        actor_role,
        exclude_incomplete: query.exclude_incomplete,
    };

    let rows = price_history::load_points(&state.db, &item_name, &filter)
        .await
        .map_err(|e| {
            error!(error = %e, "Database error loading price history");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new(
                    format!("Database error: {}", e),
                    "DATABASE_ERROR",
                )),
            )
        })?;

    Ok(Json(PriceHistoryResponse {
        item_name,
        points: rows.iter().map(price_history::to_point).collect(),
        daily: price_history::aggregate_daily(&rows),
    }))
}
