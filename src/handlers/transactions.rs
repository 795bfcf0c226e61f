//! Transaction listing handlers
//!
//! GET /api/transactions and GET /api/filters.

use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
};
use sea_orm::sea_query::{Expr, Func};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, Order, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Select,
};
use tracing::{debug, error, info};

use crate::AppState;
use crate::entities::{prelude::SalesTransactions, sales_transactions};
use crate::models::ErrorResponse;
use crate::models::transaction::{
    FiltersResponse, ListParams, SortDir, SortField, TransactionEntry, TransactionListResponse,
    TransactionQuery,
};

/// Key of the single entry held by the filter cache
pub const FILTERS_CACHE_KEY: &str = "filters";

/// Cap on distinct names returned by /api/filters
const MAX_FILTER_NAMES: u64 = 100;

type ApiError = (StatusCode, Json<ErrorResponse>);

fn database_error(e: DbErr) -> ApiError {
    error!(error = %e, "Database error in transactions handler");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(format!("Database error: {}", e), "DATABASE_ERROR")),
    )
}

/// GET /api/transactions
///
/// # Query Parameters
/// - `page`, `per_page` (default 1 and 50, max 200)
/// - `min_price`, `max_price`, `type`, `actor_role`, `from_address`, `to_address`
/// - `name`: case-insensitive substring of the item name
/// - `sort_by`: time, price, name, type (default: time)
/// - `sort_dir`: asc, desc (default: desc)
///
/// # Response
/// - 200: `{data, total, page, perPage, pages}`
/// - 400: Invalid parameters
/// - 500: Database error
pub async fn list_transactions(
    State(state): State<AppState>,
    Query(query): Query<TransactionQuery>,
) -> Result<Json<TransactionListResponse>, ApiError> {
    let params = query.validate().map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(e, "INVALID_PARAMETER")),
        )
    })?;

    info!(
        page = params.page,
        per_page = params.per_page,
        "Transaction list request received"
    );

    let filtered = apply_filters(SalesTransactions::find(), &query, &params);

    let rows = apply_sort(filtered.clone(), &params)
        .offset(params.offset)
        .limit(params.per_page)
        .all(state.db.as_ref())
        .await
        .map_err(database_error)?;

    let total = filtered
        .count(state.db.as_ref())
        .await
        .map_err(database_error)?;
    let pages = total.div_ceil(params.per_page);

    debug!(total, returned = rows.len(), "Transaction list served");

    Ok(Json(TransactionListResponse {
        data: rows.into_iter().map(TransactionEntry::from).collect(),
        total,
        page: params.page,
        per_page: params.per_page,
        pages,
    }))
}

fn apply_filters(
    mut select: Select<SalesTransactions>,
    query: &TransactionQuery,
    params: &ListParams,
) -> Select<SalesTransactions> {
    if let Some(min) = query.min_price {
        select = select.filter(sales_transactions::Column::Price.gte(min));
    }
    if let Some(max) = query.max_price {
        select = select.filter(sales_transactions::Column::Price.lte(max));
    }
    if let Some(tx_type) = non_empty(&query.transaction_type) {
        select = select.filter(sales_transactions::Column::TransactionType.eq(tx_type));
    }
    if let Some(role) = params.actor_role {
        select = select.filter(sales_transactions::Column::ActorRole.eq(role.as_str()));
    }
    if let Some(from) = non_empty(&query.from_address) {
        select = select.filter(sales_transactions::Column::FromAddress.eq(from));
    }
    if let Some(to) = non_empty(&query.to_address) {
        select = select.filter(sales_transactions::Column::ToAddress.eq(to));
    }
    if let Some(name) = non_empty(&query.name) {
        let pattern = format!("%{}%", name.to_lowercase());
        select = select.filter(
            Expr::expr(Func::lower(Expr::col(sales_transactions::Column::ItemName))).like(pattern),
        );
    }
    select
}

fn apply_sort(select: Select<SalesTransactions>, params: &ListParams) -> Select<SalesTransactions> {
    let column = match params.sort_by {
        SortField::Time => sales_transactions::Column::TransactionTime,
        SortField::Price => sales_transactions::Column::Price,
        SortField::Name => sales_transactions::Column::ItemName,
        SortField::Type => sales_transactions::Column::TransactionType,
    };
    let order = match params.sort_dir {
        SortDir::Asc => Order::Asc,
        SortDir::Desc => Order::Desc,
    };

    select
        .order_by(column, order.clone())
        .order_by(sales_transactions::Column::Id, order)
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// GET /api/filters
///
/// Distinct values for the listing dropdowns, cached for five minutes.
pub async fn get_filters(
    State(state): State<AppState>,
) -> Result<Json<FiltersResponse>, ApiError> {
    if let Some(cached) = state.filter_cache.get(FILTERS_CACHE_KEY).await {
        debug!("Cache hit for {}", FILTERS_CACHE_KEY);
        return Ok(Json(cached));
    }

    let filters = load_filters(&state.db).await.map_err(database_error)?;
    state
        .filter_cache
        .insert(FILTERS_CACHE_KEY, filters.clone())
        .await;

    Ok(Json(filters))
}

async fn load_filters(db: &DatabaseConnection) -> Result<FiltersResponse, DbErr> {
    let types = distinct_values(db, sales_transactions::Column::TransactionType, None).await?;
    let actor_roles = distinct_values(db, sales_transactions::Column::ActorRole, None).await?;
    let names =
        distinct_values(db, sales_transactions::Column::ItemName, Some(MAX_FILTER_NAMES)).await?;

    Ok(FiltersResponse {
        types,
        actor_roles,
        names,
    })
}

async fn distinct_values(
    db: &DatabaseConnection,
    column: sales_transactions::Column,
    limit: Option<u64>,
) -> Result<Vec<String>, DbErr> {
    SalesTransactions::find()
        .select_only()
        .column(column)
        .distinct()
        .filter(column.ne(""))
        .order_by_asc(column)
        .limit(limit)
        .into_tuple::<String>()
        .all(db)
        .await
}
