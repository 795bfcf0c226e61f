use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::Body,
    http::{Request, StatusCode},
};
use chrono::Utc;
use rust_decimal::Decimal;
use sales_indexer_backend::entities::sales_transactions;
use sales_indexer_backend::ingestion::ProgressTracker;
use sales_indexer_backend::{AppState, router};
use sea_orm::{DatabaseConnection, Value};
use serde_json::Value as Json;
use tower::ServiceExt;

pub const STALE_AFTER: Duration = Duration::from_secs(600);

/// Read API wired to a mock connection and a progress file under `dir`.
pub fn build_test_router(db: DatabaseConnection, dir: &Path) -> Router {
    let progress = ProgressTracker::new(dir.join("scraping_progress.json"));
    router(AppState::new(Arc::new(db), progress, STALE_AFTER))
}

pub fn sale_row(id: i64, time: &str, price: Decimal, name: &str) -> sales_transactions::Model {
    let now = Utc::now().naive_utc();
    sales_transactions::Model {
        id,
        transaction_time: time.to_string(),
        amount_raw: "1000000".to_string(),
        price,
        transaction_type: "sale".to_string(),
        actor_role: "human".to_string(),
        from_address: "0xseller".to_string(),
        to_address: "0xbuyer".to_string(),
        item_name: name.to_string(),
        source_page: 0,
        date_batch: 20250301,
        created_at: now,
        updated_at: now,
    }
}

/// Row answering a `PaginatorTrait::count` query
pub fn count_row(n: i64) -> BTreeMap<&'static str, Value> {
    BTreeMap::from([("num_items", Value::BigInt(Some(n)))])
}

pub fn string_row(column: &'static str, value: &str) -> BTreeMap<&'static str, Value> {
    BTreeMap::from([(column, Value::String(Some(Box::new(value.to_string()))))])
}

pub async fn get_json(app: Router, uri: &str) -> (StatusCode, Json) {
    let response = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: Json = serde_json::from_slice(&body).unwrap();

    (status, json)
}
