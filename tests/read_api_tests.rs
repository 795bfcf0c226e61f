mod common;

use chrono::Utc;
use rust_decimal_macros::dec;
use sales_indexer_backend::ingestion::ProgressTracker;
use sea_orm::{DatabaseBackend, MockDatabase};

use crate::common::{build_test_router, count_row, get_json, sale_row, string_row};

#[tokio::test]
async fn test_list_transactions_paginates() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![
            sale_row(2, "2025-03-02T10:00:00Z", dec!(3.50), "Golden Ticket"),
            sale_row(1, "2025-03-01T10:00:00Z", dec!(1.25), "Silver Ticket"),
        ]])
        .append_query_results([vec![count_row(12)]])
        .into_connection();

    let app = build_test_router(db, dir.path());
    let (status, json) = get_json(app, "/api/transactions?page=2&per_page=5").await;

    assert_eq!(status, 200);
    assert_eq!(json["total"], 12);
    assert_eq!(json["page"], 2);
    assert_eq!(json["perPage"], 5);
    assert_eq!(json["pages"], 3);

    let data = json["data"].as_array().unwrap();
    assert_eq!(data.len(), 2);
    assert_eq!(data[0]["itemName"], "Golden Ticket");
    assert_eq!(data[0]["price"], 3.5);
    assert_eq!(data[1]["transactionTime"], "2025-03-01T10:00:00Z");
}

#[tokio::test]
async fn test_list_transactions_rejects_oversized_page() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let app = build_test_router(db, dir.path());
    let (status, json) = get_json(app, "/api/transactions?per_page=500").await;

    assert_eq!(status, 400);
    assert_eq!(json["code"], "INVALID_PARAMETER");
}

#[tokio::test]
async fn test_list_transactions_rejects_page_past_u64_offset() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let app = build_test_router(db, dir.path());
    let (status, json) =
        get_json(app, "/api/transactions?page=18446744073709551615&per_page=200").await;

    assert_eq!(status, 400);
    assert_eq!(json["code"], "INVALID_PARAMETER");
}

#[tokio::test]
async fn test_list_transactions_rejects_unknown_sort() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let app = build_test_router(db, dir.path());
    let (status, _) = get_json(app, "/api/transactions?sort_by=amount").await;

    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_filters_are_cached() {
    let dir = tempfile::tempdir().unwrap();
    // Only one round of results: a second database hit would fail
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![string_row("transaction_type", "sale")]])
        .append_query_results([vec![
            string_row("actor_role", "automated"),
            string_row("actor_role", "human"),
        ]])
        .append_query_results([vec![
            string_row("item_name", "Golden Ticket"),
            string_row("item_name", "Silver Ticket"),
        ]])
        .into_connection();

    let app = build_test_router(db, dir.path());

    let (status, first) = get_json(app.clone(), "/api/filters").await;
    assert_eq!(status, 200);
    assert_eq!(first["types"], serde_json::json!(["sale"]));
    assert_eq!(first["actorRoles"], serde_json::json!(["automated", "human"]));
    assert_eq!(first["names"].as_array().unwrap().len(), 2);

    let (status, second) = get_json(app, "/api/filters").await;
    assert_eq!(status, 200);
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_price_history_groups_by_day() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![
            sale_row(1, "2025-03-01T09:00:00Z", dec!(2.00), "Golden Ticket"),
            sale_row(2, "2025-03-01T18:00:00Z", dec!(4.00), "Golden Ticket"),
            sale_row(3, "2025-03-03T12:00:00Z", dec!(10.00), "Golden Ticket"),
        ]])
        .into_connection();

    let app = build_test_router(db, dir.path());
    let (status, json) = get_json(app, "/api/price_history/Golden%20Ticket").await;

    assert_eq!(status, 200);
    assert_eq!(json["itemName"], "Golden Ticket");
    assert_eq!(json["points"].as_array().unwrap().len(), 3);

    let daily = json["daily"].as_array().unwrap();
    assert_eq!(daily.len(), 2);
    assert_eq!(daily[0]["date"], "2025-03-01");
    assert_eq!(daily[0]["avg"], 3.0);
    assert_eq!(daily[0]["min"], 2.0);
    assert_eq!(daily[0]["max"], 4.0);
    assert_eq!(daily[0]["count"], 2);
    assert_eq!(daily[1]["date"], "2025-03-03");
}

#[tokio::test]
async fn test_price_history_rejects_unknown_role() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let app = build_test_router(db, dir.path());
    let (status, _) = get_json(app, "/api/price_history/Anything?actor_role=robot").await;

    assert_eq!(status, 400);
}

#[tokio::test]
async fn test_health_without_progress_is_degraded() {
    let dir = tempfile::tempdir().unwrap();
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let app = build_test_router(db, dir.path());
    let (status, json) = get_json(app, "/health").await;

    assert_eq!(status, 200);
    assert_eq!(json["stale"], true);
    assert_eq!(json["status"], "degraded");
    assert!(json["progress"].is_null());
}

#[tokio::test]
async fn test_health_reports_fresh_progress() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ProgressTracker::new(dir.path().join("scraping_progress.json"));
    tracker.record(3, 4, 120, Utc::now()).await.unwrap();

    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let app = build_test_router(db, dir.path());
    let (status, json) = get_json(app, "/health").await;

    assert_eq!(status, 200);
    assert_eq!(json["stale"], false);
    assert_eq!(json["database"], true);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["progress"]["unitsCompleted"], 3);
    assert_eq!(json["progress"]["completionFraction"], 75.0);
}

#[tokio::test]
async fn test_health_flags_old_progress() {
    let dir = tempfile::tempdir().unwrap();
    let tracker = ProgressTracker::new(dir.path().join("scraping_progress.json"));
    let hour_ago = Utc::now() - chrono::Duration::hours(1);
    tracker.record(1, 4, 10, hour_ago).await.unwrap();

    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let app = build_test_router(db, dir.path());
    let (_, json) = get_json(app, "/health").await;

    assert_eq!(json["stale"], true);
    assert_eq!(json["status"], "degraded");
}
