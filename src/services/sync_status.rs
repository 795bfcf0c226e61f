//! Sync status service for tracking ingestion runs
//!
//! Keeps one row per periodic job so a restarted server does not immediately
//! hammer the upstream API again.

use chrono::{Duration, NaiveDateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set};

use crate::entities::sync_status::{self, Entity as SyncStatus};

/// Job names for tracking sync status
pub mod jobs {
    pub const SALES_INGESTION: &str = "sales_ingestion";
}

/// Default minimum intervals between runs (in seconds)
pub mod intervals {
    pub const SALES_INGESTION: i32 = 3600; // 1 hour
}

pub async fn get_status(
    db: &DatabaseConnection,
    job_name: &str,
) -> Result<Option<sync_status::Model>, sea_orm::DbErr> {
    SyncStatus::find()
        .filter(sync_status::Column::JobName.eq(job_name))
        .one(db)
        .await
}

/// Whether enough time passed since the last successful run.
pub fn is_due(record: Option<&sync_status::Model>, now: NaiveDateTime) -> bool {
    let Some(record) = record else {
        return true;
    };
    let Some(last_success) = record.last_success_at else {
        return true;
    };

    now.signed_duration_since(last_success) >= Duration::seconds(record.min_interval_secs as i64)
}

/// Check if a job should run based on its last successful run
pub async fn should_sync(
    db: &DatabaseConnection,
    job_name: &str,
) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
    let status = get_status(db, job_name).await?;
    let now = Utc::now().naive_utc();
    let due = is_due(status.as_ref(), now);

    match status.as_ref().and_then(|s| s.last_success_at) {
        None => tracing::info!("[{}] No previous successful run, will sync", job_name),
        Some(last_success) => {
            let elapsed = now.signed_duration_since(last_success).num_seconds();
            if due {
                tracing::info!("[{}] Last run was {}s ago, will sync", job_name, elapsed);
            } else {
                tracing::info!("[{}] Skipping sync - last run was {}s ago", job_name, elapsed);
            }
        }
    }

    Ok(due)
}

/// Record a successful run
pub async fn record_success(
    db: &DatabaseConnection,
    job_name: &str,
    interval_secs: i32,
    run_id: &str,
    records: u64,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let now = Utc::now().naive_utc();
    let records = records.min(i64::MAX as u64) as i64;

    match get_status(db, job_name).await? {
        Some(record) => {
            let success_count = record.success_count + 1;
            let mut active_model: sync_status::ActiveModel = record.into();
            active_model.last_run_id = Set(Some(run_id.to_string()));
            active_model.last_success_at = Set(Some(now));
            active_model.last_attempt_at = Set(Some(now));
            active_model.last_error = Set(None);
            active_model.last_records = Set(records);
            active_model.success_count = Set(success_count);
            active_model.min_interval_secs = Set(interval_secs);
            active_model.update(db).await?;
        }
        None => {
            let new_record = sync_status::ActiveModel {
                job_name: Set(job_name.to_string()),
                last_run_id: Set(Some(run_id.to_string())),
                last_success_at: Set(Some(now)),
                last_attempt_at: Set(Some(now)),
                last_error: Set(None),
                last_records: Set(records),
                success_count: Set(1),
                error_count: Set(0),
                min_interval_secs: Set(interval_secs),
                ..Default::default()
            };
            new_record.insert(db).await?;
        }
    }

    tracing::debug!("[{}] Recorded successful run {}", job_name, run_id);
    Ok(())
}

/// Record a failed run
pub async fn record_failure(
    db: &DatabaseConnection,
    job_name: &str,
    interval_secs: i32,
    error: &str,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let now = Utc::now().naive_utc();

    match get_status(db, job_name).await? {
        Some(record) => {
            let error_count = record.error_count + 1;
            let mut active_model: sync_status::ActiveModel = record.into();
            active_model.last_attempt_at = Set(Some(now));
            active_model.last_error = Set(Some(error.to_string()));
            active_model.error_count = Set(error_count);
            active_model.min_interval_secs = Set(interval_secs);
            active_model.update(db).await?;
        }
        None => {
            let new_record = sync_status::ActiveModel {
                job_name: Set(job_name.to_string()),
                last_success_at: Set(None),
                last_attempt_at: Set(Some(now)),
                last_error: Set(Some(error.to_string())),
                success_count: Set(0),
                error_count: Set(1),
                min_interval_secs: Set(interval_secs),
                ..Default::default()
            };
            new_record.insert(db).await?;
        }
    }

    tracing::debug!("[{}] Recorded failed run: {}", job_name, error);
    Ok(())
}
