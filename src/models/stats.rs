//! Stats and health response models

use serde::{Deserialize, Serialize};

use crate::ingestion::ProgressSnapshot;
use crate::services::sales_store::StoreStats;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsResponse {
    #[serde(flatten)]
    pub store: StoreStats,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// "ok" or "degraded"
    pub status: String,
    pub database: bool,
    pub progress: Option<ProgressSnapshot>,
    /// Progress snapshot older than the configured threshold, or missing
    pub stale: bool,
}
