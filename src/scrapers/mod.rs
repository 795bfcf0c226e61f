pub mod record;
pub mod retry;
pub mod sales_api;

use std::time::Duration;

use async_trait::async_trait;

use crate::ingestion::error::IngestError;
use record::RawSaleRecord;

pub const DEFAULT_BASE_URL: &str = "https://api.phygitals.com/api/marketplace/sales";
pub const USER_AGENT: &str = "sales-indexer/0.1 (+incremental ingestion)";

/// Upper bound on any single request
pub const MAX_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
pub struct ScraperConfig {
    pub base_url: String,
    pub items_per_page: u32,
    pub timeout: Duration,
    pub retry_max: u32,
    pub retry_delay_ms: u64,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            items_per_page: 10,
            timeout: MAX_FETCH_TIMEOUT,
            retry_max: 3,
            retry_delay_ms: 200,
        }
    }
}

/// One page of upstream sales.
///
/// Never fails: exhausted retries surface as an empty page, which callers
/// treat as "no data for this page".
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, page: u32, limit: u32) -> Vec<RawSaleRecord>;
}

/// Builds an isolated [`PageSource`] per worker so no HTTP session is shared.
pub trait PageSourceFactory: Send + Sync {
    fn create(&self, worker_id: usize) -> Result<Box<dyn PageSource>, IngestError>;
}
