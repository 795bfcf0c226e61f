use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use serde::Deserialize;

use super::record::RawSaleRecord;
use super::retry::retry_linear;
use super::{MAX_FETCH_TIMEOUT, PageSource, PageSourceFactory, ScraperConfig, USER_AGENT};
use crate::ingestion::error::{FetchError, IngestError};

#[derive(Debug, Deserialize)]
struct SalesPage {
    sales: Option<Vec<RawSaleRecord>>,
}

/// Marketplace sales client. One instance per worker.
pub struct SalesApiClient {
    client: Client,
    config: ScraperConfig,
    worker_id: usize,
}

impl SalesApiClient {
    pub fn new(config: ScraperConfig, worker_id: usize) -> Result<Self, reqwest::Error> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .timeout(config.timeout.min(MAX_FETCH_TIMEOUT))
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .gzip(true)
            .deflate(true)
            .brotli(true)
            .build()?;

        Ok(Self {
            client,
            config,
            worker_id,
        })
    }

    /// Single attempt, no retries.
    pub async fn try_fetch_page(
        &self,
        page: u32,
        limit: u32,
    ) -> Result<Vec<RawSaleRecord>, FetchError> {
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[("limit", limit), ("page", page)])
            .send()
            .await
            .map_err(|source| FetchError::Transport { page, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                page,
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|source| FetchError::Transport { page, source })?;

        parse_sales_page(&body).map_err(|e| FetchError::Decode {
            page,
            message: e.to_string(),
        })
    }
}

fn parse_sales_page(body: &str) -> Result<Vec<RawSaleRecord>, serde_json::Error> {
    let parsed: SalesPage = serde_json::from_str(body)?;
    Ok(parsed.sales.unwrap_or_default())
}

#[async_trait]
impl PageSource for SalesApiClient {
    async fn fetch_page(&self, page: u32, limit: u32) -> Vec<RawSaleRecord> {
        let result = retry_linear(
            |_| self.try_fetch_page(page, limit),
            self.config.retry_max,
            Duration::from_millis(self.config.retry_delay_ms),
        )
        .await;

        match result {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    worker_id = self.worker_id,
                    page,
                    attempts = self.config.retry_max,
                    "Giving up on page: {}",
                    e
                );
                Vec::new()
            }
        }
    }
}

#[derive(Clone)]
pub struct SalesApiFactory {
    config: ScraperConfig,
}

impl SalesApiFactory {
    pub fn new(config: ScraperConfig) -> Self {
        Self { config }
    }
}

impl PageSourceFactory for SalesApiFactory {
    fn create(&self, worker_id: usize) -> Result<Box<dyn PageSource>, IngestError> {
        let client =
            SalesApiClient::new(self.config.clone(), worker_id).map_err(IngestError::HttpClient)?;
        Ok(Box::new(client))
    }
}
