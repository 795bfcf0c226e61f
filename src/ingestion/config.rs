//! Ingestion configuration loaded from the environment.
//!
//! Every value has a default; unparseable values fall back to it with a warning.
//! Parsing goes through a lookup closure so tests can feed a map instead of
//! touching the process environment.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::scrapers::{DEFAULT_BASE_URL, MAX_FETCH_TIMEOUT, ScraperConfig};

const ENV_BASE_URL: &str = "SALES_API_BASE_URL";
const ENV_ITEMS_PER_PAGE: &str = "SALES_ITEMS_PER_PAGE";
const ENV_MAX_PAGES: &str = "SALES_MAX_PAGES";
const ENV_WORKER_COUNT: &str = "SALES_WORKER_COUNT";
const ENV_FETCH_TIMEOUT: &str = "SALES_FETCH_TIMEOUT_SECS";
const ENV_FETCH_ATTEMPTS: &str = "SALES_FETCH_ATTEMPTS";
const ENV_RETRY_DELAY: &str = "SALES_RETRY_DELAY_MS";
const ENV_REQUEST_DELAY: &str = "SALES_REQUEST_DELAY_MS";
const ENV_FLUSH_EVERY_PAGES: &str = "SALES_FLUSH_EVERY_PAGES";
const ENV_FLUSH_EVERY_RECORDS: &str = "SALES_FLUSH_EVERY_RECORDS";
const ENV_RANGE_GAP: &str = "SALES_RANGE_GAP_THRESHOLD";
const ENV_LOCATOR_MAX_PAGES: &str = "SALES_LOCATOR_MAX_PAGES";
const ENV_LOCATOR_HIGH_PAGE: &str = "SALES_LOCATOR_HIGH_PAGE";
const ENV_FALLBACK_REGION: &str = "SALES_FALLBACK_REGION_PAGES";
const ENV_FRESH_START_PAGES: &str = "SALES_FRESH_START_PAGES";
const ENV_PROGRESS_FILE: &str = "SALES_PROGRESS_FILE";
const ENV_PROGRESS_STALE: &str = "SALES_PROGRESS_STALE_SECS";

pub const DEFAULT_ITEMS_PER_PAGE: u32 = 10;
pub const DEFAULT_MAX_PAGES: u32 = 1000;
pub const DEFAULT_WORKER_COUNT: usize = 8;
pub const MAX_WORKER_COUNT: usize = 16;
const DEFAULT_FETCH_TIMEOUT_SECS: u64 = 30;
const DEFAULT_FETCH_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_DELAY_MS: u64 = 200;
const DEFAULT_REQUEST_DELAY_MS: u64 = 100;
const DEFAULT_FLUSH_EVERY_PAGES: usize = 50;
const DEFAULT_FLUSH_EVERY_RECORDS: usize = 500;
const DEFAULT_RANGE_GAP: u32 = 10;
const DEFAULT_LOCATOR_MAX_PAGES: u32 = 100;
pub const DEFAULT_LOCATOR_HIGH_PAGE: u32 = 5000;
const DEFAULT_FALLBACK_REGION: u32 = 100;
pub const DEFAULT_FRESH_START_PAGES: u32 = 1000;
pub const DEFAULT_PROGRESS_FILE: &str = "scraping_progress.json";
pub const DEFAULT_PROGRESS_STALE_SECS: u64 = 600;

#[derive(Debug, Clone)]
pub struct IngestConfig {
    pub base_url: String,
    pub items_per_page: u32,
    pub max_pages: u32,
    pub worker_count: usize,
    pub fetch_timeout: Duration,
    pub fetch_attempts: u32,
    pub retry_delay_ms: u64,
    pub request_delay: Duration,
    pub flush_every_pages: usize,
    pub flush_every_records: usize,
    pub range_gap_threshold: u32,
    pub locator_max_pages: u32,
    pub locator_high_page: u32,
    pub fallback_region_pages: u32,
    pub fresh_start_pages: u32,
    pub progress_file: PathBuf,
    pub progress_stale_after: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl IngestConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let worker_count: usize = parse_or(&lookup, ENV_WORKER_COUNT, DEFAULT_WORKER_COUNT);
        let timeout_secs: u64 = parse_or(&lookup, ENV_FETCH_TIMEOUT, DEFAULT_FETCH_TIMEOUT_SECS);

        Self {
            base_url: lookup(ENV_BASE_URL)
                .filter(|s| !s.trim().is_empty())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            items_per_page: parse_or(&lookup, ENV_ITEMS_PER_PAGE, DEFAULT_ITEMS_PER_PAGE).max(1),
            max_pages: parse_or(&lookup, ENV_MAX_PAGES, DEFAULT_MAX_PAGES),
            worker_count: worker_count.clamp(1, MAX_WORKER_COUNT),
            fetch_timeout: Duration::from_secs(timeout_secs.max(1)).min(MAX_FETCH_TIMEOUT),
            fetch_attempts: parse_or(&lookup, ENV_FETCH_ATTEMPTS, DEFAULT_FETCH_ATTEMPTS).max(1),
            retry_delay_ms: parse_or(&lookup, ENV_RETRY_DELAY, DEFAULT_RETRY_DELAY_MS),
            request_delay: Duration::from_millis(parse_or(
                &lookup,
                ENV_REQUEST_DELAY,
                DEFAULT_REQUEST_DELAY_MS,
            )),
            flush_every_pages: parse_or(&lookup, ENV_FLUSH_EVERY_PAGES, DEFAULT_FLUSH_EVERY_PAGES)
                .max(1),
            flush_every_records: parse_or(
                &lookup,
                ENV_FLUSH_EVERY_RECORDS,
                DEFAULT_FLUSH_EVERY_RECORDS,
            )
            .max(1),
            range_gap_threshold: parse_or(&lookup, ENV_RANGE_GAP, DEFAULT_RANGE_GAP),
            locator_max_pages: parse_or(&lookup, ENV_LOCATOR_MAX_PAGES, DEFAULT_LOCATOR_MAX_PAGES),
            locator_high_page: parse_or(&lookup, ENV_LOCATOR_HIGH_PAGE, DEFAULT_LOCATOR_HIGH_PAGE),
            fallback_region_pages: parse_or(
                &lookup,
                ENV_FALLBACK_REGION,
                DEFAULT_FALLBACK_REGION,
            ),
            fresh_start_pages: parse_or(&lookup, ENV_FRESH_START_PAGES, DEFAULT_FRESH_START_PAGES),
            progress_file: lookup(ENV_PROGRESS_FILE)
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRESS_FILE)),
            progress_stale_after: Duration::from_secs(parse_or(
                &lookup,
                ENV_PROGRESS_STALE,
                DEFAULT_PROGRESS_STALE_SECS,
            )),
        }
    }

    pub fn scraper_config(&self) -> ScraperConfig {
        ScraperConfig {
            base_url: self.base_url.clone(),
            items_per_page: self.items_per_page,
            timeout: self.fetch_timeout,
            retry_max: self.fetch_attempts,
            retry_delay_ms: self.retry_delay_ms,
        }
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Copy + std::fmt::Display,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse() {
            Ok(v) => v,
            Err(_) => {
                tracing::warn!("Invalid {}={:?}, using default {}", key, raw, default);
                default
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> IngestConfig {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        IngestConfig::from_lookup(|k| map.get(k).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = IngestConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.items_per_page, 10);
        assert_eq!(config.max_pages, 1000);
        assert_eq!(config.worker_count, 8);
        assert_eq!(config.fetch_timeout, Duration::from_secs(30));
        assert_eq!(config.fetch_attempts, 3);
        assert_eq!(config.flush_every_pages, 50);
        assert_eq!(config.flush_every_records, 500);
        assert_eq!(config.locator_high_page, 5000);
        assert_eq!(config.progress_file, PathBuf::from("scraping_progress.json"));
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = config_from(&[(ENV_MAX_PAGES, "lots"), (ENV_WORKER_COUNT, "-3")]);
        assert_eq!(config.max_pages, DEFAULT_MAX_PAGES);
        assert_eq!(config.worker_count, DEFAULT_WORKER_COUNT);
    }

    #[test]
    fn test_bounds_are_clamped() {
        let config = config_from(&[
            (ENV_WORKER_COUNT, "64"),
            (ENV_FETCH_TIMEOUT, "120"),
            (ENV_FETCH_ATTEMPTS, "0"),
        ]);
        assert_eq!(config.worker_count, MAX_WORKER_COUNT);
        assert_eq!(config.fetch_timeout, MAX_FETCH_TIMEOUT);
        assert_eq!(config.fetch_attempts, 1);

        let config = config_from(&[(ENV_WORKER_COUNT, "0"), (ENV_FETCH_TIMEOUT, "0")]);
        assert_eq!(config.worker_count, 1);
        assert_eq!(config.fetch_timeout, Duration::from_secs(1));
    }

    #[test]
    fn test_scraper_config_mirrors_fetch_settings() {
        let config = config_from(&[
            (ENV_BASE_URL, "http://localhost:8080/sales"),
            (ENV_RETRY_DELAY, "50"),
        ]);
        let scraper = config.scraper_config();
        assert_eq!(scraper.base_url, "http://localhost:8080/sales");
        assert_eq!(scraper.retry_delay_ms, 50);
        assert_eq!(scraper.retry_max, 3);
    }
}
