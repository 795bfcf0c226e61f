//! In-process fakes for the page source and the persistence gateway.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::json;

use super::error::{IngestError, StoreError};
use super::transaction::{ActorRole, CanonicalTransaction};
use crate::scrapers::record::RawSaleRecord;
use crate::scrapers::{PageSource, PageSourceFactory};
use crate::services::sales_store::{
    DateRange, SalesStore, StoreConnector, StoreStats,
};

pub fn sale(time: &str, amount: &str) -> RawSaleRecord {
    RawSaleRecord::new(json!({
        "time": time,
        "amount": amount,
        "type": "sale",
        "from": "seller",
        "to": "buyer",
        "nft": {"name": format!("Card {amount}")}
    }))
}

/// Pages served from memory. Pages past the script are empty unless a filler
/// record is set, in which case every page returns it.
#[derive(Clone, Default)]
pub struct ScriptedSource {
    pages: Arc<Vec<Vec<RawSaleRecord>>>,
    filler: Option<RawSaleRecord>,
    fetches: Arc<AtomicUsize>,
    fetched_pages: Arc<Mutex<Vec<u32>>>,
}

impl ScriptedSource {
    pub fn new(pages: Vec<Vec<RawSaleRecord>>) -> Self {
        Self {
            pages: Arc::new(pages),
            ..Self::default()
        }
    }

    pub fn from_times(pages: &[&[&str]]) -> Self {
        let pages = pages
            .iter()
            .enumerate()
            .map(|(p, times)| {
                times
                    .iter()
                    .enumerate()
                    .map(|(i, t)| sale(t, &format!("{}", (p * 100 + i + 1) * 1_000_000)))
                    .collect()
            })
            .collect();
        Self::new(pages)
    }

    pub fn endless(time: &str) -> Self {
        Self {
            filler: Some(sale(time, "1000000")),
            ..Self::default()
        }
    }

    /// `page_count` pages of `per_page` distinct valid sales each
    pub fn uniform(page_count: u32, per_page: u32) -> Self {
        let pages = (0..page_count)
            .map(|p| {
                (0..per_page)
                    .map(|i| {
                        let time = format!("2025-01-01T00:{:02}:{:02}Z", p % 60, i % 60);
                        sale(&time, &format!("{}", (p * 1000 + i + 1) * 10_000))
                    })
                    .collect()
            })
            .collect();
        Self::new(pages)
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn fetched_pages(&self) -> Vec<u32> {
        self.fetched_pages.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageSource for ScriptedSource {
    async fn fetch_page(&self, page: u32, _limit: u32) -> Vec<RawSaleRecord> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.fetched_pages.lock().unwrap().push(page);

        match self.pages.get(page as usize) {
            Some(records) => records.clone(),
            None => self.filler.iter().cloned().collect(),
        }
    }
}

impl PageSourceFactory for ScriptedSource {
    fn create(&self, _worker_id: usize) -> Result<Box<dyn PageSource>, IngestError> {
        Ok(Box::new(self.clone()))
    }
}

#[derive(Default)]
struct StoreInner {
    rows: Mutex<BTreeMap<(String, String, String), CanonicalTransaction>>,
    scraped: Mutex<HashMap<u32, usize>>,
    upserted_records: AtomicUsize,
    upsert_calls: AtomicUsize,
    failing_upserts: AtomicUsize,
    unreachable: Mutex<bool>,
}

/// Shared in-memory gateway; clones see the same data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<StoreInner>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_scraped(pages: &[u32]) -> Self {
        let store = Self::new();
        store
            .inner
            .scraped
            .lock()
            .unwrap()
            .extend(pages.iter().map(|p| (*p, 1)));
        store
    }

    pub fn with_rows(rows: Vec<CanonicalTransaction>) -> Self {
        let store = Self::new();
        {
            let mut map = store.inner.rows.lock().unwrap();
            for tx in rows {
                map.insert(key_of(&tx), tx);
            }
        }
        store
    }

    /// Fail the next `n` upserts
    pub fn fail_next_upserts(&self, n: usize) {
        self.inner.failing_upserts.store(n, Ordering::SeqCst);
    }

    pub fn set_unreachable(&self) {
        *self.inner.unreachable.lock().unwrap() = true;
    }

    pub fn rows(&self) -> Vec<CanonicalTransaction> {
        self.inner.rows.lock().unwrap().values().cloned().collect()
    }

    pub fn scraped(&self) -> HashMap<u32, usize> {
        self.inner.scraped.lock().unwrap().clone()
    }

    /// Records submitted across successful upserts, before key collapsing
    pub fn upserted_records(&self) -> usize {
        self.inner.upserted_records.load(Ordering::SeqCst)
    }

    pub fn upsert_calls(&self) -> usize {
        self.inner.upsert_calls.load(Ordering::SeqCst)
    }
}

fn key_of(tx: &CanonicalTransaction) -> (String, String, String) {
    let (time, amount, kind) = tx.natural_key();
    (time.to_string(), amount.to_string(), kind.to_string())
}

#[async_trait]
impl SalesStore for InMemoryStore {
    async fn upsert_batch(&self, transactions: &[CanonicalTransaction]) -> Result<u64, StoreError> {
        self.inner.upsert_calls.fetch_add(1, Ordering::SeqCst);

        let failing = self.inner.failing_upserts.load(Ordering::SeqCst);
        if failing > 0 {
            self.inner.failing_upserts.store(failing - 1, Ordering::SeqCst);
            return Err(StoreError::Connect("injected upsert failure".to_string()));
        }

        let mut rows = self.inner.rows.lock().unwrap();
        let before = rows.len();
        for tx in transactions {
            rows.insert(key_of(tx), tx.clone());
        }
        self.inner
            .upserted_records
            .fetch_add(transactions.len(), Ordering::SeqCst);

        Ok((rows.len() - before) as u64)
    }

    async fn mark_page_scraped(&self, page: u32, record_count: usize) -> Result<(), StoreError> {
        self.inner.scraped.lock().unwrap().insert(page, record_count);
        Ok(())
    }

    async fn get_scraped_pages(&self) -> Result<HashSet<u32>, StoreError> {
        Ok(self.inner.scraped.lock().unwrap().keys().copied().collect())
    }

    async fn get_date_range(&self) -> Result<Option<DateRange>, StoreError> {
        let rows = self.inner.rows.lock().unwrap();
        let times: Vec<&str> = rows
            .values()
            .map(|tx| tx.transaction_time.as_str())
            .filter(|t| !t.is_empty())
            .collect();

        Ok(match (times.iter().min(), times.iter().max()) {
            (Some(first), Some(last)) => Some(DateRange {
                first_date: first.to_string(),
                last_date: last.to_string(),
                total_records: times.len() as u64,
            }),
            _ => None,
        })
    }

    async fn get_stats(&self) -> Result<StoreStats, StoreError> {
        let rows = self.rows();
        let automated = rows
            .iter()
            .filter(|tx| tx.actor_role == ActorRole::Automated)
            .count() as u64;
        let scraped = self.scraped();

        Ok(StoreStats {
            total_records: rows.len() as u64,
            automated_records: automated,
            human_records: rows.len() as u64 - automated,
            scraped_pages: scraped.len() as u64,
            last_scraped_page: scraped.keys().max().copied(),
            last_scraped_at: None,
            date_range: self.get_date_range().await?,
        })
    }
}

#[async_trait]
impl StoreConnector for InMemoryStore {
    async fn connect(&self, _worker_id: usize) -> Result<Box<dyn SalesStore>, StoreError> {
        if *self.inner.unreachable.lock().unwrap() {
            return Err(StoreError::Connect("connection refused".to_string()));
        }
        Ok(Box::new(self.clone()))
    }
}
