//! Ingestion Worker
//!
//! Walks one assignment page by page: fetch, normalize, buffer, and flush the
//! buffer to the store every N pages or M records. Page markers are written
//! only after the records of that page were upserted, so a page is never
//! reported done while its rows are still only in memory. Every handled page
//! is announced on the optional event channel so the orchestrator can keep
//! progress current mid-assignment.

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use super::distributor::WorkerAssignment;
use super::normalizer::normalize_page;
use super::transaction::CanonicalTransaction;
use crate::scrapers::PageSource;
use crate::services::sales_store::SalesStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkerState {
    #[default]
    Idle,
    Fetching,
    Extracting,
    BatchAccumulating,
    Flushing,
    Done,
}

#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub items_per_page: u32,
    pub flush_every_pages: usize,
    pub flush_every_records: usize,
    pub request_delay: Duration,
}

/// Everything one worker owns. Nothing in here is shared with another worker.
pub struct IngestionContext {
    pub worker_id: usize,
    pub source: Box<dyn PageSource>,
    pub store: Box<dyn SalesStore>,
    /// Loaded once at worker start; grows as this worker completes pages
    pub scraped_pages: HashSet<u32>,
    pub settings: WorkerSettings,
    pub shutdown: watch::Receiver<bool>,
    pub events: Option<mpsc::UnboundedSender<WorkerEvent>>,
}

impl IngestionContext {
    fn shutdown_requested(&self) -> bool {
        *self.shutdown.borrow()
    }
}

#[derive(Debug, Clone, Default)]
pub struct WorkerResult {
    pub worker_id: usize,
    /// Every transaction extracted, persisted or not
    pub transactions: Vec<CanonicalTransaction>,
    pub pages_fetched: usize,
    pub pages_skipped: usize,
    pub empty_pages: usize,
    pub records_persisted: usize,
    pub failed_flushes: usize,
    /// Records still buffered after the final flush failed
    pub unflushed_records: usize,
    pub cancelled: bool,
    pub final_state: WorkerState,
}

#[derive(Debug)]
pub enum WorkerEvent {
    /// A queued page was handled: fetched (possibly empty) or skipped as already scraped
    PageDone {
        worker_id: usize,
        page: u32,
        records: usize,
    },
    Finished(WorkerResult),
}

pub struct IngestionWorker<'a> {
    ctx: &'a mut IngestionContext,
    state: WorkerState,
    buffer: Vec<CanonicalTransaction>,
    /// (page, records extracted) awaiting a successful flush
    pending_marks: Vec<(u32, usize)>,
    pages_since_flush: usize,
    result: WorkerResult,
}

impl<'a> IngestionWorker<'a> {
    pub fn new(ctx: &'a mut IngestionContext) -> Self {
        let result = WorkerResult {
            worker_id: ctx.worker_id,
            ..WorkerResult::default()
        };

        Self {
            ctx,
            state: WorkerState::Idle,
            buffer: Vec::new(),
            pending_marks: Vec::new(),
            pages_since_flush: 0,
            result,
        }
    }

    pub async fn run(mut self, assignment: &WorkerAssignment) -> WorkerResult {
        let worker_id = self.ctx.worker_id;
        tracing::info!(
            worker_id,
            slot = assignment.worker_id,
            ranges = assignment.ranges.len(),
            pages = assignment.page_count(),
            "Worker starting assignment"
        );

        for &page in &assignment.pages {
            if self.ctx.shutdown_requested() {
                tracing::info!(worker_id, page, "Shutdown requested, stopping between pages");
                self.result.cancelled = true;
                break;
            }

            if self.ctx.scraped_pages.contains(&page) {
                self.result.pages_skipped += 1;
                self.report_page(page, 0);
                continue;
            }

            let records = self.process_page(page).await;
            self.report_page(page, records);

            if self.flush_due() {
                self.flush().await;
            }

            if !self.ctx.settings.request_delay.is_zero() {
                tokio::time::sleep(self.ctx.settings.request_delay).await;
            }
        }

        // Partial batches at range end or on shutdown must reach the store
        if !self.buffer.is_empty() || !self.pending_marks.is_empty() {
            self.flush().await;
        }

        self.result.unflushed_records = self.buffer.len();
        if self.result.unflushed_records > 0 {
            tracing::warn!(
                worker_id,
                records = self.result.unflushed_records,
                "Final flush failed, records kept in run result only"
            );
        }

        self.enter(WorkerState::Done);
        self.result.final_state = self.state;
        tracing::info!(
            worker_id,
            fetched = self.result.pages_fetched,
            skipped = self.result.pages_skipped,
            empty = self.result.empty_pages,
            records = self.result.transactions.len(),
            persisted = self.result.records_persisted,
            "Worker finished assignment"
        );

        self.result
    }

    fn enter(&mut self, next: WorkerState) {
        tracing::trace!(worker_id = self.ctx.worker_id, from = ?self.state, to = ?next, "Worker state");
        self.state = next;
    }

    fn report_page(&self, page: u32, records: usize) {
        if let Some(events) = &self.ctx.events {
            let _ = events.send(WorkerEvent::PageDone {
                worker_id: self.ctx.worker_id,
                page,
                records,
            });
        }
    }

    /// Fetch, normalize and buffer one page; returns the records extracted.
    async fn process_page(&mut self, page: u32) -> usize {
        let worker_id = self.ctx.worker_id;

        self.enter(WorkerState::Fetching);
        let records = self
            .ctx
            .source
            .fetch_page(page, self.ctx.settings.items_per_page)
            .await;
        self.result.pages_fetched += 1;

        if records.is_empty() {
            // Not marked: an empty page may be a transient upstream failure
            self.result.empty_pages += 1;
            tracing::debug!(worker_id, page, "Page returned no sales");
            self.enter(WorkerState::Idle);
            return 0;
        }

        self.enter(WorkerState::Extracting);
        let transactions = normalize_page(&records, page);
        tracing::debug!(
            worker_id,
            page,
            records = transactions.len(),
            "Page extracted"
        );

        self.enter(WorkerState::BatchAccumulating);
        let extracted = transactions.len();
        self.pending_marks.push((page, extracted));
        self.ctx.scraped_pages.insert(page);
        self.pages_since_flush += 1;
        self.buffer.extend(transactions.iter().cloned());
        self.result.transactions.extend(transactions);
        extracted
    }

    fn flush_due(&self) -> bool {
        self.pages_since_flush >= self.ctx.settings.flush_every_pages
            || self.buffer.len() >= self.ctx.settings.flush_every_records
    }

    /// Upsert the buffer, then mark its pages. On failure the buffer is kept
    /// and retried at the next trigger.
    async fn flush(&mut self) {
        let worker_id = self.ctx.worker_id;
        self.enter(WorkerState::Flushing);
        self.pages_since_flush = 0;

        if !self.buffer.is_empty() {
            match self.ctx.store.upsert_batch(&self.buffer).await {
                Ok(written) => {
                    tracing::debug!(
                        worker_id,
                        records = self.buffer.len(),
                        unique = written,
                        "Batch flushed"
                    );
                    self.result.records_persisted += self.buffer.len();
                    self.buffer.clear();
                }
                Err(e) => {
                    self.result.failed_flushes += 1;
                    tracing::warn!(
                        worker_id,
                        records = self.buffer.len(),
                        "Batch upsert failed, keeping buffer for retry: {}",
                        e
                    );
                    self.enter(WorkerState::Idle);
                    return;
                }
            }
        }

        for (page, record_count) in self.pending_marks.drain(..) {
            if let Err(e) = self.ctx.store.mark_page_scraped(page, record_count).await {
                tracing::warn!(worker_id, page, "Failed to mark page scraped: {}", e);
            }
        }

        self.enter(WorkerState::Idle);
    }
}
