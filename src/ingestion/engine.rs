//! Ingestion orchestrator
//!
//! Plans the run, splits the remaining pages into assignments and feeds them
//! through a bounded queue to a fixed pool of worker tasks. Each worker owns
//! its own page source and store connection. Progress counts queued pages and
//! is rewritten every time a worker finishes one.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinSet;
use uuid::Uuid;

use super::config::IngestConfig;
use super::distributor::{WorkerAssignment, distribute};
use super::error::IngestError;
use super::planner::{IngestionPlan, PlannerSettings, SandwichPlanner, Strategy};
use super::progress::ProgressTracker;
use super::transaction::ActorRole;
use super::worker::{IngestionContext, IngestionWorker, WorkerEvent, WorkerResult, WorkerSettings};
use crate::scrapers::PageSourceFactory;
use crate::scrapers::sales_api::SalesApiFactory;
use crate::services::sales_store::{SeaOrmConnector, StoreConnector};

#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Pages below this are never fetched
    pub start_page: u32,
    /// Overrides the configured page bound
    pub max_pages: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    pub run_id: String,
    pub strategy: Strategy,
    pub planned_pages: usize,
    pub queued_pages: usize,
    pub assignments: usize,
    pub completed_assignments: usize,
    pub pages_fetched: usize,
    pub empty_pages: usize,
    pub records_extracted: usize,
    pub records_persisted: usize,
    pub failed_flushes: usize,
    pub unflushed_records: usize,
    pub cancelled: bool,
}

pub struct IngestionEngine {
    config: IngestConfig,
    connector: Arc<dyn StoreConnector>,
    sources: Arc<dyn PageSourceFactory>,
    progress: ProgressTracker,
}

impl IngestionEngine {
    pub fn new(
        config: IngestConfig,
        connector: Arc<dyn StoreConnector>,
        sources: Arc<dyn PageSourceFactory>,
    ) -> Self {
        let progress = ProgressTracker::new(config.progress_file.clone());
        Self {
            config,
            connector,
            sources,
            progress,
        }
    }

    /// Engine wired to Postgres and the live marketplace API.
    pub fn postgres(config: IngestConfig, database_url: &str) -> Self {
        let sources = SalesApiFactory::new(config.scraper_config());
        Self::new(
            config,
            Arc::new(SeaOrmConnector::new(database_url)),
            Arc::new(sources),
        )
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    fn planner_settings(&self) -> PlannerSettings {
        PlannerSettings {
            items_per_page: self.config.items_per_page,
            default_max_pages: self.config.max_pages,
            locator_max_pages: self.config.locator_max_pages,
            locator_high_page: self.config.locator_high_page,
            fallback_region_pages: self.config.fallback_region_pages,
            fresh_start_pages: self.config.fresh_start_pages,
        }
    }

    fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            items_per_page: self.config.items_per_page,
            flush_every_pages: self.config.flush_every_pages,
            flush_every_records: self.config.flush_every_records,
            request_delay: self.config.request_delay,
        }
    }

    /// Run one ingestion pass.
    ///
    /// Fails only when the store cannot be reached at startup. Page, record and
    /// flush failures are logged and reflected in the summary.
    pub async fn run(
        &self,
        options: RunOptions,
        shutdown: watch::Receiver<bool>,
    ) -> Result<RunSummary, IngestError> {
        let run_id = Uuid::new_v4().to_string();
        let max_pages = options.max_pages.unwrap_or(self.config.max_pages);

        tracing::info!(
            run_id = %run_id,
            start_page = options.start_page,
            max_pages,
            workers = self.config.worker_count,
            "Starting sales ingestion run"
        );

        let store = self
            .connector
            .connect(0)
            .await
            .map_err(IngestError::StoreUnavailable)?;
        let planner_source = self.sources.create(0)?;

        let plan = SandwichPlanner::new(planner_source.as_ref(), store.as_ref(), self.planner_settings())
            .plan(max_pages)
            .await
            .map_err(IngestError::StoreUnavailable)?;
        let scraped = store
            .get_scraped_pages()
            .await
            .map_err(IngestError::StoreUnavailable)?;

        let planned = plan.all_pages();
        let queued: Vec<u32> = planned
            .iter()
            .copied()
            .filter(|p| *p >= options.start_page && !scraped.contains(p))
            .collect();

        let assignments = distribute(
            &queued,
            self.config.worker_count,
            self.config.range_gap_threshold,
        );

        tracing::info!(
            run_id = %run_id,
            strategy = %plan.strategy,
            planned = planned.len(),
            already_scraped = planned.len() - queued.len(),
            queued = queued.len(),
            assignments = assignments.len(),
            "Ingestion plan ready"
        );

        let mut summary = RunSummary {
            run_id: run_id.clone(),
            strategy: plan.strategy,
            planned_pages: planned.len(),
            queued_pages: queued.len(),
            assignments: assignments.len(),
            completed_assignments: 0,
            pages_fetched: 0,
            empty_pages: 0,
            records_extracted: 0,
            records_persisted: 0,
            failed_flushes: 0,
            unflushed_records: 0,
            cancelled: false,
        };

        self.record_progress(0, queued.len(), 0).await;
        if assignments.is_empty() {
            tracing::info!(run_id = %run_id, "Nothing to fetch");
            return Ok(summary);
        }

        let shutdown_check = shutdown.clone();
        let results = self.run_pool(assignments, shutdown, &mut summary).await;

        summary.cancelled =
            results.iter().any(|r| r.cancelled) || shutdown_requested(&shutdown_check);
        log_validation(&run_id, &plan, &results);

        if summary.completed_assignments < summary.assignments && !summary.cancelled {
            tracing::warn!(
                run_id = %run_id,
                completed = summary.completed_assignments,
                total = summary.assignments,
                "Some assignments were never picked up"
            );
        }

        tracing::info!(
            run_id = %run_id,
            records = summary.records_extracted,
            persisted = summary.records_persisted,
            fetched = summary.pages_fetched,
            empty = summary.empty_pages,
            failed_flushes = summary.failed_flushes,
            cancelled = summary.cancelled,
            "Sales ingestion run finished"
        );

        Ok(summary)
    }

    async fn run_pool(
        &self,
        assignments: Vec<WorkerAssignment>,
        shutdown: watch::Receiver<bool>,
        summary: &mut RunSummary,
    ) -> Vec<WorkerResult> {
        let total = assignments.len();
        let total_pages: usize = assignments.iter().map(WorkerAssignment::page_count).sum();
        let pool_size = self.config.worker_count.min(total).max(1);

        let (queue_tx, queue_rx) = mpsc::channel(total);
        for assignment in assignments {
            if queue_tx.send(assignment).await.is_err() {
                break;
            }
        }
        drop(queue_tx);

        let queue = Arc::new(Mutex::new(queue_rx));
        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();

        for worker_id in 0..pool_size {
            tasks.spawn(worker_loop(
                worker_id,
                Arc::clone(&queue),
                event_tx.clone(),
                Arc::clone(&self.connector),
                Arc::clone(&self.sources),
                self.worker_settings(),
                shutdown.clone(),
            ));
        }
        drop(event_tx);

        let mut results = Vec::with_capacity(total);
        let mut pages_done = 0usize;
        let mut records_so_far = 0usize;

        while let Some(event) = event_rx.recv().await {
            match event {
                WorkerEvent::PageDone { records, .. } => {
                    pages_done += 1;
                    records_so_far += records;
                    self.record_progress(pages_done, total_pages, records_so_far)
                        .await;
                }
                WorkerEvent::Finished(result) => {
                    summary.completed_assignments += 1;
                    summary.pages_fetched += result.pages_fetched;
                    summary.empty_pages += result.empty_pages;
                    summary.records_extracted += result.transactions.len();
                    summary.records_persisted += result.records_persisted;
                    summary.failed_flushes += result.failed_flushes;
                    summary.unflushed_records += result.unflushed_records;
                    results.push(result);
                }
            }
        }

        while let Some(joined) = tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!("Worker task panicked: {}", e);
            }
        }

        results
    }

    async fn record_progress(&self, completed: usize, total: usize, records: usize) {
        if let Err(e) = self
            .progress
            .record(completed as u64, total as u64, records as u64, Utc::now())
            .await
        {
            tracing::warn!("Failed to write progress snapshot: {}", e);
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    queue: Arc<Mutex<mpsc::Receiver<WorkerAssignment>>>,
    events: mpsc::UnboundedSender<WorkerEvent>,
    connector: Arc<dyn StoreConnector>,
    sources: Arc<dyn PageSourceFactory>,
    settings: WorkerSettings,
    shutdown: watch::Receiver<bool>,
) {
    let source = match sources.create(worker_id) {
        Ok(source) => source,
        Err(e) => {
            tracing::warn!(worker_id, "Worker could not build page source: {}", e);
            return;
        }
    };

    let store = match connector.connect(worker_id).await {
        Ok(store) => store,
        Err(e) => {
            tracing::warn!(worker_id, "Worker could not connect to store: {}", e);
            return;
        }
    };

    let scraped_pages = match store.get_scraped_pages().await {
        Ok(pages) => pages,
        Err(e) => {
            tracing::warn!(worker_id, "Could not load scraped pages, starting empty: {}", e);
            HashSet::new()
        }
    };

    let mut ctx = IngestionContext {
        worker_id,
        source,
        store,
        scraped_pages,
        settings,
        shutdown,
        events: Some(events.clone()),
    };

    loop {
        if shutdown_requested(&ctx.shutdown) {
            break;
        }

        let next = queue.lock().await.recv().await;
        let Some(assignment) = next else {
            break;
        };

        let result = IngestionWorker::new(&mut ctx).run(&assignment).await;
        if events.send(WorkerEvent::Finished(result)).is_err() {
            break;
        }
    }

    tracing::debug!(worker_id, "Worker task exiting");
}

fn shutdown_requested(shutdown: &watch::Receiver<bool>) -> bool {
    *shutdown.borrow()
}

/// Post-run consistency log: what each plan region yielded and who sold it.
fn log_validation(run_id: &str, plan: &IngestionPlan, results: &[WorkerResult]) {
    let older: HashSet<u32> = plan.older_pages.iter().copied().collect();
    let newer: HashSet<u32> = plan.newer_pages.iter().copied().collect();

    let mut older_records = 0usize;
    let mut newer_records = 0usize;
    let mut automated = 0usize;
    let mut human = 0usize;
    let mut earliest: Option<&str> = None;
    let mut latest: Option<&str> = None;

    for tx in results.iter().flat_map(|r| r.transactions.iter()) {
        if older.contains(&tx.source_page) {
            older_records += 1;
        }
        if newer.contains(&tx.source_page) {
            newer_records += 1;
        }
        match tx.actor_role {
            ActorRole::Automated => automated += 1,
            ActorRole::Human => human += 1,
        }

        let time = tx.transaction_time.as_str();
        if !time.is_empty() {
            earliest = Some(earliest.map_or(time, |e| e.min(time)));
            latest = Some(latest.map_or(time, |l| l.max(time)));
        }
    }

    tracing::info!(
        run_id = %run_id,
        older_records,
        newer_records,
        automated,
        human,
        earliest = earliest.unwrap_or("-"),
        latest = latest.unwrap_or("-"),
        "Run validation"
    );
}
