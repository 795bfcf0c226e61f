//! Incremental ingestion of marketplace sales.
//!
//! `engine` drives a run: `planner` picks the pages (resolving stored date
//! bounds to pages through `locator`), `distributor` splits them across
//! workers, each `worker` fetches, normalizes and persists its share, and
//! `progress` keeps the on-disk snapshot current.

pub mod config;
pub mod distributor;
pub mod engine;
pub mod error;
pub mod locator;
pub mod normalizer;
pub mod planner;
pub mod progress;
pub mod transaction;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use config::IngestConfig;
pub use distributor::{PageRange, WorkerAssignment, distribute};
pub use engine::{IngestionEngine, RunOptions, RunSummary};
pub use error::{FetchError, IngestError, StoreError};
pub use planner::{IngestionPlan, Strategy};
pub use progress::{ProgressSnapshot, ProgressTracker};
pub use transaction::{ActorRole, CanonicalTransaction};
pub use worker::{IngestionContext, WorkerEvent, WorkerResult, WorkerState};
