//! Persistence gateway for sales ingestion
//!
//! Idempotent upsert by natural key, scraped-page bookkeeping and the date-range
//! query the planner resumes from. Workers each open their own single-connection
//! store through a [`StoreConnector`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectOptions, Database, DatabaseBackend, DatabaseConnection, EntityTrait,
    FromQueryResult, NotSet, PaginatorTrait, QueryFilter, QueryOrder, Set, Statement,
};
use serde::Serialize;

use crate::entities::{prelude::*, sales_transactions, scraped_pages};
use crate::ingestion::error::StoreError;
use crate::ingestion::transaction::{ActorRole, CanonicalTransaction};

/// Rows per INSERT; 13 bound columns each keeps us far below the 65535 parameter cap
const UPSERT_CHUNK_SIZE: usize = 1000;

/// Bounds of the data already stored. Compared as strings, which orders
/// ISO-8601 timestamps chronologically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    pub first_date: String,
    pub last_date: String,
    pub total_records: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    pub total_records: u64,
    pub automated_records: u64,
    pub human_records: u64,
    pub scraped_pages: u64,
    pub last_scraped_page: Option<u32>,
    pub last_scraped_at: Option<NaiveDateTime>,
    pub date_range: Option<DateRange>,
}

#[async_trait]
pub trait SalesStore: Send + Sync {
    /// Create-or-refresh every transaction; returns the number of unique keys written.
    async fn upsert_batch(&self, transactions: &[CanonicalTransaction]) -> Result<u64, StoreError>;

    async fn mark_page_scraped(&self, page: u32, record_count: usize) -> Result<(), StoreError>;

    async fn get_scraped_pages(&self) -> Result<HashSet<u32>, StoreError>;

    /// `None` when no transaction with a time is stored yet.
    async fn get_date_range(&self) -> Result<Option<DateRange>, StoreError>;

    async fn get_stats(&self) -> Result<StoreStats, StoreError>;
}

/// Opens a dedicated store per worker.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self, worker_id: usize) -> Result<Box<dyn SalesStore>, StoreError>;
}

/// Keep the last occurrence of every natural key, preserving first-seen order.
///
/// Postgres refuses an `ON CONFLICT DO UPDATE` statement that touches the same
/// row twice, so a batch must not carry duplicate keys.
pub fn dedupe_by_natural_key(transactions: &[CanonicalTransaction]) -> Vec<&CanonicalTransaction> {
    let mut slot_of: HashMap<_, usize> = HashMap::with_capacity(transactions.len());
    let mut unique: Vec<&CanonicalTransaction> = Vec::with_capacity(transactions.len());

    for tx in transactions {
        match slot_of.get(&tx.natural_key()) {
            Some(&slot) => unique[slot] = tx,
            None => {
                slot_of.insert(tx.natural_key(), unique.len());
                unique.push(tx);
            }
        }
    }

    unique
}

fn to_active_model(tx: &CanonicalTransaction, now: NaiveDateTime) -> sales_transactions::ActiveModel {
    sales_transactions::ActiveModel {
        id: NotSet,
        transaction_time: Set(tx.transaction_time.clone()),
        amount_raw: Set(tx.amount_raw.clone()),
        price: Set(tx.price),
        transaction_type: Set(tx.transaction_type.clone()),
        actor_role: Set(tx.actor_role.as_str().to_string()),
        from_address: Set(tx.from_address.clone()),
        to_address: Set(tx.to_address.clone()),
        item_name: Set(tx.item_name.clone()),
        source_page: Set(tx.source_page as i32),
        date_batch: Set(tx.date_batch),
        created_at: Set(now),
        updated_at: Set(now),
    }
}

#[derive(Debug, FromQueryResult)]
struct DateRangeRow {
    first_date: Option<String>,
    last_date: Option<String>,
    total_records: i64,
}

/// Holds the connection behind an `Arc` so the read API can share its pool.
#[derive(Clone)]
pub struct SeaOrmSalesStore {
    db: Arc<DatabaseConnection>,
}

impl SeaOrmSalesStore {
    pub fn new(db: impl Into<Arc<DatabaseConnection>>) -> Self {
        Self { db: db.into() }
    }

    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[async_trait]
impl SalesStore for SeaOrmSalesStore {
    async fn upsert_batch(&self, transactions: &[CanonicalTransaction]) -> Result<u64, StoreError> {
        let unique = dedupe_by_natural_key(transactions);
        if unique.is_empty() {
            return Ok(0);
        }

        let now = Utc::now().naive_utc();
        let mut written = 0u64;

        for chunk in unique.chunks(UPSERT_CHUNK_SIZE) {
            let models = chunk.iter().map(|tx| to_active_model(tx, now));

            SalesTransactions::insert_many(models)
                .on_conflict(
                    OnConflict::columns([
                        sales_transactions::Column::TransactionTime,
                        sales_transactions::Column::AmountRaw,
                        sales_transactions::Column::TransactionType,
                    ])
                    .update_columns([
                        sales_transactions::Column::Price,
                        sales_transactions::Column::ActorRole,
                        sales_transactions::Column::FromAddress,
                        sales_transactions::Column::ToAddress,
                        sales_transactions::Column::ItemName,
                        sales_transactions::Column::SourcePage,
                        sales_transactions::Column::DateBatch,
                        sales_transactions::Column::UpdatedAt,
                    ])
                    .to_owned(),
                )
                .exec_without_returning(self.db.as_ref())
                .await?;

            written += chunk.len() as u64;
        }

        if unique.len() < transactions.len() {
            tracing::debug!(
                submitted = transactions.len(),
                unique = unique.len(),
                "Collapsed duplicate natural keys within batch"
            );
        }

        Ok(written)
    }

    async fn mark_page_scraped(&self, page: u32, record_count: usize) -> Result<(), StoreError> {
        let marker = scraped_pages::ActiveModel {
            page_number: Set(page as i32),
            record_count: Set(record_count.min(i32::MAX as usize) as i32),
            scraped_at: Set(Utc::now().naive_utc()),
        };

        ScrapedPages::insert(marker)
            .on_conflict(
                OnConflict::column(scraped_pages::Column::PageNumber)
                    .update_columns([
                        scraped_pages::Column::RecordCount,
                        scraped_pages::Column::ScrapedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.db.as_ref())
            .await?;

        Ok(())
    }

    async fn get_scraped_pages(&self) -> Result<HashSet<u32>, StoreError> {
        let pages = ScrapedPages::find().all(self.db.as_ref()).await?;

        Ok(pages
            .into_iter()
            .filter_map(|p| u32::try_from(p.page_number).ok())
            .collect())
    }

    async fn get_date_range(&self) -> Result<Option<DateRange>, StoreError> {
        let row = DateRangeRow::find_by_statement(Statement::from_sql_and_values(
            DatabaseBackend::Postgres,
            r#"
            SELECT
                MIN(transaction_time) AS first_date,
                MAX(transaction_time) AS last_date,
                COUNT(*) AS total_records
            FROM sales_transactions
            WHERE transaction_time <> ''
            "#,
            vec![],
        ))
        .one(self.db.as_ref())
        .await?;

        Ok(row.and_then(|r| match (r.first_date, r.last_date) {
            (Some(first_date), Some(last_date)) if r.total_records > 0 => Some(DateRange {
                first_date,
                last_date,
                total_records: r.total_records as u64,
            }),
            _ => None,
        }))
    }

    async fn get_stats(&self) -> Result<StoreStats, StoreError> {
        let total_records = SalesTransactions::find().count(self.db.as_ref()).await?;
        let automated_records = SalesTransactions::find()
            .filter(sales_transactions::Column::ActorRole.eq(ActorRole::Automated.as_str()))
            .count(self.db.as_ref())
            .await?;
        let scraped_pages = ScrapedPages::find().count(self.db.as_ref()).await?;
        let last_page = ScrapedPages::find()
            .order_by_desc(scraped_pages::Column::ScrapedAt)
            .one(self.db.as_ref())
            .await?;
        let date_range = self.get_date_range().await?;

        Ok(StoreStats {
            total_records,
            automated_records,
            human_records: total_records.saturating_sub(automated_records),
            scraped_pages,
            last_scraped_page: last_page
                .as_ref()
                .and_then(|p| u32::try_from(p.page_number).ok()),
            last_scraped_at: last_page.map(|p| p.scraped_at),
            date_range,
        })
    }
}

/// Connects one Postgres connection per worker.
#[derive(Clone)]
pub struct SeaOrmConnector {
    database_url: String,
}

impl SeaOrmConnector {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
        }
    }

    pub async fn connect_pool(&self, max_connections: u32) -> Result<DatabaseConnection, StoreError> {
        let mut options = ConnectOptions::new(self.database_url.clone());
        options
            .max_connections(max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(10))
            .sqlx_logging(false);

        Database::connect(options)
            .await
            .map_err(|e| StoreError::Connect(e.to_string()))
    }
}

#[async_trait]
impl StoreConnector for SeaOrmConnector {
    async fn connect(&self, worker_id: usize) -> Result<Box<dyn SalesStore>, StoreError> {
        let db = self.connect_pool(1).await?;
        tracing::debug!(worker_id, "Worker store connected");
        Ok(Box::new(SeaOrmSalesStore::new(db)))
    }
}
