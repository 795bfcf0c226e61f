//! `SeaORM` Entity prelude

pub use super::sales_transactions::Entity as SalesTransactions;
pub use super::scraped_pages::Entity as ScrapedPages;
pub use super::sync_status::Entity as SyncStatus;
