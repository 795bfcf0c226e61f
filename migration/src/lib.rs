pub use sea_orm_migration::prelude::*;

mod m20260301_000001_create_sales_transactions;
mod m20260301_000002_create_scraped_pages;
mod m20260302_000001_create_sync_status;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_sales_transactions::Migration),
            Box::new(m20260301_000002_create_scraped_pages::Migration),
            Box::new(m20260302_000001_create_sync_status::Migration),
        ]
    }
}
