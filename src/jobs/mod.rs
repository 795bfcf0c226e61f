pub mod sales_ingestion_sync;
