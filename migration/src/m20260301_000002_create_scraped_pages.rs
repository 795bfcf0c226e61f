use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // One row per upstream page that was fetched and persisted
        manager
            .create_table(
                Table::create()
                    .table(ScrapedPages::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ScrapedPages::PageNumber)
                            .integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ScrapedPages::RecordCount)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ScrapedPages::ScrapedAt)
                            .timestamp()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_scraped_pages_scraped_at")
                    .table(ScrapedPages::Table)
                    .col(ScrapedPages::ScrapedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ScrapedPages::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum ScrapedPages {
    Table,
    PageNumber,
    RecordCount,
    ScrapedAt,
}
