use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SalesTransactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SalesTransactions::Id)
                            .big_integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(SalesTransactions::TransactionTime)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesTransactions::AmountRaw)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesTransactions::Price)
                            .decimal_len(12, 2)
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(SalesTransactions::TransactionType)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesTransactions::ActorRole)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesTransactions::FromAddress)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesTransactions::ToAddress)
                            .string_len(255)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesTransactions::ItemName)
                            .text()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesTransactions::SourcePage)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesTransactions::DateBatch)
                            .integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SalesTransactions::CreatedAt)
                            .timestamp()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .col(
                        ColumnDef::new(SalesTransactions::UpdatedAt)
                            .timestamp()
                            .not_null()
                            .default(SimpleExpr::Keyword(Keyword::CurrentTimestamp)),
                    )
                    .to_owned(),
            )
            .await?;

        // Natural key: one row per (time, amount, type)
        manager
            .create_index(
                Index::create()
                    .name("idx_sales_transactions_natural_key")
                    .table(SalesTransactions::Table)
                    .col(SalesTransactions::TransactionTime)
                    .col(SalesTransactions::AmountRaw)
                    .col(SalesTransactions::TransactionType)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sales_transactions_time")
                    .table(SalesTransactions::Table)
                    .col(SalesTransactions::TransactionTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sales_transactions_price")
                    .table(SalesTransactions::Table)
                    .col(SalesTransactions::Price)
                    .to_owned(),
            )
            .await?;

        // Price history lookups are by exact item name
        manager
            .create_index(
                Index::create()
                    .name("idx_sales_transactions_item_name_time")
                    .table(SalesTransactions::Table)
                    .col(SalesTransactions::ItemName)
                    .col(SalesTransactions::TransactionTime)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_sales_transactions_actor_role")
                    .table(SalesTransactions::Table)
                    .col(SalesTransactions::ActorRole)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SalesTransactions::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SalesTransactions {
    Table,
    Id,
    TransactionTime,
    AmountRaw,
    Price,
    TransactionType,
    ActorRole,
    FromAddress,
    ToAddress,
    ItemName,
    SourcePage,
    DateBatch,
    CreatedAt,
    UpdatedAt,
}
