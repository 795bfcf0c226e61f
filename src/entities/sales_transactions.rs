//! `SeaORM` Entity for the sales_transactions table
//!
//! Rows are keyed by the natural key (transaction_time, amount_raw,
//! transaction_type); `id` is only a surrogate for ordering ties.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales_transactions")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    /// ISO-8601 string exactly as the upstream API sent it
    pub transaction_time: String,
    /// Integer amount in the smallest unit, kept as text
    pub amount_raw: String,
    #[sea_orm(column_type = "Decimal(Some((12, 2)))")]
    pub price: Decimal,
    pub transaction_type: String,
    /// 'automated' or 'human'
    pub actor_role: String,
    pub from_address: String,
    pub to_address: String,
    #[sea_orm(column_type = "Text")]
    pub item_name: String,
    pub source_page: i32,
    /// YYYYMMDD
    pub date_batch: i32,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
