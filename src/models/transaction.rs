//! Transaction listing request/response models
//!
//! Models for GET /api/transactions and GET /api/filters.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

use crate::entities::sales_transactions;
use crate::ingestion::ActorRole;

pub const DEFAULT_PER_PAGE: u64 = 50;
pub const MAX_PER_PAGE: u64 = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Time,
    Price,
    Name,
    Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDir {
    Asc,
    Desc,
}

/// Query parameters for transaction listing
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionQuery {
    /// 1-based page (default: 1)
    pub page: Option<u64>,
    /// Page size (default: 50, max: 200)
    pub per_page: Option<u64>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    /// automated | human
    pub actor_role: Option<String>,
    pub from_address: Option<String>,
    pub to_address: Option<String>,
    /// Case-insensitive substring of the item name
    pub name: Option<String>,
    /// time | price | name | type (default: time)
    pub sort_by: Option<String>,
    /// asc | desc (default: desc)
    pub sort_dir: Option<String>,
}

/// Validated form of [`TransactionQuery`]
#[derive(Debug, Clone, PartialEq)]
pub struct ListParams {
    pub page: u64,
    pub per_page: u64,
    /// Rows skipped before this page
    pub offset: u64,
    pub actor_role: Option<ActorRole>,
    pub sort_by: SortField,
    pub sort_dir: SortDir,
}

impl TransactionQuery {
    pub fn validate(&self) -> Result<ListParams, String> {
        let page = self.page.unwrap_or(1);
        if page < 1 {
            return Err("page must be at least 1".to_string());
        }

        let per_page = self.per_page.unwrap_or(DEFAULT_PER_PAGE);
        if per_page < 1 {
            return Err("per_page must be at least 1".to_string());
        }
        if per_page > MAX_PER_PAGE {
            return Err(format!("per_page cannot exceed {}", MAX_PER_PAGE));
        }

        let offset = (page - 1)
            .checked_mul(per_page)
            .filter(|offset| *offset <= i64::MAX as u64)
            .ok_or_else(|| format!("page {} is out of range", page))?;

        if let (Some(min), Some(max)) = (self.min_price, self.max_price) {
            if min > max {
                return Err("min_price cannot exceed max_price".to_string());
            }
        }

        let actor_role = match self.actor_role.as_deref().filter(|s| !s.is_empty()) {
            None => None,
            Some(raw) => Some(
                ActorRole::parse(raw)
                    .ok_or_else(|| format!("actor_role must be automated or human, got {}", raw))?,
            ),
        };

        let sort_by = match self.sort_by.as_deref().unwrap_or("time") {
            "time" => SortField::Time,
            "price" => SortField::Price,
            "name" => SortField::Name,
            "type" => SortField::Type,
            other => return Err(format!("Unsupported sort_by: {}", other)),
        };

        let sort_dir = match self.sort_dir.as_deref().unwrap_or("desc") {
            "asc" => SortDir::Asc,
            "desc" => SortDir::Desc,
            other => return Err(format!("sort_dir must be asc or desc, got {}", other)),
        };

        Ok(ListParams {
            page,
            per_page,
            offset,
            actor_role,
            sort_by,
            sort_dir,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionEntry {
    pub id: i64,
    pub transaction_time: String,
    pub amount_raw: String,
    pub price: f64,
    pub transaction_type: String,
    pub actor_role: String,
    pub from_address: String,
    pub to_address: String,
    pub item_name: String,
    pub source_page: i32,
    pub date_batch: i32,
}

impl From<sales_transactions::Model> for TransactionEntry {
    fn from(m: sales_transactions::Model) -> Self {
        Self {
            id: m.id,
            transaction_time: m.transaction_time,
            amount_raw: m.amount_raw,
            price: m.price.to_f64().unwrap_or(0.0),
            transaction_type: m.transaction_type,
            actor_role: m.actor_role,
            from_address: m.from_address,
            to_address: m.to_address,
            item_name: m.item_name,
            source_page: m.source_page,
            date_batch: m.date_batch,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionListResponse {
    pub data: Vec<TransactionEntry>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub pages: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiltersResponse {
    pub types: Vec<String>,
    pub actor_roles: Vec<String>,
    /// First 100 distinct names, alphabetical
    pub names: Vec<String>,
}
