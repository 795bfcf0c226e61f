//! Price history for a single item
//!
//! Loads the stored sales of one item name and folds them into daily
//! aggregates keyed by the calendar day of the transaction time.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use sea_orm::{ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder};

use crate::entities::{prelude::SalesTransactions, sales_transactions};
use crate::ingestion::ActorRole;
use crate::models::price_history::{DailyPrice, PricePoint};

#[derive(Debug, Clone, Default)]
pub struct PriceHistoryFilter {
    pub transaction_type: Option<String>,
    pub actor_role: Option<ActorRole>,
    pub exclude_incomplete: bool,
}

/// Points for an exact item name, oldest first.
pub async fn load_points(
    db: &DatabaseConnection,
    item_name: &str,
    filter: &PriceHistoryFilter,
) -> Result<Vec<sales_transactions::Model>, DbErr> {
    let mut query = SalesTransactions::find()
        .filter(sales_transactions::Column::ItemName.eq(item_name));

    if let Some(tx_type) = filter.transaction_type.as_deref().filter(|s| !s.is_empty()) {
        query = query.filter(sales_transactions::Column::TransactionType.eq(tx_type));
    }
    if let Some(role) = filter.actor_role {
        query = query.filter(sales_transactions::Column::ActorRole.eq(role.as_str()));
    }

    let rows = query
        .order_by_asc(sales_transactions::Column::TransactionTime)
        .order_by_asc(sales_transactions::Column::Id)
        .all(db)
        .await?;

    Ok(if filter.exclude_incomplete {
        rows.into_iter().filter(is_complete).collect()
    } else {
        rows
    })
}

/// A row is usable for charting only when every identifying field is present.
pub fn is_complete(row: &sales_transactions::Model) -> bool {
    !row.transaction_time.is_empty()
        && !row.amount_raw.is_empty()
        && !row.transaction_type.is_empty()
        && !row.item_name.is_empty()
}

pub fn to_point(row: &sales_transactions::Model) -> PricePoint {
    PricePoint {
        transaction_time: row.transaction_time.clone(),
        price: row.price.to_f64().unwrap_or(0.0),
        transaction_type: row.transaction_type.clone(),
        actor_role: row.actor_role.clone(),
    }
}

/// Group rows by the `YYYY-MM-DD` prefix of their time. Rows without a
/// parseable day are left out.
pub fn aggregate_daily(rows: &[sales_transactions::Model]) -> Vec<DailyPrice> {
    let mut daily_groups: BTreeMap<&str, Vec<Decimal>> = BTreeMap::new();

    for row in rows {
        if let Some(day) = day_of(&row.transaction_time) {
            daily_groups.entry(day).or_default().push(row.price);
        }
    }

    daily_groups
        .into_iter()
        .filter_map(|(day, prices)| {
            let min = prices.iter().min()?;
            let max = prices.iter().max()?;
            let sum: Decimal = prices.iter().sum();
            let avg = (sum / Decimal::from(prices.len())).round_dp(2);

            Some(DailyPrice {
                date: day.to_string(),
                avg: avg.to_f64().unwrap_or(0.0),
                min: min.to_f64().unwrap_or(0.0),
                max: max.to_f64().unwrap_or(0.0),
                count: prices.len() as u64,
            })
        })
        .collect()
}

fn day_of(time: &str) -> Option<&str> {
    let day = time.get(..10)?;
    chrono::NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()?;
    Some(day)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn row(id: i64, time: &str, price: Decimal) -> sales_transactions::Model {
        let now = Utc::now().naive_utc();
        sales_transactions::Model {
            id,
            transaction_time: time.to_string(),
            amount_raw: "1000000".to_string(),
            price,
            transaction_type: "sale".to_string(),
            actor_role: "human".to_string(),
            from_address: "a".to_string(),
            to_address: "b".to_string(),
            item_name: "Golden Ticket".to_string(),
            source_page: 0,
            date_batch: 0,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_aggregate_daily() {
        let rows = vec![
            row(1, "2025-03-01T10:00:00Z", dec!(1.00)),
            row(2, "2025-03-01T12:00:00Z", dec!(2.00)),
            row(3, "2025-03-01T23:59:59Z", dec!(4.00)),
            row(4, "2025-03-02T00:00:00Z", dec!(5.50)),
            row(5, "", dec!(99.00)),
        ];

        let daily = aggregate_daily(&rows);
        assert_eq!(daily.len(), 2);

        assert_eq!(daily[0].date, "2025-03-01");
        assert_eq!(daily[0].count, 3);
        assert_eq!(daily[0].min, 1.0);
        assert_eq!(daily[0].max, 4.0);
        assert_eq!(daily[0].avg, 2.33);

        assert_eq!(daily[1].date, "2025-03-02");
        assert_eq!(daily[1].count, 1);
        assert_eq!(daily[1].avg, 5.5);
    }

    #[test]
    fn test_is_complete() {
        assert!(is_complete(&row(1, "2025-03-01T10:00:00Z", dec!(1))));
        assert!(!is_complete(&row(1, "", dec!(1))));

        let mut nameless = row(1, "2025-03-01T10:00:00Z", dec!(1));
        nameless.item_name.clear();
        assert!(!is_complete(&nameless));
    }

    #[tokio::test]
    async fn test_load_points_drops_incomplete_rows() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![
                row(1, "", dec!(1.00)),
                row(2, "2025-03-01T10:00:00Z", dec!(2.00)),
            ]])
            .into_connection();

        let filter = PriceHistoryFilter {
            exclude_incomplete: true,
            ..Default::default()
        };
        let points = load_points(&db, "Golden Ticket", &filter).await.unwrap();

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].id, 2);
    }
}
