//! Record Normalizer
//!
//! Turns one raw upstream sale into a [`CanonicalTransaction`]. Every function
//! here is pure; a record that cannot be normalized is skipped, never fatal.

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde_json::{Map, Value};

use crate::scrapers::record::{RawSaleRecord, get_optional_mapping, get_optional_string};
use super::transaction::{AUTOMATED_ACTOR_ADDRESS, ActorRole, CanonicalTransaction};

/// Vocabulary that marks a free-text field as an item title
const ITEM_KEYWORDS: [&str; 7] = ["pokemon", "card", "trading", "booster", "pack", "box", "set"];

/// Substrings that disqualify a field from being a product name
const NON_NAME_MARKERS: [&str; 6] = ["http", "www", "api", "json", "null", "undefined"];

/// Amounts are integers in millionths of the display currency
const AMOUNT_SCALE: u32 = 6;

const NAIVE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Normalize one record. `None` when the record is not a mapping or has
/// neither `time` nor `amount`.
pub fn normalize(record: &RawSaleRecord, page: u32) -> Option<CanonicalTransaction> {
    record.as_mapping()?;

    let transaction_time = record
        .get_optional_scalar("time")
        .map(|t| t.trim().to_string())
        .unwrap_or_default();
    let amount_raw = record
        .get_optional_scalar("amount")
        .map(|a| a.trim().to_string())
        .unwrap_or_default();

    if transaction_time.is_empty() && amount_raw.is_empty() {
        return None;
    }

    let from_address = record.get_optional_string("from").unwrap_or_default().to_string();
    let to_address = record.get_optional_string("to").unwrap_or_default().to_string();

    Some(CanonicalTransaction {
        price: derive_price(&amount_raw),
        date_batch: date_batch(&transaction_time, page),
        transaction_type: record.get_optional_scalar("type").unwrap_or_default(),
        actor_role: classify_actor(&from_address, &to_address),
        item_name: resolve_item_name(record),
        transaction_time,
        amount_raw,
        from_address,
        to_address,
        source_page: page,
    })
}

/// Normalize a fetched page, skipping malformed records individually.
pub fn normalize_page(records: &[RawSaleRecord], page: u32) -> Vec<CanonicalTransaction> {
    let mut out = Vec::with_capacity(records.len());
    let mut skipped = 0usize;

    for record in records {
        match normalize(record, page) {
            Some(tx) => out.push(tx),
            None => {
                skipped += 1;
                tracing::warn!(page, record = %record.as_value(), "Skipping malformed sale record");
            }
        }
    }

    if skipped > 0 {
        tracing::debug!(page, skipped, kept = out.len(), "Page normalized with skips");
    }

    out
}

/// `amount / 1_000_000` rounded to 2 places, halves away from zero; zero for
/// empty, non-integer or non-positive amounts.
pub fn derive_price(amount_raw: &str) -> Decimal {
    let amount = match amount_raw.trim().parse::<i128>() {
        Ok(a) if a > 0 => a,
        _ => return Decimal::ZERO,
    };

    Decimal::try_from_i128_with_scale(amount, AMOUNT_SCALE)
        .map(|d| d.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
        .unwrap_or(Decimal::ZERO)
}

pub fn classify_actor(from_address: &str, to_address: &str) -> ActorRole {
    if from_address == AUTOMATED_ACTOR_ADDRESS || to_address == AUTOMATED_ACTOR_ADDRESS {
        ActorRole::Automated
    } else {
        ActorRole::Human
    }
}

/// Parse an upstream timestamp. Offsetless timestamps are read as UTC.
pub fn parse_transaction_time(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }

    NAIVE_TIME_FORMATS.iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(raw, fmt)
            .ok()
            .map(|naive| Utc.from_utc_datetime(&naive).fixed_offset())
    })
}

/// YYYYMMDD of the transaction. Unparseable times fall back to `page / 100`,
/// a missing time to 0.
pub fn date_batch(transaction_time: &str, page: u32) -> i32 {
    if transaction_time.trim().is_empty() {
        return 0;
    }

    match parse_transaction_time(transaction_time) {
        Some(dt) => dt
            .format("%Y%m%d")
            .to_string()
            .parse()
            .unwrap_or(0),
        None => (page / 100) as i32,
    }
}

/// Five-stage name fallback. Each stage runs only if the previous found nothing.
pub fn resolve_item_name(record: &RawSaleRecord) -> String {
    let Some(fields) = record.as_mapping() else {
        return String::new();
    };

    nft_name(record.as_value())
        .or_else(|| listing_title(record.as_value()))
        .or_else(|| keyword_field(fields))
        .or_else(|| product_like_field(fields))
        .or_else(|| nested_keyword_field(fields))
        .unwrap_or_default()
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// Stage 1
fn nft_name(record: &Value) -> Option<String> {
    let nft = get_optional_mapping(record, "nft")?;
    nft.get("name").and_then(Value::as_str).and_then(non_blank)
}

// Stage 2
fn listing_title(record: &Value) -> Option<String> {
    let listing = get_optional_mapping(record, "ebayListing")?;

    listing
        .get("title")
        .and_then(Value::as_str)
        .and_then(non_blank)
        .or_else(|| {
            listing
                .get("data")
                .and_then(|data| get_optional_string(data, "title"))
                .and_then(non_blank)
        })
}

fn is_numeric(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn looks_like_item_title(value: &str) -> bool {
    let lowered = value.to_lowercase();
    value.chars().count() > 10
        && !is_numeric(value)
        && ITEM_KEYWORDS.iter().any(|kw| lowered.contains(kw))
}

fn string_fields(fields: &Map<String, Value>) -> impl Iterator<Item = &str> {
    fields.values().filter_map(Value::as_str)
}

// Stage 3
fn keyword_field(fields: &Map<String, Value>) -> Option<String> {
    string_fields(fields)
        .find(|v| looks_like_item_title(v))
        .and_then(non_blank)
}

// Stage 4
fn product_like_field(fields: &Map<String, Value>) -> Option<String> {
    string_fields(fields)
        .find(|value| {
            let len = value.chars().count();
            let lowered = value.to_lowercase();
            len > 15
                && len < 200
                && value.contains(' ')
                && !is_numeric(&value.replace(' ', ""))
                && !NON_NAME_MARKERS.iter().any(|m| lowered.contains(m))
        })
        .and_then(non_blank)
}

// Stage 5: one level down, keyword test only
fn nested_keyword_field(fields: &Map<String, Value>) -> Option<String> {
    fields
        .values()
        .filter_map(Value::as_object)
        .find_map(keyword_field)
}
