use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Counterparty address of the marketplace's automated seller (the claw machine).
/// Matching is exact: no case folding, no prefix match.
pub const AUTOMATED_ACTOR_ADDRESS: &str = "62Q9eeDY3eM8A5CnprBGYMPShdBjAzdpBdr71QHsS8dS";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Automated,
    Human,
}

impl ActorRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActorRole::Automated => "automated",
            ActorRole::Human => "human",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "automated" => Some(ActorRole::Automated),
            "human" => Some(ActorRole::Human),
            _ => None,
        }
    }
}

impl std::fmt::Display for ActorRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One normalized sale, ready for upsert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalTransaction {
    pub transaction_time: String,
    pub amount_raw: String,
    pub price: Decimal,
    pub transaction_type: String,
    pub actor_role: ActorRole,
    pub from_address: String,
    pub to_address: String,
    pub item_name: String,
    /// Page index at fetch time. Informational, never an ordering key.
    pub source_page: u32,
    pub date_batch: i32,
}

/// Deduplication key. Two transactions with equal keys are the same sale.
///
/// Upstream sends no transaction id, so two distinct sales with the same
/// time, amount and type collapse into one row. Accepted approximation.
pub type NaturalKey<'a> = (&'a str, &'a str, &'a str);

impl CanonicalTransaction {
    pub fn natural_key(&self) -> NaturalKey<'_> {
        (
            &self.transaction_time,
            &self.amount_raw,
            &self.transaction_type,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_actor_role_round_trip_names() {
        assert_eq!(ActorRole::parse("automated"), Some(ActorRole::Automated));
        assert_eq!(ActorRole::parse("Human"), Some(ActorRole::Human));
        assert_eq!(ActorRole::parse("claw"), None);
        assert_eq!(ActorRole::Automated.to_string(), "automated");
    }
}
