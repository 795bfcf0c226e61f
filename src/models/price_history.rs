//! Price history models
//!
//! Models for GET /api/price_history/{item_name}.

use serde::{Deserialize, Serialize};

use crate::ingestion::ActorRole;

#[derive(Debug, Clone, Deserialize)]
pub struct PriceHistoryQuery {
    #[serde(rename = "type")]
    pub transaction_type: Option<String>,
    pub actor_role: Option<String>,
    /// Drop rows missing time, amount, type or name (default: true)
    #[serde(default = "default_exclude_incomplete")]
    pub exclude_incomplete: bool,
}

fn default_exclude_incomplete() -> bool {
    true
}

impl Default for PriceHistoryQuery {
    fn default() -> Self {
        Self {
            transaction_type: None,
            actor_role: None,
            exclude_incomplete: true,
        }
    }
}

impl PriceHistoryQuery {
    pub fn validate(&self) -> Result<Option<ActorRole>, String> {
        match self.actor_role.as_deref().filter(|s| !s.is_empty()) {
            None => Ok(None),
            Some(raw) => ActorRole::parse(raw)
                .map(Some)
                .ok_or_else(|| format!("actor_role must be automated or human, got {}", raw)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricePoint {
    pub transaction_time: String,
    pub price: f64,
    pub transaction_type: String,
    pub actor_role: String,
}

/// Per-day aggregate over the points of one item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyPrice {
    /// YYYY-MM-DD
    pub date: String,
    pub avg: f64,
    pub min: f64,
    pub max: f64,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceHistoryResponse {
    pub item_name: String,
    pub points: Vec<PricePoint>,
    pub daily: Vec<DailyPrice>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclude_incomplete_defaults_to_true() {
        let query: PriceHistoryQuery = serde_json::from_str("{}").unwrap();
        assert!(query.exclude_incomplete);

        let query: PriceHistoryQuery =
            serde_json::from_str(r#"{"exclude_incomplete": false, "type": "sale"}"#).unwrap();
        assert!(!query.exclude_incomplete);
        assert_eq!(query.transaction_type.as_deref(), Some("sale"));
    }

    #[test]
    fn test_actor_role_validation() {
        let query = PriceHistoryQuery {
            actor_role: Some("automated".to_string()),
            ..Default::default()
        };
        assert_eq!(query.validate(), Ok(Some(ActorRole::Automated)));

        let query = PriceHistoryQuery {
            actor_role: Some("bot".to_string()),
            ..Default::default()
        };
        assert!(query.validate().is_err());
    }
}
