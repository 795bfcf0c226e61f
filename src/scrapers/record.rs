//! Opaque upstream sale record with total accessors.
//!
//! Upstream records have no guaranteed shape: any field may be absent, null or
//! of an unexpected type. Accessors return `None` instead of failing.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawSaleRecord(Value);

impl RawSaleRecord {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &Value {
        &self.0
    }

    /// Top-level object, or `None` when the record is not a mapping
    pub fn as_mapping(&self) -> Option<&Map<String, Value>> {
        self.0.as_object()
    }

    /// String field; `None` when absent, null or not a string
    pub fn get_optional_string(&self, key: &str) -> Option<&str> {
        get_optional_string(&self.0, key)
    }

    /// Non-empty object field
    pub fn get_optional_mapping(&self, key: &str) -> Option<&Map<String, Value>> {
        get_optional_mapping(&self.0, key)
    }

    /// Scalar field rendered as text. Amounts arrive both as `"123"` and `123`.
    pub fn get_optional_scalar(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        }
    }
}

impl From<Value> for RawSaleRecord {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

pub fn get_optional_string<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(Value::as_str)
}

pub fn get_optional_mapping<'a>(value: &'a Value, key: &str) -> Option<&'a Map<String, Value>> {
    value
        .get(key)
        .and_then(Value::as_object)
        .filter(|map| !map.is_empty())
}
