//! Typed column values
//!
//! `ScalarValue` is the tagged variant every record column is stored as.
//! Internal logic always works on the typed variants; JSON conversion only
//! happens at the serialization boundary (staging payloads, snapshots).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use std::fmt;
use std::str::FromStr;

/// One column value
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Text(String),
    Integer(i64),
    Decimal(Decimal),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
}

impl ScalarValue {
    pub fn is_null(&self) -> bool {
        matches!(self, ScalarValue::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ScalarValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            ScalarValue::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ScalarValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            ScalarValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            ScalarValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    /// Convert to a JSON value for the serialization boundary
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            ScalarValue::Null => serde_json::Value::Null,
            ScalarValue::Text(s) => serde_json::Value::String(s.clone()),
            ScalarValue::Integer(i) => serde_json::Value::Number((*i).into()),
            ScalarValue::Decimal(d) => d
                .to_f64()
                .and_then(serde_json::Number::from_f64)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            ScalarValue::Bool(b) => serde_json::Value::Bool(*b),
            ScalarValue::Timestamp(t) => serde_json::Value::String(t.to_rfc3339()),
            ScalarValue::Json(v) => v.clone(),
        }
    }

    /// Parse a decimal out of a JSON number or numeric string
    pub(crate) fn decimal_from_json(value: &serde_json::Value) -> Option<Decimal> {
        match value {
            serde_json::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(Decimal::from(i))
                } else {
                    n.as_f64().and_then(Decimal::from_f64)
                }
            }
            serde_json::Value::String(s) => Decimal::from_str(s).ok(),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarValue::Null => write!(f, "NULL"),
            ScalarValue::Text(s) => write!(f, "{}", s),
            ScalarValue::Integer(i) => write!(f, "{}", i),
            ScalarValue::Decimal(d) => write!(f, "{}", d),
            ScalarValue::Bool(b) => write!(f, "{}", b),
            ScalarValue::Timestamp(t) => write!(f, "{}", t.to_rfc3339()),
            ScalarValue::Json(v) => write!(f, "{}", v),
        }
    }
}

impl From<&str> for ScalarValue {
    fn from(value: &str) -> Self {
        ScalarValue::Text(value.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(value: String) -> Self {
        ScalarValue::Text(value)
    }
}

impl From<i64> for ScalarValue {
    fn from(value: i64) -> Self {
        ScalarValue::Integer(value)
    }
}

impl From<i32> for ScalarValue {
    fn from(value: i32) -> Self {
        ScalarValue::Integer(value as i64)
    }
}

impl From<bool> for ScalarValue {
    fn from(value: bool) -> Self {
        ScalarValue::Bool(value)
    }
}

impl From<Decimal> for ScalarValue {
    fn from(value: Decimal) -> Self {
        ScalarValue::Decimal(value)
    }
}

impl From<DateTime<Utc>> for ScalarValue {
    fn from(value: DateTime<Utc>) -> Self {
        ScalarValue::Timestamp(value)
    }
}

impl From<serde_json::Value> for ScalarValue {
    fn from(value: serde_json::Value) -> Self {
        ScalarValue::Json(value)
    }
}

impl<T> From<Option<T>> for ScalarValue
where
    T: Into<ScalarValue>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(v) => v.into(),
            None => ScalarValue::Null,
        }
    }
}
