//! Runtime value types shared by state records and rule literals.
//!
//! All numerics use `rust_decimal::Decimal` -- never `f64` -- so weight
//! arithmetic and threshold comparisons stay exact across repeated
//! evaluations.

use std::collections::BTreeMap;
use std::str::FromStr;

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::error::ConfigError;

/// A runtime value: a state record field, a rule literal, or a resolved
/// comparison argument.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Number(Decimal),
    Text(String),
    List(Vec<Value>),
    Record(BTreeMap<String, Value>),
}

impl Value {
    /// Returns a human-readable type name for error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "Null",
            Value::Bool(_) => "Bool",
            Value::Number(_) => "Number",
            Value::Text(_) => "Text",
            Value::List(_) => "List",
            Value::Record(_) => "Record",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Convert a JSON value into a runtime value.
    ///
    /// Numbers parse from their exact textual representation; numbers a
    /// Decimal cannot hold are rejected rather than rounded.
    pub fn from_json(value: &serde_json::Value) -> Result<Value, ConfigError> {
        match value {
            serde_json::Value::Null => Ok(Value::Null),
            serde_json::Value::Bool(b) => Ok(Value::Bool(*b)),
            serde_json::Value::Number(n) => decimal_from_number(n).map(Value::Number),
            serde_json::Value::String(s) => Ok(Value::Text(s.clone())),
            serde_json::Value::Array(items) => {
                let values = items
                    .iter()
                    .map(Value::from_json)
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(Value::List(values))
            }
            serde_json::Value::Object(fields) => {
                let mut record = BTreeMap::new();
                for (key, field) in fields {
                    record.insert(key.clone(), Value::from_json(field)?);
                }
                Ok(Value::Record(record))
            }
        }
    }

    /// Render back to JSON. Integral numbers render as JSON integers.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::List(items) => {
                serde_json::Value::Array(items.iter().map(Value::to_json).collect())
            }
            Value::Record(fields) => {
                let mut obj = serde_json::Map::new();
                for (key, field) in fields {
                    obj.insert(key.clone(), field.to_json());
                }
                serde_json::Value::Object(obj)
            }
        }
    }
}

/// Parse a JSON number into a Decimal via its textual representation,
/// falling back to scientific notation for exponent forms.
pub fn decimal_from_number(n: &serde_json::Number) -> Result<Decimal, ConfigError> {
    let repr = n.to_string();
    Decimal::from_str(&repr)
        .or_else(|_| Decimal::from_scientific(&repr))
        .map_err(|_| ConfigError::UnrepresentableNumber { value: repr })
}

/// Render a Decimal as a JSON number.
pub fn number_to_json(n: Decimal) -> serde_json::Value {
    if n.is_integer() {
        if let Some(i) = n.to_i64() {
            return serde_json::Value::from(i);
        }
    }
    match n.to_f64().and_then(serde_json::Number::from_f64) {
        Some(num) => serde_json::Value::Number(num),
        None => serde_json::Value::String(n.to_string()),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
