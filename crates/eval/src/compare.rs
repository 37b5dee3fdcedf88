//! Comparison operators over runtime values.
//!
//! Operator names arrive from configuration in free form ("GT",
//! "IS NULL", "Range") and normalize by lower-casing and stripping
//! whitespace. Numbers order by Decimal, text lexicographically --
//! which also orders ISO-8601 date strings correctly. Ordering across
//! mismatched types is a type error, not false.

use std::cmp::Ordering;

use scorecard_core::Value;

use crate::types::EvalError;

/// A parsed comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Equal,
    NotEqual,
    Gt,
    Lt,
    Gte,
    Lte,
    Range,
    In,
    NotIn,
    IsNull,
    IsNotNull,
}

impl ComparisonOp {
    /// Parse an operator name, case- and whitespace-insensitively.
    /// `cap` and `floor` are aliases for `lte` and `gte`.
    pub fn parse(name: &str) -> Result<ComparisonOp, EvalError> {
        let normalized: String = name
            .to_lowercase()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        match normalized.as_str() {
            "equal" => Ok(ComparisonOp::Equal),
            "notequal" => Ok(ComparisonOp::NotEqual),
            "gt" => Ok(ComparisonOp::Gt),
            "lt" => Ok(ComparisonOp::Lt),
            "gte" | "floor" => Ok(ComparisonOp::Gte),
            "lte" | "cap" => Ok(ComparisonOp::Lte),
            "range" => Ok(ComparisonOp::Range),
            "in" => Ok(ComparisonOp::In),
            "notin" => Ok(ComparisonOp::NotIn),
            "isnull" => Ok(ComparisonOp::IsNull),
            "isnotnull" => Ok(ComparisonOp::IsNotNull),
            _ => Err(EvalError::UnsupportedOperator {
                op: name.trim().to_string(),
            }),
        }
    }

    /// Range tests take a (minimum, maximum) argument pair.
    pub fn is_range(&self) -> bool {
        matches!(self, ComparisonOp::Range)
    }

    /// Null-style tests take no argument.
    pub fn is_null_test(&self) -> bool {
        matches!(self, ComparisonOp::IsNull | ComparisonOp::IsNotNull)
    }

    /// Apply a single-argument operator to a subject value.
    pub fn test(&self, subject: &Value, comparison: &Value) -> Result<bool, EvalError> {
        match self {
            ComparisonOp::Equal => Ok(subject == comparison),
            ComparisonOp::NotEqual => Ok(subject != comparison),
            ComparisonOp::Gt => Ok(order_values(subject, comparison)? == Ordering::Greater),
            ComparisonOp::Lt => Ok(order_values(subject, comparison)? == Ordering::Less),
            ComparisonOp::Gte => Ok(order_values(subject, comparison)? != Ordering::Less),
            ComparisonOp::Lte => Ok(order_values(subject, comparison)? != Ordering::Greater),
            ComparisonOp::In => Ok(member_of(subject, comparison)?),
            ComparisonOp::NotIn => Ok(!member_of(subject, comparison)?),
            ComparisonOp::Range | ComparisonOp::IsNull | ComparisonOp::IsNotNull => {
                Err(EvalError::TypeError {
                    message: format!("operator {:?} does not take a single comparison value", self),
                })
            }
        }
    }
}

/// Test `minimum <= subject <= maximum`.
pub fn in_range(subject: &Value, minimum: &Value, maximum: &Value) -> Result<bool, EvalError> {
    let above_min = order_values(subject, minimum)? != Ordering::Less;
    let below_max = order_values(subject, maximum)? != Ordering::Greater;
    Ok(above_min && below_max)
}

/// Order two values: numbers by Decimal, text lexicographically.
fn order_values(left: &Value, right: &Value) -> Result<Ordering, EvalError> {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => Ok(l.cmp(r)),
        (Value::Text(l), Value::Text(r)) => Ok(l.cmp(r)),
        _ => Err(EvalError::TypeError {
            message: format!(
                "cannot compare {} with {}",
                left.type_name(),
                right.type_name()
            ),
        }),
    }
}

/// Membership of a subject in a List argument.
fn member_of(subject: &Value, list: &Value) -> Result<bool, EvalError> {
    match list {
        Value::List(items) => Ok(items.contains(subject)),
        other => Err(EvalError::TypeError {
            message: format!("membership test requires a List, got {}", other.type_name()),
        }),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
