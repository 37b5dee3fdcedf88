//! Evaluation state, results, and errors.
//!
//! Result types carry `Decimal` scores internally and render to the
//! JSON wire shapes via `to_json`; the output object's score field is
//! named by the segment's `output_variable`, so rendering is explicit
//! rather than derived.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use scorecard_core::value::number_to_json;
use scorecard_core::{ConfigError, Value};

// ──────────────────────────────────────────────
// Errors
// ──────────────────────────────────────────────

/// Errors that can occur while compiling or evaluating a segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    /// A referenced state field is absent at evaluation time. The
    /// message text is a wire contract; callers match on it.
    MissingVariable { name: String },
    /// The segment declares no output variable for the base score.
    MissingOutputVariable,
    /// A rule names a comparison operator the engine does not provide.
    UnsupportedOperator { op: String },
    /// A rule configuration cannot be compiled into a predicate.
    MalformedRule { rule: String, message: String },
    /// Operands with incompatible types reached a comparison.
    TypeError { message: String },
    /// The surrounding configuration (segment or factory options) is
    /// structurally invalid.
    InvalidConfig { message: String },
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EvalError::MissingVariable { name } => {
                write!(
                    f,
                    "The Variable {} is required by a Rule but is not defined.",
                    name
                )
            }
            EvalError::MissingOutputVariable => {
                write!(f, "Output Variable is required for scorecard but is not defined.")
            }
            EvalError::UnsupportedOperator { op } => {
                write!(f, "unsupported condition test: '{}'", op)
            }
            EvalError::MalformedRule { rule, message } => {
                write!(f, "rule '{}': {}", rule, message)
            }
            EvalError::TypeError { message } => {
                write!(f, "type error: {}", message)
            }
            EvalError::InvalidConfig { message } => {
                write!(f, "invalid configuration: {}", message)
            }
        }
    }
}

impl std::error::Error for EvalError {}

impl From<ConfigError> for EvalError {
    fn from(e: ConfigError) -> EvalError {
        EvalError::InvalidConfig {
            message: e.to_string(),
        }
    }
}

// ──────────────────────────────────────────────
// State
// ──────────────────────────────────────────────

/// The input record being scored: a flat map of field name to value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct State(pub BTreeMap<String, Value>);

impl State {
    pub fn new() -> State {
        State(BTreeMap::new())
    }

    /// Build a state from a JSON object. The caller's JSON is read,
    /// never kept, so scoring can't observe later mutations.
    pub fn from_json(state: &serde_json::Value) -> Result<State, EvalError> {
        let obj = state.as_object().ok_or_else(|| EvalError::TypeError {
            message: "state must be a JSON object".to_string(),
        })?;
        let mut fields = BTreeMap::new();
        for (key, value) in obj {
            fields.insert(
                key.clone(),
                Value::from_json(value).map_err(|e| EvalError::TypeError {
                    message: format!("state field '{}': {}", key, e),
                })?,
            );
        }
        Ok(State(fields))
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }
}

// ──────────────────────────────────────────────
// Score results
// ──────────────────────────────────────────────

/// One labeled entry in the explainability breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct Contribution {
    pub label: String,
    pub contribution: Decimal,
}

/// The raw output of one scoring pass.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    pub base_score: Decimal,
    /// Unique by label, sorted descending by contribution.
    pub contributions: Vec<Contribution>,
    pub score_cap: Option<Decimal>,
}

/// The output of a capped re-scoring pass.
#[derive(Debug, Clone, PartialEq)]
pub struct AdjustmentResult {
    pub score_adjustment: Decimal,
    pub contributions: Vec<Contribution>,
}

// ──────────────────────────────────────────────
// Evaluator output
// ──────────────────────────────────────────────

/// A contribution rendered for the output ruleset breakdown.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleWeight {
    pub name: String,
    pub weight: Decimal,
}

/// A successful scorecard evaluation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScorecardResult {
    pub name: String,
    pub output_variable: String,
    pub segment: String,
    pub rules: Vec<RuleWeight>,
    pub base_score: Decimal,
}

/// The contained outcome of calling a built evaluator. Failures are
/// values, never panics or escaping errors.
#[derive(Debug, Clone, PartialEq)]
pub enum Evaluation {
    Scorecard(ScorecardResult),
    Failed { error: String },
}

impl Evaluation {
    pub fn error(&self) -> Option<&str> {
        match self {
            Evaluation::Failed { error } => Some(error),
            Evaluation::Scorecard(_) => None,
        }
    }

    /// Render the wire shape. Success carries the base score under the
    /// segment's own output variable name; failure renders
    /// `{error, result: null}`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Evaluation::Scorecard(result) => {
                let rules: Vec<serde_json::Value> = result
                    .rules
                    .iter()
                    .map(|r| {
                        serde_json::json!({
                            "name": r.name,
                            "weight": number_to_json(r.weight),
                        })
                    })
                    .collect();
                let mut obj = serde_json::Map::new();
                obj.insert("name".to_string(), serde_json::Value::String(result.name.clone()));
                obj.insert(
                    "type".to_string(),
                    serde_json::Value::String("Scorecard".to_string()),
                );
                obj.insert(
                    "output_variable".to_string(),
                    serde_json::Value::String(result.output_variable.clone()),
                );
                obj.insert(
                    "segment".to_string(),
                    serde_json::Value::String(result.segment.clone()),
                );
                obj.insert("rules".to_string(), serde_json::Value::Array(rules));
                obj.insert(result.output_variable.clone(), number_to_json(result.base_score));
                serde_json::Value::Object(obj)
            }
            Evaluation::Failed { error } => {
                serde_json::json!({ "error": error, "result": null })
            }
        }
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
