//! Segment configuration model and JSON deserialization.
//!
//! The wire format pairs each operand field with a companion
//! `*_type` discriminator ("variable" means the value names a state
//! field). Parsing folds each pair into an [`Operand`], so downstream
//! code never re-inspects discriminator strings.

use rust_decimal::Decimal;

use crate::error::ConfigError;
use crate::value::{decimal_from_number, Value};

/// A rule operand: literal data, or a state field resolved at
/// evaluation time.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Literal(Value),
    Reference(String),
}

/// How a labeled group of rules combines its member results.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleType {
    And,
    Or,
}

impl RuleType {
    /// Parse a combination policy name; unrecognized names yield None.
    pub fn parse(name: &str) -> Option<RuleType> {
        if name.eq_ignore_ascii_case("and") {
            Some(RuleType::And)
        } else if name.eq_ignore_ascii_case("or") {
            Some(RuleType::Or)
        } else {
            None
        }
    }
}

/// The weighted output of one rule.
#[derive(Debug, Clone, PartialEq)]
pub struct ConditionOutput {
    /// Weight applied when the rule (or its group) passes. A Reference
    /// reads the weight from the state record at evaluation time.
    pub weight: Operand,
    /// Baseline subtracted from the applied weight when reporting the
    /// group's contribution. Defaults to zero.
    pub average_weight: Option<Decimal>,
}

/// One declarative rule over an input state field.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleConfig {
    pub rule_name: Option<String>,
    pub rule_type: Option<RuleType>,
    /// Field name in the input state, or the literal "constant"
    /// (case-insensitive) for an unconditional weight.
    pub variable_name: String,
    /// Comparison operator name; matched case- and space-insensitively.
    pub condition_test: Option<String>,
    pub value_comparison: Option<Operand>,
    pub value_minimum: Option<Operand>,
    pub value_maximum: Option<Operand>,
    pub condition_output: ConditionOutput,
}

impl RuleConfig {
    /// Constant rules contribute their weight unconditionally and never
    /// build a predicate.
    pub fn is_constant(&self) -> bool {
        self.variable_name.eq_ignore_ascii_case("constant")
    }
}

/// A named scorecard segment: rules plus the output field the base
/// score is written to.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentConfig {
    pub name: String,
    pub output_variable: Option<String>,
    /// Selects the synchronous calling convention at the wire boundary.
    pub sync: bool,
    /// Upper bound applied by score adjustment.
    pub score_cap: Option<Decimal>,
    pub ruleset: Vec<RuleConfig>,
}

impl SegmentConfig {
    /// Parse a segment configuration from JSON.
    pub fn from_json(segment: &serde_json::Value) -> Result<SegmentConfig, ConfigError> {
        let obj = segment.as_object().ok_or(ConfigError::NotAnObject)?;

        let name = required_str(obj, "name")?;
        let output_variable = optional_str(obj, "output_variable");
        let sync = obj.get("sync").and_then(|v| v.as_bool()).unwrap_or(false);

        let score_cap = match obj.get("score_cap") {
            None | Some(serde_json::Value::Null) => None,
            Some(serde_json::Value::Number(n)) => Some(decimal_from_number(n)?),
            Some(_) => {
                return Err(ConfigError::InvalidSegment(
                    "'score_cap' must be a number".to_string(),
                ))
            }
        };

        let ruleset_arr = obj
            .get("ruleset")
            .and_then(|r| r.as_array())
            .ok_or_else(|| ConfigError::MissingField {
                field: "ruleset".to_string(),
            })?;

        let mut ruleset = Vec::with_capacity(ruleset_arr.len());
        for (index, rule) in ruleset_arr.iter().enumerate() {
            ruleset.push(parse_rule(index, rule)?);
        }

        Ok(SegmentConfig {
            name,
            output_variable,
            sync,
            score_cap,
            ruleset,
        })
    }
}

// ── Parsing helpers ─────────────────────────────────────────────────

fn required_str(
    obj: &serde_json::Map<String, serde_json::Value>,
    field: &str,
) -> Result<String, ConfigError> {
    obj.get(field)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| ConfigError::MissingField {
            field: field.to_string(),
        })
}

fn optional_str(
    obj: &serde_json::Map<String, serde_json::Value>,
    field: &str,
) -> Option<String> {
    obj.get(field).and_then(|v| v.as_str()).map(|s| s.to_string())
}

fn invalid_rule(index: usize, message: impl Into<String>) -> ConfigError {
    ConfigError::InvalidRule {
        index,
        message: message.into(),
    }
}

fn parse_rule(index: usize, rule: &serde_json::Value) -> Result<RuleConfig, ConfigError> {
    let obj = rule
        .as_object()
        .ok_or_else(|| invalid_rule(index, "rule must be a JSON object"))?;

    let variable_name = obj
        .get("variable_name")
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| invalid_rule(index, "missing 'variable_name'"))?
        .to_string();

    let rule_name = optional_str(obj, "rule_name");
    let rule_type = obj
        .get("rule_type")
        .and_then(|v| v.as_str())
        .and_then(RuleType::parse);
    let condition_test = optional_str(obj, "condition_test");

    let value_comparison = parse_operand(index, obj, "value_comparison")?;
    let value_minimum = parse_operand(index, obj, "value_minimum")?;
    let value_maximum = parse_operand(index, obj, "value_maximum")?;

    let condition_output = parse_condition_output(index, obj)?;

    Ok(RuleConfig {
        rule_name,
        rule_type,
        variable_name,
        condition_test,
        value_comparison,
        value_minimum,
        value_maximum,
        condition_output,
    })
}

/// Fold an operand field and its `*_type` discriminator into an Operand.
fn parse_operand(
    index: usize,
    obj: &serde_json::Map<String, serde_json::Value>,
    field: &str,
) -> Result<Option<Operand>, ConfigError> {
    let raw = match obj.get(field) {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(v) => v,
    };
    let discriminator = format!("{field}_type");
    let is_reference = obj.get(&discriminator).and_then(|v| v.as_str()) == Some("variable");

    if is_reference {
        let name = raw.as_str().ok_or_else(|| {
            invalid_rule(
                index,
                format!("'{field}' must name a state field when '{discriminator}' is \"variable\""),
            )
        })?;
        Ok(Some(Operand::Reference(name.to_string())))
    } else {
        Ok(Some(Operand::Literal(Value::from_json(raw)?)))
    }
}

fn parse_condition_output(
    index: usize,
    obj: &serde_json::Map<String, serde_json::Value>,
) -> Result<ConditionOutput, ConfigError> {
    let output = obj
        .get("condition_output")
        .and_then(|v| v.as_object())
        .ok_or_else(|| invalid_rule(index, "missing 'condition_output'"))?;

    let weight_raw = output
        .get("weight")
        .ok_or_else(|| invalid_rule(index, "'condition_output' missing 'weight'"))?;

    let weight_is_reference = obj
        .get("condition_output_types")
        .and_then(|t| t.get("weight"))
        .and_then(|v| v.as_str())
        == Some("variable");

    let weight = if weight_is_reference {
        let name = weight_raw.as_str().ok_or_else(|| {
            invalid_rule(
                index,
                "'weight' must name a state field when 'condition_output_types.weight' is \"variable\"",
            )
        })?;
        Operand::Reference(name.to_string())
    } else {
        Operand::Literal(Value::from_json(weight_raw)?)
    };

    let average_weight = match output.get("average_weight") {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::Number(n)) => Some(decimal_from_number(n)?),
        Some(_) => {
            return Err(invalid_rule(index, "'average_weight' must be a number"));
        }
    };

    Ok(ConditionOutput {
        weight,
        average_weight,
    })
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
