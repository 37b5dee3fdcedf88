//! Rule compiler: one declarative rule configuration becomes one
//! executable predicate expression plus a weight descriptor.
//!
//! Compilation happens once, at evaluator construction. Operator names
//! and operand arity are checked here, so a malformed rule fails the
//! build instead of surfacing mid-evaluation. References stay symbolic
//! until a predicate is evaluated against a state record.

use rust_decimal::Decimal;
use scorecard_core::{Operand, RuleConfig, RuleType, Value};

use crate::compare::{self, ComparisonOp};
use crate::types::{EvalError, State};

/// A compiled predicate expression. Evaluation validates that every
/// referenced field is present before any comparison runs.
#[derive(Debug, Clone)]
pub enum Predicate {
    /// `compare(state[subject]).<op>(comparison)`
    Compare {
        subject: String,
        op: ComparisonOp,
        comparison: Operand,
    },
    /// `minimum <= state[subject] <= maximum`
    Range {
        subject: String,
        minimum: Operand,
        maximum: Operand,
    },
    /// `state[subject]` is (or is not) null.
    NullCheck { subject: String, negated: bool },
}

impl Predicate {
    /// Evaluate against a state record.
    ///
    /// Validation order is part of the contract: the subject field
    /// first, then range bounds (minimum before maximum), then the
    /// comparison value; each missing field errors by name before any
    /// comparison is attempted.
    pub fn eval(&self, state: &State) -> Result<bool, EvalError> {
        match self {
            Predicate::Compare {
                subject,
                op,
                comparison,
            } => {
                let value = lookup(state, subject)?;
                let other = resolve(comparison, state)?;
                op.test(value, &other)
            }
            Predicate::Range {
                subject,
                minimum,
                maximum,
            } => {
                let value = lookup(state, subject)?;
                let min = resolve(minimum, state)?;
                let max = resolve(maximum, state)?;
                compare::in_range(value, &min, &max)
            }
            Predicate::NullCheck { subject, negated } => {
                let value = lookup(state, subject)?;
                Ok(value.is_null() != *negated)
            }
        }
    }
}

/// How a rule's weight resolves at scoring time.
#[derive(Debug, Clone, PartialEq)]
pub enum WeightSpec {
    Literal(Decimal),
    Reference(String),
}

/// A non-constant rule ready for registration.
#[derive(Debug, Clone)]
pub struct PredicateRule {
    pub predicate: Predicate,
    pub weight: WeightSpec,
    pub average_weight: Decimal,
    pub rule_name: Option<String>,
    pub rule_type: Option<RuleType>,
}

/// The output of compiling one rule configuration.
#[derive(Debug, Clone)]
pub enum CompiledRule {
    /// An unconditional weight, folded into the registry at insert.
    Constant {
        label: Option<String>,
        weight: Decimal,
    },
    Predicate(PredicateRule),
}

/// Compile one rule configuration.
pub fn compile(rule: &RuleConfig) -> Result<CompiledRule, EvalError> {
    if rule.is_constant() {
        let weight = match &rule.condition_output.weight {
            Operand::Literal(Value::Number(w)) => *w,
            Operand::Literal(other) => {
                return Err(malformed(
                    rule,
                    format!("constant weight must be a number, got {}", other.type_name()),
                ))
            }
            Operand::Reference(_) => {
                return Err(malformed(rule, "constant weight must be a literal number"))
            }
        };
        return Ok(CompiledRule::Constant {
            label: rule.rule_name.clone(),
            weight,
        });
    }

    let test = rule
        .condition_test
        .as_deref()
        .ok_or_else(|| malformed(rule, "missing 'condition_test'"))?;
    let op = ComparisonOp::parse(test)?;
    let subject = rule.variable_name.clone();

    let predicate = if op.is_range() {
        let minimum = rule
            .value_minimum
            .clone()
            .ok_or_else(|| malformed(rule, "range test requires 'value_minimum'"))?;
        let maximum = rule
            .value_maximum
            .clone()
            .ok_or_else(|| malformed(rule, "range test requires 'value_maximum'"))?;
        Predicate::Range {
            subject,
            minimum,
            maximum,
        }
    } else if op.is_null_test() {
        Predicate::NullCheck {
            subject,
            negated: op == ComparisonOp::IsNotNull,
        }
    } else {
        let comparison = rule
            .value_comparison
            .clone()
            .ok_or_else(|| malformed(rule, "condition test requires 'value_comparison'"))?;
        Predicate::Compare {
            subject,
            op,
            comparison,
        }
    };

    let weight = match &rule.condition_output.weight {
        Operand::Literal(Value::Number(w)) => WeightSpec::Literal(*w),
        Operand::Literal(other) => {
            return Err(malformed(
                rule,
                format!(
                    "weight must be a number or a state reference, got {}",
                    other.type_name()
                ),
            ))
        }
        Operand::Reference(field) => WeightSpec::Reference(field.clone()),
    };

    Ok(CompiledRule::Predicate(PredicateRule {
        predicate,
        weight,
        average_weight: rule.condition_output.average_weight.unwrap_or(Decimal::ZERO),
        rule_name: rule.rule_name.clone(),
        rule_type: rule.rule_type,
    }))
}

fn lookup<'a>(state: &'a State, field: &str) -> Result<&'a Value, EvalError> {
    state.get(field).ok_or_else(|| EvalError::MissingVariable {
        name: field.to_string(),
    })
}

/// Resolve an operand: literals pass through, references read the state.
fn resolve(operand: &Operand, state: &State) -> Result<Value, EvalError> {
    match operand {
        Operand::Literal(value) => Ok(value.clone()),
        Operand::Reference(field) => lookup(state, field).cloned(),
    }
}

fn malformed(rule: &RuleConfig, message: impl Into<String>) -> EvalError {
    EvalError::MalformedRule {
        rule: rule
            .rule_name
            .clone()
            .unwrap_or_else(|| rule.variable_name.clone()),
        message: message.into(),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
