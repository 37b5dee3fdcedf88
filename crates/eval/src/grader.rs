//! Rule registry and weighted scoring engine.
//!
//! A Grader owns every compiled rule for one segment. Scoring groups
//! rules by label in first-registration order, resolves the group
//! weight from the first member, evaluates every member, and combines
//! results under the group's AND/OR policy. Unlabeled rules all share
//! the implicit "solo" group and are evaluated together -- a quirk of
//! the segment format that callers depend on.

use rust_decimal::Decimal;
use scorecard_core::{RuleType, Value};

use crate::compiler::{CompiledRule, PredicateRule, WeightSpec};
use crate::types::{AdjustmentResult, Contribution, EvalError, ScoreResult, State};

/// Label shared by every rule registered without a name.
pub const SOLO_LABEL: &str = "solo";

/// Registry of compiled rules plus the constant-weight accumulator for
/// one segment. Owned by a single evaluator, never shared.
#[derive(Debug, Clone, Default)]
pub struct Grader {
    rules: Vec<PredicateRule>,
    constant_weight: Decimal,
    contributions: Vec<Contribution>,
    score_cap: Option<Decimal>,
}

impl Grader {
    pub fn new(score_cap: Option<Decimal>) -> Grader {
        Grader {
            rules: Vec::new(),
            constant_weight: Decimal::ZERO,
            contributions: Vec::new(),
            score_cap,
        }
    }

    /// Register one compiled rule. Constants fold into the accumulator
    /// and the seeded contribution list immediately; repeated constant
    /// labels accumulate rather than duplicate.
    pub fn insert(&mut self, rule: CompiledRule) {
        match rule {
            CompiledRule::Constant { label, weight } => {
                self.constant_weight += weight;
                let label = label.unwrap_or_else(|| SOLO_LABEL.to_string());
                accumulate(&mut self.contributions, &label, weight);
            }
            CompiledRule::Predicate(rule) => self.rules.push(rule),
        }
    }

    /// Score a state record.
    ///
    /// `loan_index` is accepted for multi-record callers and passed
    /// through without interpretation.
    pub fn score(&self, state: &State, _loan_index: usize) -> Result<ScoreResult, EvalError> {
        let mut base_score = self.constant_weight;
        let mut contributions = self.contributions.clone();

        for (label, members) in self.grouped() {
            let lead = members[0];
            let weight = resolve_weight(lead, state)?;

            let mut results = Vec::with_capacity(members.len());
            for member in &members {
                results.push(member.predicate.eval(state)?);
            }

            let passed = match (members.len(), lead.rule_type) {
                (1, _) => results[0],
                (_, Some(RuleType::And)) => results.iter().all(|r| *r),
                (_, Some(RuleType::Or)) => results.iter().any(|r| *r),
                // A multi-member group with no recognized policy never passes.
                (_, None) => false,
            };

            if passed {
                base_score += weight;
            }
            let applied = if passed { weight } else { Decimal::ZERO };
            accumulate(&mut contributions, label, applied - lead.average_weight);
        }

        contributions.sort_by(|a, b| b.contribution.cmp(&a.contribution));

        Ok(ScoreResult {
            base_score,
            contributions,
            score_cap: self.score_cap,
        })
    }

    /// Re-score with the given score value merged into the state under
    /// the `score` field, capping the combined total at `score_cap`
    /// when one is configured.
    pub fn adjustment(
        &self,
        score: &Value,
        state: &State,
        base_score: Decimal,
        loan_index: usize,
    ) -> Result<AdjustmentResult, EvalError> {
        let mut combined = state.clone();
        combined.insert("score", score.clone());
        let result = self.score(&combined, loan_index)?;

        let score_adjustment = match result.score_cap {
            Some(cap) if result.base_score + base_score > cap => cap - base_score,
            _ => result.base_score,
        };

        Ok(AdjustmentResult {
            score_adjustment,
            contributions: result.contributions,
        })
    }

    /// Group registered rules by label, preserving first-registration
    /// order. Unlabeled rules merge into the shared "solo" group.
    fn grouped(&self) -> Vec<(&str, Vec<&PredicateRule>)> {
        let mut groups: Vec<(&str, Vec<&PredicateRule>)> = Vec::new();
        for rule in &self.rules {
            let label = rule.rule_name.as_deref().unwrap_or(SOLO_LABEL);
            match groups.iter_mut().find(|(l, _)| *l == label) {
                Some((_, members)) => members.push(rule),
                None => groups.push((label, vec![rule])),
            }
        }
        groups
    }
}

/// Resolve a group's weight from its first member's descriptor.
fn resolve_weight(rule: &PredicateRule, state: &State) -> Result<Decimal, EvalError> {
    match &rule.weight {
        WeightSpec::Literal(weight) => Ok(*weight),
        WeightSpec::Reference(field) => match state.get(field) {
            Some(Value::Number(weight)) => Ok(*weight),
            Some(other) => Err(EvalError::TypeError {
                message: format!(
                    "weight field '{}' must be a number, got {}",
                    field,
                    other.type_name()
                ),
            }),
            None => Err(EvalError::MissingVariable {
                name: field.clone(),
            }),
        },
    }
}

/// Add a contribution under a label, summing into an existing entry
/// instead of duplicating the label.
fn accumulate(contributions: &mut Vec<Contribution>, label: &str, amount: Decimal) {
    match contributions.iter_mut().find(|c| c.label == label) {
        Some(existing) => existing.contribution += amount,
        None => contributions.push(Contribution {
            label: label.to_string(),
            contribution: amount,
        }),
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::ComparisonOp;
    use crate::compiler::Predicate;
    use scorecard_core::Operand;
    use std::str::FromStr;

    fn num(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn gt_rule(
        rule_name: Option<&str>,
        rule_type: Option<RuleType>,
        subject: &str,
        threshold: &str,
        weight: WeightSpec,
    ) -> CompiledRule {
        CompiledRule::Predicate(PredicateRule {
            predicate: Predicate::Compare {
                subject: subject.to_string(),
                op: ComparisonOp::Gt,
                comparison: Operand::Literal(Value::Number(num(threshold))),
            },
            weight,
            average_weight: Decimal::ZERO,
            rule_name: rule_name.map(|s| s.to_string()),
            rule_type,
        })
    }

    fn constant(label: Option<&str>, weight: &str) -> CompiledRule {
        CompiledRule::Constant {
            label: label.map(|s| s.to_string()),
            weight: num(weight),
        }
    }

    fn state_of(json: serde_json::Value) -> State {
        State::from_json(&json).unwrap()
    }

    #[test]
    fn constants_seed_base_score_and_contributions() {
        let mut grader = Grader::new(None);
        grader.insert(constant(Some("base"), "100"));
        let result = grader.score(&State::new(), 0).unwrap();
        assert_eq!(result.base_score, num("100"));
        assert_eq!(result.contributions.len(), 1);
        assert_eq!(result.contributions[0].label, "base");
        assert_eq!(result.contributions[0].contribution, num("100"));
    }

    #[test]
    fn duplicate_constant_labels_accumulate_at_insert() {
        let mut grader = Grader::new(None);
        grader.insert(constant(Some("base"), "100"));
        grader.insert(constant(Some("base"), "50"));
        let result = grader.score(&State::new(), 0).unwrap();
        assert_eq!(result.base_score, num("150"));
        assert_eq!(result.contributions.len(), 1);
        assert_eq!(result.contributions[0].contribution, num("150"));
    }

    #[test]
    fn single_rule_applies_weight_when_true() {
        let mut grader = Grader::new(None);
        grader.insert(gt_rule(
            Some("age"),
            None,
            "age",
            "18",
            WeightSpec::Literal(num("25")),
        ));

        let result = grader.score(&state_of(serde_json::json!({ "age": 19 })), 0).unwrap();
        assert_eq!(result.base_score, num("25"));

        let result = grader.score(&state_of(serde_json::json!({ "age": 16 })), 0).unwrap();
        assert_eq!(result.base_score, num("0"));
        assert_eq!(result.contributions[0].contribution, num("0"));
    }

    #[test]
    fn and_group_requires_every_member() {
        let mut grader = Grader::new(None);
        grader.insert(gt_rule(
            Some("history"),
            Some(RuleType::And),
            "age",
            "20",
            WeightSpec::Literal(num("100")),
        ));
        grader.insert(gt_rule(
            Some("history"),
            Some(RuleType::And),
            "fico_score",
            "700",
            WeightSpec::Literal(num("100")),
        ));

        let all_true = state_of(serde_json::json!({ "age": 25, "fico_score": 800 }));
        assert_eq!(grader.score(&all_true, 0).unwrap().base_score, num("100"));

        let one_false = state_of(serde_json::json!({ "age": 25, "fico_score": 650 }));
        assert_eq!(grader.score(&one_false, 0).unwrap().base_score, num("0"));
    }

    #[test]
    fn or_group_requires_any_member() {
        let mut grader = Grader::new(None);
        grader.insert(gt_rule(
            Some("liquidity"),
            Some(RuleType::Or),
            "annual_income",
            "50000",
            WeightSpec::Literal(num("200")),
        ));
        grader.insert(gt_rule(
            Some("liquidity"),
            Some(RuleType::Or),
            "checking_account_balance",
            "250000",
            WeightSpec::Literal(num("200")),
        ));

        let one_true = state_of(serde_json::json!({
            "annual_income": 0,
            "checking_account_balance": 500000
        }));
        assert_eq!(grader.score(&one_true, 0).unwrap().base_score, num("200"));

        let none_true = state_of(serde_json::json!({
            "annual_income": 10000,
            "checking_account_balance": 1000
        }));
        assert_eq!(grader.score(&none_true, 0).unwrap().base_score, num("0"));
    }

    #[test]
    fn multi_member_group_without_policy_never_passes() {
        let mut grader = Grader::new(None);
        grader.insert(gt_rule(
            Some("g"),
            None,
            "age",
            "18",
            WeightSpec::Literal(num("25")),
        ));
        grader.insert(gt_rule(
            Some("g"),
            None,
            "age",
            "10",
            WeightSpec::Literal(num("25")),
        ));
        let result = grader.score(&state_of(serde_json::json!({ "age": 30 })), 0).unwrap();
        assert_eq!(result.base_score, num("0"));
    }

    #[test]
    fn unlabeled_rules_share_the_solo_group() {
        let mut grader = Grader::new(None);
        grader.insert(gt_rule(
            None,
            Some(RuleType::And),
            "age",
            "18",
            WeightSpec::Literal(num("25")),
        ));
        grader.insert(gt_rule(
            None,
            Some(RuleType::And),
            "income",
            "50000",
            WeightSpec::Literal(num("40")),
        ));

        // One group, policy and weight from the first member.
        let both_true = state_of(serde_json::json!({ "age": 19, "income": 80000 }));
        let result = grader.score(&both_true, 0).unwrap();
        assert_eq!(result.base_score, num("25"));
        assert_eq!(result.contributions.len(), 1);
        assert_eq!(result.contributions[0].label, SOLO_LABEL);

        let one_false = state_of(serde_json::json!({ "age": 19, "income": 10000 }));
        assert_eq!(grader.score(&one_false, 0).unwrap().base_score, num("0"));
    }

    #[test]
    fn group_weight_resolves_from_first_member_reference() {
        let mut grader = Grader::new(None);
        grader.insert(gt_rule(
            Some("age"),
            None,
            "age",
            "18",
            WeightSpec::Reference("dynamic_weight".to_string()),
        ));

        let result = grader
            .score(&state_of(serde_json::json!({ "age": 19, "dynamic_weight": 25 })), 0)
            .unwrap();
        assert_eq!(result.base_score, num("25"));

        let err = grader
            .score(&state_of(serde_json::json!({ "age": 19 })), 0)
            .unwrap_err();
        assert_eq!(
            err,
            EvalError::MissingVariable {
                name: "dynamic_weight".to_string()
            }
        );
    }

    #[test]
    fn weight_reference_is_resolved_before_member_evaluation() {
        // Both the weight reference and the subject are missing; the
        // weight resolves first, so its field names the error.
        let mut grader = Grader::new(None);
        grader.insert(gt_rule(
            Some("g"),
            Some(RuleType::And),
            "age",
            "18",
            WeightSpec::Reference("custom_weight".to_string()),
        ));
        let err = grader.score(&State::new(), 0).unwrap_err();
        assert_eq!(
            err,
            EvalError::MissingVariable {
                name: "custom_weight".to_string()
            }
        );
    }

    #[test]
    fn non_numeric_weight_reference_errors() {
        let mut grader = Grader::new(None);
        grader.insert(gt_rule(
            Some("g"),
            None,
            "age",
            "18",
            WeightSpec::Reference("custom_weight".to_string()),
        ));
        let err = grader
            .score(
                &state_of(serde_json::json!({ "age": 19, "custom_weight": "heavy" })),
                0,
            )
            .unwrap_err();
        assert!(err.to_string().contains("custom_weight"));
    }

    #[test]
    fn predicate_failure_propagates_and_fails_the_call() {
        let mut grader = Grader::new(None);
        grader.insert(gt_rule(
            Some("age"),
            None,
            "age",
            "18",
            WeightSpec::Literal(num("25")),
        ));
        grader.insert(gt_rule(
            Some("debt"),
            None,
            "debt_to_income",
            "0",
            WeightSpec::Literal(num("25")),
        ));
        let err = grader
            .score(&state_of(serde_json::json!({ "age": 17 })), 0)
            .unwrap_err();
        assert_eq!(
            err,
            EvalError::MissingVariable {
                name: "debt_to_income".to_string()
            }
        );
    }

    #[test]
    fn group_contribution_merges_into_matching_constant_label() {
        let mut grader = Grader::new(None);
        grader.insert(constant(Some("age"), "10"));
        grader.insert(gt_rule(
            Some("age"),
            None,
            "age",
            "18",
            WeightSpec::Literal(num("25")),
        ));

        let result = grader.score(&state_of(serde_json::json!({ "age": 19 })), 0).unwrap();
        assert_eq!(result.base_score, num("35"));
        assert_eq!(result.contributions.len(), 1);
        assert_eq!(result.contributions[0].label, "age");
        assert_eq!(result.contributions[0].contribution, num("35"));
    }

    #[test]
    fn contributions_sort_descending() {
        let mut grader = Grader::new(None);
        grader.insert(gt_rule(
            Some("small"),
            None,
            "age",
            "18",
            WeightSpec::Literal(num("5")),
        ));
        grader.insert(gt_rule(
            Some("large"),
            None,
            "age",
            "18",
            WeightSpec::Literal(num("50")),
        ));
        grader.insert(gt_rule(
            Some("medium"),
            None,
            "age",
            "18",
            WeightSpec::Literal(num("20")),
        ));

        let result = grader.score(&state_of(serde_json::json!({ "age": 19 })), 0).unwrap();
        let labels: Vec<&str> = result.contributions.iter().map(|c| c.label.as_str()).collect();
        assert_eq!(labels, vec!["large", "medium", "small"]);
    }

    #[test]
    fn average_weight_shifts_contribution_not_score() {
        let mut grader = Grader::new(None);
        let mut rule = match gt_rule(
            Some("age"),
            None,
            "age",
            "18",
            WeightSpec::Literal(num("25")),
        ) {
            CompiledRule::Predicate(rule) => rule,
            CompiledRule::Constant { .. } => unreachable!(),
        };
        rule.average_weight = num("10");
        grader.insert(CompiledRule::Predicate(rule));

        let passed = grader.score(&state_of(serde_json::json!({ "age": 19 })), 0).unwrap();
        assert_eq!(passed.base_score, num("25"));
        assert_eq!(passed.contributions[0].contribution, num("15"));

        let failed = grader.score(&state_of(serde_json::json!({ "age": 16 })), 0).unwrap();
        assert_eq!(failed.base_score, num("0"));
        assert_eq!(failed.contributions[0].contribution, num("-10"));
    }

    #[test]
    fn adjustment_without_cap_returns_rescored_base() {
        let mut grader = Grader::new(None);
        grader.insert(gt_rule(
            Some("momentum"),
            None,
            "score",
            "600",
            WeightSpec::Literal(num("40")),
        ));

        let result = grader
            .adjustment(&Value::Number(num("650")), &State::new(), num("500"), 0)
            .unwrap();
        assert_eq!(result.score_adjustment, num("40"));
    }

    #[test]
    fn adjustment_caps_combined_score() {
        let mut grader = Grader::new(Some(num("520")));
        grader.insert(gt_rule(
            Some("momentum"),
            None,
            "score",
            "600",
            WeightSpec::Literal(num("40")),
        ));

        // 500 + 40 exceeds the 520 cap, so the adjustment shrinks to 20.
        let result = grader
            .adjustment(&Value::Number(num("650")), &State::new(), num("500"), 0)
            .unwrap();
        assert_eq!(result.score_adjustment, num("20"));
    }

    #[test]
    fn adjustment_overwrites_caller_score_field() {
        let mut grader = Grader::new(None);
        grader.insert(gt_rule(
            Some("momentum"),
            None,
            "score",
            "600",
            WeightSpec::Literal(num("40")),
        ));

        let state = state_of(serde_json::json!({ "score": 100 }));
        let result = grader
            .adjustment(&Value::Number(num("650")), &state, num("0"), 0)
            .unwrap();
        assert_eq!(result.score_adjustment, num("40"));
    }

    #[test]
    fn score_does_not_mutate_grader_state() {
        let mut grader = Grader::new(None);
        grader.insert(constant(Some("base"), "100"));
        grader.insert(gt_rule(
            Some("age"),
            None,
            "age",
            "18",
            WeightSpec::Literal(num("25")),
        ));

        let state = state_of(serde_json::json!({ "age": 19 }));
        let first = grader.score(&state, 0).unwrap();
        let second = grader.score(&state, 0).unwrap();
        assert_eq!(first, second);
    }
}
