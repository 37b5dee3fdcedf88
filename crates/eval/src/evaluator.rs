//! Evaluator orchestration: one built evaluator per segment.
//!
//! Construction compiles and registers every rule once; the returned
//! evaluator owns its Grader and can be called any number of times.
//! `evaluate` never returns an error to the caller -- every failure is
//! contained in the returned [`Evaluation`] value.

use rust_decimal::Decimal;
use scorecard_core::{SegmentConfig, Value};

use crate::compiler::compile;
use crate::grader::Grader;
use crate::types::{
    AdjustmentResult, EvalError, Evaluation, RuleWeight, ScoreResult, ScorecardResult, State,
};

/// A reusable scoring function for one segment.
#[derive(Debug, Clone)]
pub struct Evaluator {
    module_name: String,
    segment_name: String,
    output_variable: Option<String>,
    sync: bool,
    grader: Grader,
}

impl Evaluator {
    /// Compile a segment configuration into an evaluator.
    ///
    /// Compilation errors (unsupported operator, malformed rule)
    /// surface here; a missing `output_variable` does not -- that is
    /// reported per call, as a contained error.
    pub fn build(segment: SegmentConfig, module_name: &str) -> Result<Evaluator, EvalError> {
        let mut grader = Grader::new(segment.score_cap);
        for rule in &segment.ruleset {
            grader.insert(compile(rule)?);
        }
        Ok(Evaluator {
            module_name: module_name.to_string(),
            segment_name: segment.name,
            output_variable: segment.output_variable,
            sync: segment.sync,
            grader,
        })
    }

    /// Evaluate a state record against the segment rules.
    ///
    /// The caller's JSON is converted into an owned state before
    /// scoring, so the caller's record is never mutated or retained.
    pub fn evaluate(&self, state: &serde_json::Value) -> Evaluation {
        match self.try_evaluate(state) {
            Ok(result) => Evaluation::Scorecard(result),
            Err(e) => Evaluation::Failed {
                error: e.to_string(),
            },
        }
    }

    /// Deferred flavor of [`evaluate`](Evaluator::evaluate); yields the
    /// identical value for identical inputs.
    pub async fn evaluate_async(&self, state: &serde_json::Value) -> Evaluation {
        self.evaluate(state)
    }

    fn try_evaluate(&self, state: &serde_json::Value) -> Result<ScorecardResult, EvalError> {
        let output_variable = self
            .output_variable
            .as_ref()
            .ok_or(EvalError::MissingOutputVariable)?;
        let state = State::from_json(state)?;
        let scored = self.grader.score(&state, 0)?;

        Ok(ScorecardResult {
            name: self.module_name.clone(),
            output_variable: output_variable.clone(),
            segment: self.segment_name.clone(),
            rules: scored
                .contributions
                .iter()
                .map(|c| RuleWeight {
                    name: c.label.clone(),
                    weight: c.contribution,
                })
                .collect(),
            base_score: scored.base_score,
        })
    }

    /// Direct access to the scoring engine, bypassing the wrapping and
    /// output-variable validation above.
    pub fn score(&self, state: &State, loan_index: usize) -> Result<ScoreResult, EvalError> {
        self.grader.score(state, loan_index)
    }

    /// Direct access to capped re-scoring, bypassing the wrapping layer.
    pub fn adjustment(
        &self,
        score: &Value,
        state: &State,
        base_score: Decimal,
        loan_index: usize,
    ) -> Result<AdjustmentResult, EvalError> {
        self.grader.adjustment(score, state, base_score, loan_index)
    }

    pub fn segment_name(&self) -> &str {
        &self.segment_name
    }

    /// The segment's declared calling convention.
    pub fn is_sync(&self) -> bool {
        self.sync
    }
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
