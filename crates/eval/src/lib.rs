//! Scorecard segment evaluator -- compiles declarative rule
//! configurations into owned, reusable scoring functions with
//! explainable contribution breakdowns.
//!
//! A segment's rules compile once, at construction, into predicate
//! expressions; every later call validates the referenced state fields
//! before comparing, combines labeled groups under AND/OR policies,
//! and returns a base score with a ranked per-label breakdown. A built
//! evaluator contains its evaluation errors as values; construction
//! errors surface to the constructing caller.

pub mod compare;
pub mod compiler;
pub mod evaluator;
pub mod factory;
pub mod grader;
pub mod types;

pub use evaluator::Evaluator;
pub use factory::{build_evaluator, build_evaluators, generate, Evaluators};
pub use grader::{Grader, SOLO_LABEL};
pub use types::{
    AdjustmentResult, Contribution, EvalError, Evaluation, RuleWeight, ScoreResult,
    ScorecardResult, State,
};
