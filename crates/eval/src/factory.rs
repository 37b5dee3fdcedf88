//! Batch factory: one-or-many segment configs to one-or-many named
//! evaluators.
//!
//! Construction errors propagate to the caller -- only a *built*
//! evaluator contains its errors.

use std::collections::BTreeMap;

use scorecard_core::SegmentConfig;

use crate::evaluator::Evaluator;
use crate::types::EvalError;

/// The result of generating evaluators from factory options.
#[derive(Debug)]
pub enum Evaluators {
    /// A single segment config produces a single evaluator.
    Single(Evaluator),
    /// An array of configs produces evaluators keyed by segment name.
    Named(BTreeMap<String, Evaluator>),
}

impl Evaluators {
    /// Look up an evaluator: the single one, or a named one.
    pub fn get(&self, name: &str) -> Option<&Evaluator> {
        match self {
            Evaluators::Single(evaluator) => {
                (evaluator.segment_name() == name).then_some(evaluator)
            }
            Evaluators::Named(map) => map.get(name),
        }
    }
}

/// Generate evaluators from JSON factory options:
/// `{segments: <object | array>, module_name}`.
pub fn generate(options: &serde_json::Value) -> Result<Evaluators, EvalError> {
    let segments = options
        .get("segments")
        .ok_or_else(|| EvalError::InvalidConfig {
            message: "missing 'segments'".to_string(),
        })?;
    let module_name = options
        .get("module_name")
        .and_then(|v| v.as_str())
        .unwrap_or("");

    match segments {
        serde_json::Value::Array(items) => {
            let mut configs = Vec::with_capacity(items.len());
            for item in items {
                configs.push(SegmentConfig::from_json(item)?);
            }
            Ok(Evaluators::Named(build_evaluators(configs, module_name)?))
        }
        single => {
            let config = SegmentConfig::from_json(single)?;
            Ok(Evaluators::Single(build_evaluator(config, module_name)?))
        }
    }
}

/// Build one evaluator from a parsed segment config.
pub fn build_evaluator(
    config: SegmentConfig,
    module_name: &str,
) -> Result<Evaluator, EvalError> {
    Evaluator::build(config, module_name)
}

/// Build a map of evaluators keyed by each segment's name.
pub fn build_evaluators(
    configs: Vec<SegmentConfig>,
    module_name: &str,
) -> Result<BTreeMap<String, Evaluator>, EvalError> {
    let mut evaluators = BTreeMap::new();
    for config in configs {
        let name = config.name.clone();
        evaluators.insert(name, Evaluator::build(config, module_name)?);
    }
    Ok(evaluators)
}

// ──────────────────────────────────────────────
// Tests
// ──────────────────────────────────────────────
