//! Scorecard core library -- the runtime value model and the segment
//! configuration model shared by the evaluator and the CLI.
//!
//! A segment is a named set of weighted rules plus an output field name.
//! This crate parses segment JSON into typed configuration; the
//! `scorecard-eval` crate compiles and executes it.

pub mod config;
pub mod error;
pub mod value;

pub use config::{ConditionOutput, Operand, RuleConfig, RuleType, SegmentConfig};
pub use error::ConfigError;
pub use value::Value;
