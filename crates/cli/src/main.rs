use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use scorecard_core::SegmentConfig;
use scorecard_eval::Evaluator;

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

/// Scorecard segment evaluation toolchain.
#[derive(Parser)]
#[command(name = "scorecard", version, about = "Scorecard segment evaluation toolchain")]
struct Cli {
    /// Output format (text or json)
    #[arg(long, global = true, default_value = "text", value_enum)]
    output: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evaluate a segment configuration against a state record
    Eval {
        /// Path to the segment configuration JSON file
        segment: PathBuf,
        /// Path to the state record JSON file
        #[arg(long)]
        state: PathBuf,
        /// Module name recorded in the evaluation output
        #[arg(long, default_value = "scorecard")]
        module_name: String,
    },

    /// Parse and compile a segment configuration without evaluating it
    Validate {
        /// Path to the segment configuration JSON file
        segment: PathBuf,
    },
}

#[derive(Debug, Serialize)]
struct ValidationReport {
    ok: bool,
    segment: String,
    rules: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    let code = match cli.command {
        Commands::Eval {
            segment,
            state,
            module_name,
        } => run_eval(&segment, &state, &module_name, cli.output),
        Commands::Validate { segment } => run_validate(&segment, cli.output),
    };
    process::exit(code);
}

fn run_eval(segment: &Path, state: &Path, module_name: &str, output: OutputFormat) -> i32 {
    let segment_json = match read_json(segment) {
        Ok(v) => v,
        Err(message) => return fail(&message),
    };
    let state_json = match read_json(state) {
        Ok(v) => v,
        Err(message) => return fail(&message),
    };

    let config = match SegmentConfig::from_json(&segment_json) {
        Ok(config) => config,
        Err(e) => return fail(&format!("{}: {}", segment.display(), e)),
    };
    let evaluator = match Evaluator::build(config, module_name) {
        Ok(evaluator) => evaluator,
        Err(e) => return fail(&format!("{}: {}", segment.display(), e)),
    };

    let evaluation = evaluator.evaluate(&state_json);
    let failed = evaluation.error().is_some();
    print_json(&evaluation.to_json(), output);
    if failed {
        1
    } else {
        0
    }
}

fn run_validate(segment: &Path, output: OutputFormat) -> i32 {
    let report = validate(segment);
    match output {
        OutputFormat::Json => match serde_json::to_string_pretty(&report) {
            Ok(rendered) => println!("{}", rendered),
            Err(e) => return fail(&format!("failed to render report: {}", e)),
        },
        OutputFormat::Text => match &report.error {
            None => println!("ok: segment '{}' ({} rules)", report.segment, report.rules),
            Some(error) => eprintln!("invalid: {}", error),
        },
    }
    if report.ok {
        0
    } else {
        1
    }
}

fn validate(segment: &Path) -> ValidationReport {
    let failure = |error: String| ValidationReport {
        ok: false,
        segment: segment.display().to_string(),
        rules: 0,
        error: Some(error),
    };

    let segment_json = match read_json(segment) {
        Ok(v) => v,
        Err(message) => return failure(message),
    };
    let config = match SegmentConfig::from_json(&segment_json) {
        Ok(config) => config,
        Err(e) => return failure(e.to_string()),
    };
    let name = config.name.clone();
    let rules = config.ruleset.len();
    match Evaluator::build(config, "validate") {
        Ok(_) => ValidationReport {
            ok: true,
            segment: name,
            rules,
            error: None,
        },
        Err(e) => failure(e.to_string()),
    }
}

fn read_json(path: &Path) -> Result<serde_json::Value, String> {
    let contents =
        fs::read_to_string(path).map_err(|e| format!("{}: {}", path.display(), e))?;
    serde_json::from_str(&contents).map_err(|e| format!("{}: {}", path.display(), e))
}

fn print_json(value: &serde_json::Value, output: OutputFormat) {
    let rendered = match output {
        OutputFormat::Text => serde_json::to_string_pretty(value),
        OutputFormat::Json => serde_json::to_string(value),
    };
    match rendered {
        Ok(rendered) => println!("{}", rendered),
        Err(e) => {
            eprintln!("failed to render output: {}", e);
        }
    }
}

fn fail(message: &str) -> i32 {
    eprintln!("{}", message);
    1
}
