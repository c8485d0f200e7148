// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use drift_cli::run_detection;
use drift_core::{ChangePoint, DriftError, TestIdentifier, TimeSeries};
use drift_detect::{EDivisiveConfig, QHatStrategy, RangeFinderConfig};
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

#[derive(Debug)]
struct DetectArgs {
    pvalue: Option<f64>,
    permutations: Option<usize>,
    seed: Option<u64>,
    strategy: Option<QHatStrategy>,
    weighting: Option<f64>,
    input: PathBuf,
    output: Option<PathBuf>,
}

impl Default for DetectArgs {
    fn default() -> Self {
        Self {
            pvalue: None,
            permutations: None,
            seed: None,
            strategy: None,
            weighting: None,
            input: PathBuf::new(),
            output: None,
        }
    }
}

#[derive(Debug)]
enum CliError {
    Drift(DriftError),
    Io {
        context: String,
        source: std::io::Error,
    },
    Json {
        context: String,
        source: serde_json::Error,
    },
    InvalidInput(String),
}

impl CliError {
    fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Drift(DriftError::InvalidInput(_)) | Self::InvalidInput(_) => "invalid_input",
            Self::Drift(DriftError::NumericalIssue(_)) => "numerical_issue",
            Self::Drift(DriftError::TransientStorage(_)) => "transient_storage",
            Self::Drift(DriftError::GitResolution(_)) => "git_resolution",
            Self::Drift(DriftError::NotSupported(_)) => "not_supported",
            Self::Drift(DriftError::Cancelled) => "cancelled",
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Drift(err) => write!(f, "{err}"),
            Self::Io { context, source } => write!(f, "{context}: {source}"),
            Self::Json { context, source } => write!(f, "{context}: {source}"),
            Self::InvalidInput(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Drift(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::InvalidInput(_) => None,
        }
    }
}

impl From<DriftError> for CliError {
    fn from(value: DriftError) -> Self {
        Self::Drift(value)
    }
}

/// Bare-values input for ad hoc runs; a full [`TimeSeries`] document is
/// accepted directly.
#[derive(Deserialize)]
struct SimpleSeriesDocument {
    #[serde(default = "default_dimension")]
    project: String,
    #[serde(default = "default_dimension")]
    variant: String,
    #[serde(default = "default_dimension")]
    task: String,
    #[serde(default = "default_dimension")]
    test: String,
    #[serde(default = "default_dimension")]
    thread_level: String,
    values: Vec<f64>,
}

fn default_dimension() -> String {
    "default".to_string()
}

#[derive(Serialize)]
struct InputSummary {
    path: String,
    points: usize,
}

#[derive(Serialize)]
struct DetectOutput {
    command: &'static str,
    input: InputSummary,
    pvalue: f64,
    permutations: usize,
    seed: u64,
    change_points: Vec<ChangePoint>,
    warnings: Vec<String>,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Serialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

fn main() {
    if let Err(err) = run() {
        emit_structured_error(&err);
        process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() || matches!(args[0].as_str(), "-h" | "--help") {
        print_root_help();
        return Ok(());
    }
    if matches!(args[0].as_str(), "-V" | "--version") {
        print_version();
        return Ok(());
    }

    match args[0].as_str() {
        "detect" => {
            let rest = &args[1..];
            if rest
                .iter()
                .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
            {
                print_detect_help();
                return Ok(());
            }
            handle_detect(parse_detect_args(rest)?)
        }
        other => Err(CliError::invalid_input(format!(
            "unknown command '{other}'; expected: detect"
        ))),
    }
}

fn parse_detect_args(tokens: &[String]) -> Result<DetectArgs, CliError> {
    let mut args = DetectArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--pvalue" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.pvalue = Some(parse_f64_arg(raw.as_str(), flag)?);
            }
            "--permutations" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.permutations = Some(parse_usize_arg(raw.as_str(), flag)?);
            }
            "--seed" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.seed = Some(parse_u64_arg(raw.as_str(), flag)?);
            }
            "--strategy" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.strategy = Some(parse_strategy(raw.as_str())?);
            }
            "--weighting" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.weighting = Some(parse_f64_arg(raw.as_str(), flag)?);
            }
            "--input" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.input = PathBuf::from(raw);
            }
            "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.output = Some(PathBuf::from(raw));
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown detect option '{other}'"
                )));
            }
        }
        idx += 1;
    }

    if args.input.as_os_str().is_empty() {
        return Err(CliError::invalid_input("detect requires --input <path>"));
    }

    Ok(args)
}

fn split_flag(token: &str) -> Result<(&str, Option<String>), CliError> {
    if !token.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "unexpected positional argument '{token}'; expected --flag value"
        )));
    }
    if let Some((flag, value)) = token.split_once('=') {
        return Ok((flag, Some(value.to_string())));
    }
    Ok((token, None))
}

fn take_flag_value(
    flag: &str,
    inline_value: Option<String>,
    tokens: &[String],
    idx: &mut usize,
) -> Result<String, CliError> {
    if let Some(value) = inline_value {
        return Ok(value);
    }

    *idx += 1;
    let value = tokens
        .get(*idx)
        .ok_or_else(|| CliError::invalid_input(format!("{flag} requires a value")))?;
    if value.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "{flag} requires a value, but got option '{value}'"
        )));
    }
    Ok(value.clone())
}

fn parse_usize_arg(raw: &str, flag: &str) -> Result<usize, CliError> {
    raw.parse::<usize>().map_err(|_| {
        CliError::invalid_input(format!(
            "{flag} expects a non-negative integer, got '{raw}'"
        ))
    })
}

fn parse_u64_arg(raw: &str, flag: &str) -> Result<u64, CliError> {
    raw.parse::<u64>().map_err(|_| {
        CliError::invalid_input(format!(
            "{flag} expects a non-negative integer, got '{raw}'"
        ))
    })
}

fn parse_f64_arg(raw: &str, flag: &str) -> Result<f64, CliError> {
    raw.parse::<f64>()
        .map_err(|_| CliError::invalid_input(format!("{flag} expects a number, got '{raw}'")))
}

fn parse_strategy(raw: &str) -> Result<QHatStrategy, CliError> {
    match raw.to_ascii_lowercase().as_str() {
        "incremental" => Ok(QHatStrategy::Incremental),
        "naive" => Ok(QHatStrategy::Naive),
        _ => Err(CliError::invalid_input(format!(
            "invalid --strategy '{raw}'; expected one of: incremental, naive"
        ))),
    }
}

fn print_version() {
    println!("drift {}", env!("CARGO_PKG_VERSION"));
}

fn print_root_help() {
    println!(
        "drift {}\n\nUSAGE:\n  drift <COMMAND> [OPTIONS]\n\nCOMMANDS:\n  detect   Detect change points in a JSON time series\n\nGLOBAL OPTIONS:\n  -h, --help      Show help\n  -V, --version   Show version\n\nRun 'drift detect --help' for subcommand options.",
        env!("CARGO_PKG_VERSION")
    );
}

fn print_detect_help() {
    println!(
        "USAGE:\n  drift detect --input <path> [OPTIONS]\n\nOPTIONS:\n  --pvalue <float>                   Significance cutoff. Default: 0.05\n  --permutations <usize>             Shuffles per round. Default: 100\n  --seed <u64>                       Shuffle seed. Default: 1234\n  --strategy <incremental|naive>     QHat scan strategy. Default: incremental\n  --weighting <float>                Boundary decay control. Default: 0.001\n  --input <path>                     Required series JSON\n  --output <path>                    Write JSON output to file"
    );
}

fn handle_detect(args: DetectArgs) -> Result<(), CliError> {
    let series = load_series(args.input.as_path())?;

    let mut detector_config = EDivisiveConfig::default();
    if let Some(pvalue) = args.pvalue {
        detector_config.pvalue = pvalue;
    }
    if let Some(permutations) = args.permutations {
        detector_config.permutations = permutations;
    }
    if let Some(seed) = args.seed {
        detector_config.seed = seed;
    }
    if let Some(strategy) = args.strategy {
        detector_config.strategy = strategy;
    }

    let mut range_config = RangeFinderConfig::default();
    if let Some(weighting) = args.weighting {
        range_config.weighting = weighting;
    }

    let assembled = run_detection(&series, detector_config.clone(), range_config)?;

    write_json_output(
        &DetectOutput {
            command: "detect",
            input: InputSummary {
                path: args.input.display().to_string(),
                points: series.len(),
            },
            pvalue: detector_config.pvalue,
            permutations: detector_config.permutations,
            seed: detector_config.seed,
            change_points: assembled.points,
            warnings: assembled.warnings,
        },
        args.output.as_deref(),
    )
}

fn load_series(path: &Path) -> Result<TimeSeries, CliError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| CliError::io(format!("failed to read '{}'", path.display()), source))?;

    // a full TimeSeries document wins; bare values are padded with
    // synthetic metadata
    if let Ok(series) = serde_json::from_str::<TimeSeries>(raw.as_str()) {
        series.validate()?;
        return Ok(series);
    }

    let simple: SimpleSeriesDocument = serde_json::from_str(raw.as_str()).map_err(|source| {
        CliError::json(
            format!(
                "'{}' is neither a TimeSeries document nor a values document",
                path.display()
            ),
            source,
        )
    })?;
    Ok(TimeSeries::from_values(
        TestIdentifier {
            project: simple.project,
            variant: simple.variant,
            task: simple.task,
            test: simple.test,
            thread_level: simple.thread_level,
        },
        simple.values,
    ))
}

fn write_json_output<T: Serialize>(value: &T, output: Option<&Path>) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|source| CliError::json("failed to serialize output", source))?;

    match output {
        Some(path) => fs::write(path, rendered.as_bytes())
            .map_err(|source| CliError::io(format!("failed to write '{}'", path.display()), source)),
        None => {
            println!("{rendered}");
            Ok(())
        }
    }
}

fn emit_structured_error(err: &CliError) {
    let envelope = ErrorEnvelope {
        error: ErrorPayload {
            code: err.code().to_string(),
            message: err.to_string(),
        },
    };
    match serde_json::to_string(&envelope) {
        Ok(rendered) => eprintln!("{rendered}"),
        Err(_) => eprintln!("{err}"),
    }
}
