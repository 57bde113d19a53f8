//! datacheck command-line interface.
//!
//! Validates a data file against a requirement file, applies the
//! allowances selected by flags, and prints what is left.

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use datacheck_rs::allow::{
    allow_deviation, allow_extra, allow_limit, allow_missing, allow_percent_deviation, Allowance,
};
use datacheck_rs::{
    format_error, format_success, parse_file, parse_stdin, validate, ArrayStrategy, DatacheckError,
    FormatHint, KeyFilter, OutputFormat, OutputOptions, Requirement, RequirementConfig, Value,
};
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

/// datacheck - Validate structured data against a requirement
///
/// Compares a JSON, YAML or TOML data file with a requirement file and
/// reports every difference: missing and extra values, invalid values and
/// numeric deviations.
#[derive(Parser)]
#[command(name = "datacheck")]
#[command(version)]
#[command(about = "Validate structured data against a requirement", long_about = None)]
struct Cli {
    /// Data file to validate ("-" reads standard input)
    #[arg(value_name = "DATA")]
    data: PathBuf,

    /// Requirement file
    #[arg(value_name = "REQUIREMENT")]
    requirement: PathBuf,

    /// Output format
    #[arg(short = 'f', long, value_enum, default_value = "terminal")]
    format: OutputFormatArg,

    /// Treat requirement arrays as unordered sets
    #[arg(long)]
    unordered: bool,

    /// Allow values that are required but missing
    #[arg(long)]
    allow_missing: bool,

    /// Allow values that are present but not required
    #[arg(long)]
    allow_extra: bool,

    /// Allow numeric deviations within +/- TOLERANCE
    #[arg(long, value_name = "TOLERANCE")]
    tolerance: Option<f64>,

    /// Allow numeric deviations within +/- FRACTION of the expected value
    #[arg(long, value_name = "FRACTION")]
    percent_tolerance: Option<f64>,

    /// Allow differences under keys matching PATTERN (repeatable)
    #[arg(long = "allow-key", value_name = "PATTERN")]
    allow_keys: Vec<String>,

    /// Only report differences under keys matching PATTERN (repeatable)
    #[arg(long = "only", value_name = "PATTERN")]
    only: Vec<String>,

    /// Allow up to N differences per key (or in total for flat results)
    #[arg(long, value_name = "N")]
    limit: Option<usize>,

    /// Message for the validation failure
    #[arg(short, long)]
    message: Option<String>,

    /// Maximum length for displayed values
    #[arg(long, default_value = "80")]
    max_value_length: usize,

    /// Maximum length of the plain report (0 shows everything)
    #[arg(long, default_value = "640")]
    max_diff: usize,

    /// Verbose output (debug events on stderr)
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode (suppress summary)
    #[arg(short, long)]
    quiet: bool,
}

/// Output format argument for clap
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum OutputFormatArg {
    /// Colored terminal output
    Terminal,
    /// JSON representation
    Json,
    /// Plain text (no colors)
    Plain,
}

impl From<OutputFormatArg> for OutputFormat {
    fn from(arg: OutputFormatArg) -> Self {
        match arg {
            OutputFormatArg::Terminal => OutputFormat::Terminal,
            OutputFormatArg::Json => OutputFormat::Json,
            OutputFormatArg::Plain => OutputFormat::Plain,
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(exit_code) => process::exit(exit_code),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            process::exit(2);
        }
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("datacheck_rs=debug")
    } else {
        EnvFilter::from_default_env()
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn load(path: &Path) -> Result<Value> {
    let value = if path == Path::new("-") {
        parse_stdin(FormatHint::Auto)?
    } else {
        parse_file(path)?
    };
    Ok(value)
}

/// Combines the allowances selected by flags with `|`.
fn build_allowance(cli: &Cli) -> Result<Option<Allowance>> {
    let mut allowances = Vec::new();

    if cli.allow_missing {
        allowances.push(allow_missing());
    }
    if cli.allow_extra {
        allowances.push(allow_extra());
    }
    if let Some(tolerance) = cli.tolerance {
        allowances.push(allow_deviation(tolerance).context("Invalid --tolerance")?);
    }
    if let Some(tolerance) = cli.percent_tolerance {
        allowances.push(allow_percent_deviation(tolerance).context("Invalid --percent-tolerance")?);
    }

    let keys = cli
        .allow_keys
        .iter()
        .fold(KeyFilter::new(), |filter, pattern| filter.allow(pattern));
    let keys = cli.only.iter().fold(keys, |filter, pattern| filter.only(pattern));
    if keys.has_patterns() {
        allowances.push(keys.into_allowance());
    }

    if let Some(limit) = cli.limit {
        allowances.push(allow_limit(limit));
    }

    Ok(allowances.into_iter().reduce(|combined, next| combined | next))
}

fn run(cli: Cli) -> Result<i32> {
    let stdin = Path::new("-");
    if cli.data == stdin && cli.requirement == stdin {
        return Err(DatacheckError::config_error(
            "data and requirement cannot both be read from standard input",
        )
        .into());
    }

    tracing::debug!(path = %cli.data.display(), "parsing data");
    let data = load(&cli.data)
        .with_context(|| format!("Failed to parse data file: {}", cli.data.display()))?;

    tracing::debug!(path = %cli.requirement.display(), "parsing requirement");
    let requirement = load(&cli.requirement).with_context(|| {
        format!("Failed to parse requirement file: {}", cli.requirement.display())
    })?;

    let config = RequirementConfig {
        array_strategy: if cli.unordered {
            ArrayStrategy::Unordered
        } else {
            ArrayStrategy::Sequence
        },
    };
    let requirement = Requirement::from_value(requirement, &config);
    let allowance = build_allowance(&cli)?;

    let check = || validate(&data, &requirement, cli.message.as_deref());
    let outcome = match &allowance {
        Some(allowance) => allowance.guard(check).map(|_| ()),
        None => check(),
    };

    let remaining = match outcome {
        Ok(()) => None,
        Err(DatacheckError::Validation(error)) => Some(error),
        Err(other) => return Err(other).context("Validation could not run"),
    };

    let output_format: OutputFormat = cli.format.into();
    let output_options = OutputOptions {
        summary: !cli.quiet,
        max_value_length: cli.max_value_length,
        max_diff: (cli.max_diff > 0).then_some(cli.max_diff),
    };

    let output = match &remaining {
        Some(error) => format_error(error, &output_format, &output_options),
        None => format_success(&output_format),
    }
    .context("Failed to format output")?;

    println!("{}", output);

    Ok(if remaining.is_some() { 1 } else { 0 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_conversion() {
        assert_eq!(OutputFormat::from(OutputFormatArg::Json), OutputFormat::Json);
        assert_eq!(OutputFormat::from(OutputFormatArg::Plain), OutputFormat::Plain);
    }

    #[test]
    fn test_no_flags_no_allowance() {
        let cli = Cli::parse_from(["datacheck", "data.json", "req.json"]);
        assert!(build_allowance(&cli).unwrap().is_none());
    }

    #[test]
    fn test_negative_tolerance_rejected() {
        let cli = Cli::parse_from(["datacheck", "data.json", "req.json", "--tolerance=-1"]);
        assert!(build_allowance(&cli).is_err());
    }
}
