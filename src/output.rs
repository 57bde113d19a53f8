//! Output formatting for validation results.
//!
//! A failed validation can be rendered for a terminal (with colors), as
//! plain text (the error's own rendering), or as JSON for tooling.
//!
//! # Examples
//!
//! ```
//! use datacheck_rs::{format_error, Difference, OutputFormat, OutputOptions, ValidationError};
//!
//! let error = ValidationError::new("invalid data", vec![Difference::missing("A")]);
//! let output = format_error(&error, &OutputFormat::Plain, &OutputOptions::default()).unwrap();
//! assert!(output.contains("Missing(\"A\")"));
//! ```

use colored::*;
use serde_json::json;

use crate::difference::Difference;
use crate::error::{OutputError, ValidationError};
use crate::report::{Differences, Report, ReportStats};
use crate::value::Value;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Colored terminal output with ANSI escape codes
    Terminal,
    /// JSON document with differences and statistics
    Json,
    /// Plain text, no colors (suitable for piping)
    Plain,
}

/// Options for controlling output formatting.
#[derive(Debug, Clone)]
pub struct OutputOptions {
    /// Append a summary line with counts by kind
    pub summary: bool,
    /// Maximum length for displayed values (truncate if longer)
    pub max_value_length: usize,
    /// Length limit for the plain rendering; `None` shows everything
    pub max_diff: Option<usize>,
}

impl Default for OutputOptions {
    fn default() -> Self {
        Self {
            summary: true,
            max_value_length: 80,
            max_diff: ValidationError::DEFAULT_MAX_DIFF,
        }
    }
}

/// Formats a validation failure.
///
/// # Arguments
///
/// * `error` - The validation error to format
/// * `format` - The output format (Terminal, JSON, or Plain)
/// * `options` - Formatting options
///
/// # Returns
///
/// Returns the formatted string on success, or an OutputError on failure.
pub fn format_error(
    error: &ValidationError,
    format: &OutputFormat,
    options: &OutputOptions,
) -> Result<String, OutputError> {
    match format {
        OutputFormat::Terminal => Ok(format_terminal(error, options)),
        OutputFormat::Json => format_json(Some(error)),
        OutputFormat::Plain => Ok(format_plain(error, options)),
    }
}

/// Formats the outcome of a validation that found nothing to report.
pub fn format_success(format: &OutputFormat) -> Result<String, OutputError> {
    match format {
        OutputFormat::Terminal => Ok("No differences found.".green().to_string()),
        OutputFormat::Json => format_json(None),
        OutputFormat::Plain => Ok("No differences found.".to_string()),
    }
}

fn format_terminal(error: &ValidationError, options: &OutputOptions) -> String {
    let mut output = format!("{}\n", error.message().bold());

    for (path, difference) in labelled(error.differences()) {
        output.push_str(&format_difference_terminal(&path, difference, options));
        output.push('\n');
    }

    if options.summary {
        output.push('\n');
        output.push_str(&format_summary(&error.differences().stats()));
    }

    output
}

fn format_difference_terminal(path: &str, difference: &Difference, options: &OutputOptions) -> String {
    let max = options.max_value_length;

    match difference {
        Difference::Missing(value) => {
            format!("{} {}: {}", "-".bright_red(), path.red(), value.preview(max).red())
        }
        Difference::Extra(value) => {
            format!("{} {}: {}", "+".bright_green(), path.green(), value.preview(max).green())
        }
        Difference::Invalid {
            actual,
            expected: Some(expected),
        } => format!(
            "{} {}: {} {} {}",
            "•".bright_yellow(),
            path.yellow(),
            actual.preview(max).yellow(),
            "→".bright_yellow(),
            expected.preview(max).yellow()
        ),
        Difference::Invalid {
            actual,
            expected: None,
        } => format!("{} {}: {}", "•".bright_yellow(), path.yellow(), actual.preview(max).yellow()),
        Difference::Deviation(_) => format!(
            "{} {}: {}",
            "±".bright_cyan(),
            path.cyan(),
            describe_deviation(difference).cyan()
        ),
        Difference::Unmatched(_) => format!(
            "{} {}: {}",
            "?".bright_magenta(),
            path.magenta(),
            difference.to_string().magenta()
        ),
    }
}

/// `+1 (expected 10)` from `Deviation(+1, 10)`.
fn describe_deviation(difference: &Difference) -> String {
    match difference.args().as_slice() {
        [diff, expected] => {
            let diff = match diff {
                Value::Number(n) if *n > 0.0 => format!("+{}", diff),
                other => other.to_string(),
            };
            format!("{} (expected {})", diff, expected)
        }
        _ => difference.to_string(),
    }
}

fn format_plain(error: &ValidationError, options: &OutputOptions) -> String {
    let mut output = error.clone().with_max_diff(options.max_diff).to_string();

    if options.summary {
        output.push_str("\n\n");
        output.push_str(&format_summary(&error.differences().stats()));
    }

    output
}

fn format_json(error: Option<&ValidationError>) -> Result<String, OutputError> {
    let stats = error.map(|e| e.differences().stats()).unwrap_or_default();
    let differences: Vec<serde_json::Value> = error
        .map(|e| labelled(e.differences()))
        .unwrap_or_default()
        .into_iter()
        .map(|(path, difference)| {
            json!({
                "path": path,
                "kind": difference.kind().to_lowercase(),
                "args": difference.args().iter().map(value_to_json).collect::<Vec<_>>(),
                "display": difference.to_string(),
            })
        })
        .collect();

    let stats = serde_json::to_value(stats).map_err(OutputError::json_serialization_error)?;
    let output = json!({
        "valid": error.is_none(),
        "message": error.map(|e| e.message()),
        "differences": differences,
        "stats": stats,
    });

    serde_json::to_string_pretty(&output).map_err(OutputError::json_serialization_error)
}

/// Each difference with a readable path to where it was reported.
fn labelled(differences: &Differences) -> Vec<(String, &Difference)> {
    let mut out = Vec::new();
    match differences {
        Differences::Flat(items) => {
            for (index, difference) in items.iter().enumerate() {
                out.push((format!("[{}]", index), difference));
            }
        }
        Differences::Keyed(entries) => {
            for (key, report) in entries {
                collect_labelled(report, vec![format_key(key)], &mut out);
            }
        }
    }
    out
}

fn collect_labelled<'a>(report: &'a Report, path: Vec<String>, out: &mut Vec<(String, &'a Difference)>) {
    match report {
        Report::Single(difference) => out.push((format_path(&path), difference)),
        Report::Group(items) => {
            let label = format_path(&path);
            out.extend(items.iter().map(|d| (label.clone(), d)));
        }
        Report::Keyed(entries) => {
            for (key, nested) in entries {
                let mut nested_path = path.clone();
                nested_path.push(format_key(key));
                collect_labelled(nested, nested_path, out);
            }
        }
    }
}

/// Mapping keys render bare; sequence positions render as `[i, j]`.
fn format_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.clone(),
        Value::List(parts) => {
            let parts: Vec<String> = parts.iter().map(Value::to_string).collect();
            format!("[{}]", parts.join(", "))
        }
        other => other.to_string(),
    }
}

/// Joins path components with dots, attaching `[...]` components directly.
///
/// - `["user", "name"]` → `"user.name"`
/// - `["items", "[0, 1]"]` → `"items[0, 1]"`
fn format_path(path: &[String]) -> String {
    let mut result = String::new();
    for (i, component) in path.iter().enumerate() {
        if i > 0 && !component.starts_with('[') {
            result.push('.');
        }
        result.push_str(component);
    }
    result
}

fn format_summary(stats: &ReportStats) -> String {
    if stats.is_empty() {
        return "Summary: No differences".to_string();
    }

    let counts = [
        (stats.missing, "missing"),
        (stats.extra, "extra"),
        (stats.invalid, "invalid"),
        (stats.deviation, "deviation"),
        (stats.unmatched, "unmatched allowance"),
    ];
    let parts: Vec<String> = counts
        .iter()
        .filter(|(count, _)| *count > 0)
        .map(|(count, label)| format!("{} {}", count, label))
        .collect();

    format!("Summary: {}", parts.join(", "))
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => json!(null),
        Value::Bool(b) => json!(b),
        Value::Number(n) => json!(n),
        Value::String(s) => json!(s),
        Value::List(items) => json!(items.iter().map(value_to_json).collect::<Vec<_>>()),
        Value::Set(items) => json!(items.iter().map(value_to_json).collect::<Vec<_>>()),
        Value::Map(map) => {
            let obj: serde_json::Map<String, serde_json::Value> = map
                .iter()
                .map(|(k, v)| (format_key(k), value_to_json(v)))
                .collect();
            json!(obj)
        }
    }
}
