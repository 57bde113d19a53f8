//! Custom error types for datacheck.

use std::fmt;

use crate::report::{Differences, Report};

#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    #[error("uncomparable types: string and sequence")]
    StringAsSequence,

    #[error("expected sequence type, but got {type_name}")]
    NotASequence { type_name: String },

    #[error("data must be a mapping or a list of key-value pairs, got {type_name}")]
    NotAMapping { type_name: String },

    #[error("predicate {name} returned {value}, should return true, false or a difference")]
    BadPredicateReturn { name: String, value: String },

    #[error("invalid deviation {diff} from {expected}: zero or empty deviations need an empty baseline")]
    InvalidDeviation { diff: String, expected: String },

    #[error("differences must be a list or a mapping, not a single difference: {difference}")]
    BareDifference { difference: String },

    #[error("invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, thiserror::Error)]
pub enum AllowanceError {
    #[error("tolerance should not be negative, got {value}")]
    NegativeTolerance { value: f64 },

    #[error("lower bound {lower} must not exceed upper bound {upper}")]
    InvertedRange { lower: f64, upper: f64 },

    #[error("{input} differences filtered into {output} differences; filters must keep the shape of their input")]
    ShapeMismatch {
        input: &'static str,
        output: &'static str,
    },

    #[error("a keyed catalog of allowed differences cannot match flat differences")]
    CatalogShape,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Failed to read file {path}: {source}")]
    ReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid JSON in {path}: {source}")]
    JsonError {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid YAML in {path}: {source}")]
    YamlError {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid TOML in {path}: {source}")]
    TomlError {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Could not detect file format for {path}")]
    UnknownFormat { path: String },
}

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Failed to serialize to JSON: {source}")]
    JsonSerializationError {
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum DatacheckError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Compare(#[from] CompareError),

    #[error(transparent)]
    Allowance(#[from] AllowanceError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Output(#[from] OutputError),

    #[error("Invalid configuration: {message}")]
    ConfigError { message: String },
}

impl ParseError {
    pub fn file_not_found(path: impl Into<String>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    pub fn read_error(path: impl Into<String>, source: std::io::Error) -> Self {
        Self::ReadError {
            path: path.into(),
            source,
        }
    }

    pub fn json_error(path: impl Into<String>, source: serde_json::Error) -> Self {
        Self::JsonError {
            path: path.into(),
            source,
        }
    }

    pub fn yaml_error(path: impl Into<String>, source: serde_yaml::Error) -> Self {
        Self::YamlError {
            path: path.into(),
            source,
        }
    }

    pub fn toml_error(path: impl Into<String>, source: toml::de::Error) -> Self {
        Self::TomlError {
            path: path.into(),
            source,
        }
    }

    pub fn unknown_format(path: impl Into<String>) -> Self {
        Self::UnknownFormat { path: path.into() }
    }
}

impl OutputError {
    pub fn json_serialization_error(source: serde_json::Error) -> Self {
        Self::JsonSerializationError { source }
    }
}

impl DatacheckError {
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// The validation failure carried by this error, if that is what it is.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(error) => Some(error),
            _ => None,
        }
    }
}

/// A failed validation: a message plus the collection of differences found.
///
/// The rendered message is built on every request, so changes made through
/// the setters (for example by an allowance) always show up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    message: String,
    differences: Differences,
    max_diff: Option<usize>,
}

const TRUNCATION_NOTE: &str = "Truncated (too long). Set max_diff to None for full message.";

impl ValidationError {
    /// Default limit on the rendered length of the difference lines.
    pub const DEFAULT_MAX_DIFF: Option<usize> = Some(80 * 8);

    pub fn new(message: impl Into<String>, differences: impl Into<Differences>) -> Self {
        Self {
            message: message.into(),
            differences: differences.into(),
            max_diff: Self::DEFAULT_MAX_DIFF,
        }
    }

    /// Builds an error from a comparison report; a lone difference is rejected.
    pub fn try_from_report(message: impl Into<String>, report: Report) -> Result<Self, CompareError> {
        Ok(Self::new(message, Differences::try_from(report)?))
    }

    pub fn with_max_diff(mut self, max_diff: Option<usize>) -> Self {
        self.max_diff = max_diff;
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn differences(&self) -> &Differences {
        &self.differences
    }

    pub fn into_differences(self) -> Differences {
        self.differences
    }

    pub fn max_diff(&self) -> Option<usize> {
        self.max_diff
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = message.into();
    }

    pub fn set_differences(&mut self, differences: impl Into<Differences>) {
        self.differences = differences.into();
    }

    pub fn set_max_diff(&mut self, max_diff: Option<usize>) {
        self.max_diff = max_diff;
    }

    fn lines(&self) -> (char, Vec<String>, char) {
        match &self.differences {
            Differences::Flat(items) => (
                '[',
                items.iter().map(|d| format!("    {},", d)).collect(),
                ']',
            ),
            Differences::Keyed(entries) => (
                '{',
                entries
                    .iter()
                    .map(|(key, report)| format!("    {}: {},", key, report))
                    .collect(),
                '}',
            ),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let count = self.differences.len();
        let plural = if count == 1 { "" } else { "s" };
        let (open, lines, close) = self.lines();

        write!(f, "{} ({} difference{}): {}", self.message, count, plural, open)?;

        let mut used = 0;
        let mut truncated = false;
        for line in &lines {
            let cost = line.chars().count() + 1;
            if let Some(max) = self.max_diff {
                if used + cost > max {
                    truncated = true;
                    break;
                }
            }
            used += cost;
            write!(f, "\n{}", line)?;
        }

        if truncated {
            write!(f, "\n    ...")?;
        }
        write!(f, "\n{}", close)?;
        if truncated {
            write!(f, "\n{}", TRUNCATION_NOTE)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}
