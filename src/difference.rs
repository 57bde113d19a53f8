//! Typed differences between observed data and a requirement.
//!
//! Every reported discrepancy is one of a small, closed set of kinds. Each
//! kind keeps the arguments it was built from so that allowances can
//! inspect them, and renders as `Kind(arg, ...)`.
//!
//! # Examples
//!
//! ```
//! use datacheck_rs::{make_difference, Difference, Value};
//!
//! let diff = make_difference(Some(&Value::from(5)), Some(&Value::from(6)), true);
//! assert_eq!(diff.to_string(), "Deviation(-1, 6)");
//!
//! let missing = make_difference(None, Some(&Value::from("b")), true);
//! assert_eq!(missing, Difference::Missing(Value::from("b")));
//! ```

use std::fmt;

use crate::error::CompareError;
use crate::value::{format_number, write_joined, Value};

/// A single reported discrepancy.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Difference {
    /// An expected value that was not found in the data.
    Missing(Value),
    /// A value found in the data that was not expected.
    Extra(Value),
    /// A value that does not satisfy its requirement, with the expected
    /// value when one is meaningful.
    Invalid {
        actual: Value,
        expected: Option<Value>,
    },
    /// A numeric offset from an expected baseline.
    Deviation(Deviation),
    /// Allowed differences that were listed up front but never reported.
    Unmatched(Vec<Difference>),
}

/// A numeric difference and the value it deviates from.
///
/// Construct through [`Deviation::new`], which rejects a zero or empty
/// deviation from a meaningful baseline.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Deviation {
    diff: Value,
    expected: Value,
}

/// Numeric classification shared by the difference factory, the deviation
/// constructor and the deviation allowances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Magnitude {
    Number(f64),
    /// Null or the empty string.
    Empty,
    NotANumber,
    /// Anything without a numeric reading.
    Other,
}

pub fn magnitude(value: &Value) -> Magnitude {
    match value {
        Value::Null => Magnitude::Empty,
        Value::String(s) if s.is_empty() => Magnitude::Empty,
        Value::Number(n) if n.is_nan() => Magnitude::NotANumber,
        Value::Number(n) => Magnitude::Number(*n),
        Value::Bool(b) => Magnitude::Number(if *b { 1.0 } else { 0.0 }),
        _ => Magnitude::Other,
    }
}

impl Magnitude {
    fn is_empty(self) -> bool {
        matches!(self, Magnitude::Empty | Magnitude::NotANumber)
    }

    fn is_zero(self) -> bool {
        matches!(self, Magnitude::Number(n) if n == 0.0)
    }

    fn is_nonzero(self) -> bool {
        matches!(self, Magnitude::Number(n) if n != 0.0)
    }
}

impl Deviation {
    pub fn new(diff: impl Into<Value>, expected: impl Into<Value>) -> Result<Self, CompareError> {
        let diff = diff.into();
        let expected = expected.into();
        let d = magnitude(&diff);
        let e = magnitude(&expected);

        if (d.is_zero() && !e.is_empty()) || (d.is_empty() && e.is_nonzero()) {
            return Err(CompareError::InvalidDeviation {
                diff: render_signed(&diff),
                expected: expected.to_string(),
            });
        }

        Ok(Self { diff, expected })
    }

    pub fn diff(&self) -> &Value {
        &self.diff
    }

    pub fn expected(&self) -> &Value {
        &self.expected
    }
}

fn render_signed(value: &Value) -> String {
    match value {
        Value::Number(n) if *n > 0.0 => format!("+{}", format_number(*n)),
        other => other.to_string(),
    }
}

impl Difference {
    pub fn missing(value: impl Into<Value>) -> Self {
        Self::Missing(value.into())
    }

    pub fn extra(value: impl Into<Value>) -> Self {
        Self::Extra(value.into())
    }

    pub fn invalid(actual: impl Into<Value>) -> Self {
        Self::Invalid {
            actual: actual.into(),
            expected: None,
        }
    }

    pub fn invalid_expected(actual: impl Into<Value>, expected: impl Into<Value>) -> Self {
        Self::Invalid {
            actual: actual.into(),
            expected: Some(expected.into()),
        }
    }

    pub fn deviation(diff: impl Into<Value>, expected: impl Into<Value>) -> Result<Self, CompareError> {
        Deviation::new(diff, expected).map(Self::Deviation)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Difference::Missing(_) => "Missing",
            Difference::Extra(_) => "Extra",
            Difference::Invalid { .. } => "Invalid",
            Difference::Deviation(_) => "Deviation",
            Difference::Unmatched(_) => "Unmatched",
        }
    }

    /// The constructor arguments, in order.
    pub fn args(&self) -> Vec<Value> {
        match self {
            Difference::Missing(value) | Difference::Extra(value) => vec![value.clone()],
            Difference::Invalid { actual, expected } => {
                let mut args = vec![actual.clone()];
                args.extend(expected.clone());
                args
            }
            Difference::Deviation(deviation) => {
                vec![deviation.diff.clone(), deviation.expected.clone()]
            }
            Difference::Unmatched(_) => vec![Value::String(self.to_string())],
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Difference::Missing(_))
    }

    pub fn is_extra(&self) -> bool {
        matches!(self, Difference::Extra(_))
    }
}

impl fmt::Display for Difference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Difference::Missing(value) => write!(f, "Missing({})", value),
            Difference::Extra(value) => write!(f, "Extra({})", value),
            Difference::Invalid {
                actual,
                expected: None,
            } => write!(f, "Invalid({})", actual),
            Difference::Invalid {
                actual,
                expected: Some(expected),
            } => write!(f, "Invalid({}, {})", actual, expected),
            Difference::Deviation(deviation) => write!(
                f,
                "Deviation({}, {})",
                render_signed(&deviation.diff),
                deviation.expected
            ),
            Difference::Unmatched(allowed) => {
                write!(f, "allowed differences not found: [")?;
                write_joined(f, allowed.iter())?;
                write!(f, "]")
            }
        }
    }
}

/// Builds the appropriate difference for an actual/expected pair.
///
/// `None` on either side means the value was not found at all, which is
/// distinct from a found null.
///
/// # Arguments
///
/// * `actual` - The observed value, if any
/// * `expected` - The required value, if any
/// * `show_expected` - Whether an `Invalid` result should carry the expected value
///
/// # Returns
///
/// A `Deviation` when both sides read as numbers or empties (not both
/// empty), otherwise `Missing`, `Extra` or `Invalid`.
pub fn make_difference(actual: Option<&Value>, expected: Option<&Value>, show_expected: bool) -> Difference {
    if let Some(deviation) = numeric_difference(actual, expected) {
        return Difference::Deviation(deviation);
    }

    match (actual, expected) {
        (None, Some(expected)) => Difference::Missing(expected.clone()),
        (Some(actual), None) => Difference::Extra(actual.clone()),
        (Some(actual), Some(expected)) => Difference::Invalid {
            actual: actual.clone(),
            expected: show_expected.then(|| expected.clone()),
        },
        (None, None) => Difference::invalid(Value::Null),
    }
}

/// Numeric reading of one side: `Some(None)` for empty, `None` when the
/// value has no numeric reading.
fn baseline(value: Option<&Value>) -> Option<Option<f64>> {
    match value {
        None | Some(Value::Null) => Some(None),
        Some(value) => match magnitude(value) {
            Magnitude::Number(n) => Some(Some(n)),
            _ => None,
        },
    }
}

fn numeric_difference(actual: Option<&Value>, expected: Option<&Value>) -> Option<Deviation> {
    let expected_value = expected.cloned().unwrap_or(Value::Null);

    match (baseline(actual)?, baseline(expected)?) {
        (None, None) => None,
        (Some(a), e) => Deviation::new(a - e.unwrap_or(0.0), expected_value).ok(),
        (None, Some(e)) if e == 0.0 => Deviation::new(Value::Null, expected_value).ok(),
        (None, Some(e)) => Deviation::new(-e, expected_value).ok(),
    }
}
