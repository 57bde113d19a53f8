//! Requirements: what the data is checked against.
//!
//! The shape of a requirement selects the comparison strategy. Requirements
//! are usually written in code, or read from a data file with
//! [`Requirement::from_value`].
//!
//! # Examples
//!
//! ```
//! use datacheck_rs::{Requirement, Value};
//!
//! let positive = Requirement::test("positive", |v| v.as_f64().map_or(false, |n| n > 0.0));
//! let pattern = Requirement::pattern(r"^\d{3}$").unwrap();
//! let exact = Requirement::from(Value::from("abc"));
//!
//! assert_eq!(positive.kind(), "predicate");
//! assert_eq!(pattern.kind(), "pattern");
//! assert_eq!(exact.kind(), "equality");
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::rc::Rc;

use regex::Regex;

use crate::difference::Difference;
use crate::error::CompareError;
use crate::value::Value;

/// What a predicate returned for one element.
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Pass,
    Fail,
    /// A specific difference to report in place of `Invalid`.
    Report(Difference),
    /// Anything else; comparing with it is an error.
    Other(Value),
}

impl From<bool> for Verdict {
    fn from(passed: bool) -> Self {
        if passed {
            Verdict::Pass
        } else {
            Verdict::Fail
        }
    }
}

impl From<Difference> for Verdict {
    fn from(difference: Difference) -> Self {
        Verdict::Report(difference)
    }
}

impl From<Value> for Verdict {
    fn from(value: Value) -> Self {
        match value {
            Value::Bool(passed) => passed.into(),
            other => Verdict::Other(other),
        }
    }
}

/// Per-element result once a predicate has been invoked.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Outcome {
    Pass,
    Fail,
    Report(Difference),
}

type PredicateFn = dyn Fn(&[Value]) -> anyhow::Result<Verdict>;

/// A named test applied to each element.
///
/// The arguments are the element itself, or its items when the element is
/// a list or set. A predicate that returns an error counts as failing.
#[derive(Clone)]
pub struct Predicate {
    name: String,
    func: Rc<PredicateFn>,
}

impl Predicate {
    pub fn new<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value]) -> anyhow::Result<Verdict> + 'static,
    {
        Self {
            name: name.into(),
            func: Rc::new(func),
        }
    }

    /// A predicate over a single value; several arguments arrive as one list.
    pub fn test<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> bool + 'static,
    {
        Self::new(name, move |args: &[Value]| {
            let passed = match args {
                [single] => func(single),
                _ => func(&Value::List(args.to_vec())),
            };
            Ok(passed.into())
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn invoke(&self, element: &Value) -> Result<Outcome, CompareError> {
        let result = match element {
            Value::List(items) => (self.func)(items),
            Value::Set(items) => (self.func)(&items.iter().cloned().collect::<Vec<_>>()),
            other => (self.func)(std::slice::from_ref(other)),
        };

        match result {
            Ok(Verdict::Pass) => Ok(Outcome::Pass),
            Ok(Verdict::Fail) => Ok(Outcome::Fail),
            Ok(Verdict::Report(difference)) => Ok(Outcome::Report(difference)),
            Ok(Verdict::Other(value)) => Err(CompareError::BadPredicateReturn {
                name: self.name.clone(),
                value: value.to_string(),
            }),
            Err(err) => {
                tracing::trace!(predicate = %self.name, error = %err, "predicate failed");
                Ok(Outcome::Fail)
            }
        }
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Predicate").field("name", &self.name).finish()
    }
}

/// Strategy for requirement arrays read from data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ArrayStrategy {
    /// Arrays are ordered sequences, aligned element by element.
    #[default]
    Sequence,
    /// Arrays are sets: only membership matters.
    Unordered,
}

/// Configuration for reading requirements from values.
#[derive(Debug, Clone, Default)]
pub struct RequirementConfig {
    pub array_strategy: ArrayStrategy,
}

/// A requirement; its variant selects the comparison strategy.
#[derive(Debug, Clone)]
pub enum Requirement {
    Sequence(Vec<Value>),
    Set(BTreeSet<Value>),
    Predicate(Predicate),
    Pattern(Regex),
    Mapping(BTreeMap<Value, Requirement>),
    Equal(Value),
}

impl Requirement {
    pub fn sequence<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Requirement::Sequence(items.into_iter().map(Into::into).collect())
    }

    pub fn set<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Requirement::Set(items.into_iter().map(Into::into).collect())
    }

    pub fn predicate<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&[Value]) -> anyhow::Result<Verdict> + 'static,
    {
        Requirement::Predicate(Predicate::new(name, func))
    }

    pub fn test<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&Value) -> bool + 'static,
    {
        Requirement::Predicate(Predicate::test(name, func))
    }

    pub fn pattern(pattern: &str) -> Result<Self, CompareError> {
        Ok(Requirement::Pattern(Regex::new(pattern)?))
    }

    pub fn mapping<I, K, R>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, R)>,
        K: Into<Value>,
        R: Into<Requirement>,
    {
        Requirement::Mapping(
            entries
                .into_iter()
                .map(|(k, r)| (k.into(), r.into()))
                .collect(),
        )
    }

    pub fn equal(value: impl Into<Value>) -> Self {
        Requirement::Equal(value.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Requirement::Sequence(_) => "sequence",
            Requirement::Set(_) => "set",
            Requirement::Predicate(_) => "predicate",
            Requirement::Pattern(_) => "pattern",
            Requirement::Mapping(_) => "mapping",
            Requirement::Equal(_) => "equality",
        }
    }

    /// Reads a requirement from a parsed value.
    ///
    /// Maps become mapping requirements (recursively), sets become set
    /// requirements, arrays follow `config.array_strategy`, and everything
    /// else is compared by equality.
    pub fn from_value(value: Value, config: &RequirementConfig) -> Self {
        match value {
            Value::Map(map) => Requirement::Mapping(
                map.into_iter()
                    .map(|(key, value)| (key, Requirement::from_value(value, config)))
                    .collect(),
            ),
            Value::Set(items) => Requirement::Set(items),
            Value::List(items) => match config.array_strategy {
                ArrayStrategy::Sequence => Requirement::Sequence(items),
                ArrayStrategy::Unordered => Requirement::Set(items.into_iter().collect()),
            },
            other => Requirement::Equal(other),
        }
    }
}

impl From<Value> for Requirement {
    fn from(value: Value) -> Self {
        Requirement::from_value(value, &RequirementConfig::default())
    }
}

impl From<&str> for Requirement {
    fn from(s: &str) -> Self {
        Requirement::Equal(Value::from(s))
    }
}

impl From<Predicate> for Requirement {
    fn from(predicate: Predicate) -> Self {
        Requirement::Predicate(predicate)
    }
}

impl From<Regex> for Requirement {
    fn from(regex: Regex) -> Self {
        Requirement::Pattern(regex)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_value_strategies() {
        let value = Value::map([("ids", Value::list([3, 1, 2]))]);

        let ordered = Requirement::from_value(value.clone(), &RequirementConfig::default());
        let Requirement::Mapping(entries) = ordered else {
            panic!("expected mapping");
        };
        assert_eq!(entries[&Value::from("ids")].kind(), "sequence");

        let config = RequirementConfig {
            array_strategy: ArrayStrategy::Unordered,
        };
        let Requirement::Mapping(entries) = Requirement::from_value(value, &config) else {
            panic!("expected mapping");
        };
        assert_eq!(entries[&Value::from("ids")].kind(), "set");
    }

    #[test]
    fn test_invoke_unpacks_list_elements() {
        let predicate = Predicate::new("ordered pair", |args: &[Value]| {
            Ok(match args {
                [a, b] => (a < b).into(),
                _ => Verdict::Fail,
            })
        });
        assert_eq!(predicate.invoke(&Value::list([1, 2])).unwrap(), Outcome::Pass);
        assert_eq!(predicate.invoke(&Value::list([2, 1])).unwrap(), Outcome::Fail);
    }

    #[test]
    fn test_invoke_error_counts_as_failure() {
        let predicate = Predicate::new("broken", |_: &[Value]| Err(anyhow::anyhow!("boom")));
        assert_eq!(predicate.invoke(&Value::from(1)).unwrap(), Outcome::Fail);
    }

    #[test]
    fn test_invoke_rejects_other_returns() {
        let predicate = Predicate::new("odd", |_: &[Value]| Ok(Value::from(7).into()));
        assert!(matches!(
            predicate.invoke(&Value::from(1)),
            Err(CompareError::BadPredicateReturn { .. })
        ));
    }

    #[test]
    fn test_pattern_rejects_bad_regex() {
        assert!(matches!(Requirement::pattern("("), Err(CompareError::Pattern(_))));
    }
}
