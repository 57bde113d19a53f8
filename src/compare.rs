//! Comparison engine.
//!
//! [`compare`] dispatches on the shape of the requirement: sequences are
//! aligned by position, sets by membership, predicates and patterns are
//! applied per element, mappings recurse per key, and anything else is
//! compared for equality.
//!
//! Data that was not found at all is passed as `None`. For sequences, sets
//! and mappings it reads as an empty collection. For per-element strategies
//! it is a single null element, and for equality it yields `Missing`.
//!
//! # Examples
//!
//! ```
//! use datacheck_rs::{compare, Difference, Report, Requirement, Value};
//!
//! let data = Value::list(["a", "b", "x"]);
//! let requirement = Requirement::set(["a", "b", "c"]);
//!
//! let report = compare(Some(&data), &requirement).unwrap();
//! assert_eq!(
//!     report,
//!     Some(Report::Group(vec![Difference::missing("c"), Difference::extra("x")]))
//! );
//! ```

use std::collections::{BTreeMap, BTreeSet};

use regex::Regex;

use crate::difference::{make_difference, Difference};
use crate::error::CompareError;
use crate::report::Report;
use crate::requirement::{Outcome, Predicate, Requirement};
use crate::value::Value;

static NOT_FOUND_ELEMENT: Value = Value::Null;

/// Compares data against a requirement.
///
/// # Arguments
///
/// * `data` - The observed data, or `None` when it was not found
/// * `requirement` - The requirement to check
///
/// # Returns
///
/// `None` when the data satisfies the requirement, otherwise a report of
/// the differences. A single non-collection value produces
/// [`Report::Single`]; collections produce [`Report::Group`]; sequences and
/// mappings produce [`Report::Keyed`].
///
/// # Errors
///
/// Returns an error when the data cannot be compared with the requirement
/// (a string against a sequence, a non-mapping against a mapping) or when a
/// predicate returns something other than a verdict.
pub fn compare(data: Option<&Value>, requirement: &Requirement) -> Result<Option<Report>, CompareError> {
    tracing::trace!(strategy = requirement.kind(), "comparing");

    match requirement {
        Requirement::Sequence(items) => Ok(compare_sequence(data, items)?.map(Report::Keyed)),
        Requirement::Set(items) => Ok(collect_report(compare_set(data, items), false)),
        Requirement::Predicate(predicate) => compare_predicate(data, predicate),
        Requirement::Pattern(regex) => Ok(compare_pattern(data, regex)),
        Requirement::Mapping(mapping) => Ok(compare_mapping(data, mapping)?.map(Report::Keyed)),
        Requirement::Equal(expected) => Ok(compare_equality(data, Some(expected))),
    }
}

/// Elements of `data` for per-element strategies; `true` marks a lone value.
fn elements(data: Option<&Value>) -> (Vec<&Value>, bool) {
    match data {
        None => (vec![&NOT_FOUND_ELEMENT], true),
        Some(Value::List(items)) => (items.iter().collect(), false),
        Some(Value::Set(items)) => (items.iter().collect(), false),
        Some(other) => (vec![other], true),
    }
}

fn collect_report(mut differences: Vec<Difference>, single: bool) -> Option<Report> {
    if differences.is_empty() {
        return None;
    }
    if single && differences.len() == 1 {
        return differences.pop().map(Report::Single);
    }
    Some(Report::Group(differences))
}

fn position_key(data_index: usize, requirement_index: usize) -> Value {
    Value::List(vec![Value::from(data_index), Value::from(requirement_index)])
}

/// Aligns data with a required sequence.
///
/// Keys are `[data_index, requirement_index]` pairs. Inside each run between
/// matched elements, paired positions are `Invalid`, then leftover data
/// elements are `Extra` and leftover requirement elements are `Missing`.
pub fn compare_sequence(
    data: Option<&Value>,
    requirement: &[Value],
) -> Result<Option<BTreeMap<Value, Report>>, CompareError> {
    let data: &[Value] = match data {
        None => &[],
        Some(Value::List(items)) => items,
        Some(Value::String(_)) => return Err(CompareError::StringAsSequence),
        Some(other) => {
            return Err(CompareError::NotASequence {
                type_name: other.type_name().to_string(),
            })
        }
    };

    let matches = matching_positions(data, requirement);
    let mut differences = BTreeMap::new();
    let (mut i, mut j) = (0, 0);

    let end = std::iter::once((data.len(), requirement.len()));
    for (next_i, next_j) in matches.into_iter().chain(end) {
        while i < next_i && j < next_j {
            let difference = Difference::invalid_expected(data[i].clone(), requirement[j].clone());
            differences.insert(position_key(i, j), Report::Single(difference));
            i += 1;
            j += 1;
        }
        while i < next_i {
            differences.insert(position_key(i, j), Report::Single(Difference::Extra(data[i].clone())));
            i += 1;
        }
        while j < next_j {
            differences.insert(
                position_key(i, j),
                Report::Single(Difference::Missing(requirement[j].clone())),
            );
            j += 1;
        }
        i = next_i + 1;
        j = next_j + 1;
    }

    tracing::debug!(differences = differences.len(), "sequence aligned");
    Ok((!differences.is_empty()).then_some(differences))
}

/// Index pairs of a longest common subsequence, in increasing order.
///
/// Equal leading and trailing runs are matched directly before the
/// quadratic table is built for the middle.
fn matching_positions(a: &[Value], b: &[Value]) -> Vec<(usize, usize)> {
    let prefix = a.iter().zip(b).take_while(|(x, y)| x == y).count();
    let suffix = a[prefix..]
        .iter()
        .rev()
        .zip(b[prefix..].iter().rev())
        .take_while(|(x, y)| x == y)
        .count();

    let middle_a = &a[prefix..a.len() - suffix];
    let middle_b = &b[prefix..b.len() - suffix];
    let (n, m) = (middle_a.len(), middle_b.len());

    // lengths[i][j]: common subsequence length of middle_a[i..] and middle_b[j..]
    let mut lengths = vec![vec![0usize; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lengths[i][j] = if middle_a[i] == middle_b[j] {
                lengths[i + 1][j + 1] + 1
            } else {
                lengths[i + 1][j].max(lengths[i][j + 1])
            };
        }
    }

    let mut pairs: Vec<(usize, usize)> = (0..prefix).map(|k| (k, k)).collect();
    let (mut i, mut j) = (0, 0);
    while i < n && j < m {
        if middle_a[i] == middle_b[j] {
            pairs.push((prefix + i, prefix + j));
            i += 1;
            j += 1;
        } else if lengths[i + 1][j] >= lengths[i][j + 1] {
            i += 1;
        } else {
            j += 1;
        }
    }
    pairs.extend((0..suffix).map(|k| (a.len() - suffix + k, b.len() - suffix + k)));
    pairs
}

/// Compares data against a set by membership: `Missing` for required
/// members not observed, then `Extra` for observed values not required.
/// Mapping data contributes its keys.
pub fn compare_set(data: Option<&Value>, requirement: &BTreeSet<Value>) -> Vec<Difference> {
    let observed: BTreeSet<&Value> = match data {
        None => BTreeSet::new(),
        Some(Value::List(items)) => items.iter().collect(),
        Some(Value::Set(items)) => items.iter().collect(),
        Some(Value::Map(entries)) => entries.keys().collect(),
        Some(other) => BTreeSet::from([other]),
    };

    let missing = requirement
        .iter()
        .filter(|value| !observed.contains(value))
        .map(|value| Difference::Missing(value.clone()));
    let extra = observed
        .iter()
        .filter(|value| !requirement.contains(**value))
        .map(|value| Difference::Extra((*value).clone()));

    missing.chain(extra).collect()
}

fn compare_predicate(data: Option<&Value>, predicate: &Predicate) -> Result<Option<Report>, CompareError> {
    let (elements, single) = elements(data);
    let mut differences = Vec::new();

    for element in elements {
        match predicate.invoke(element)? {
            Outcome::Pass => {}
            Outcome::Fail => differences.push(Difference::invalid(element.clone())),
            Outcome::Report(difference) => differences.push(difference),
        }
    }

    Ok(collect_report(differences, single))
}

fn compare_pattern(data: Option<&Value>, regex: &Regex) -> Option<Report> {
    let (elements, single) = elements(data);
    let differences = elements
        .into_iter()
        .filter(|element| !matches!(element, Value::String(s) if regex.is_match(s)))
        .map(|element| Difference::invalid(element.clone()))
        .collect();

    collect_report(differences, single)
}

/// Compares by equality. `expected` is `None` for data keys that have no
/// requirement at all.
fn compare_equality(data: Option<&Value>, expected: Option<&Value>) -> Option<Report> {
    let elements: Vec<&Value> = match data {
        Some(Value::List(items)) => items.iter().collect(),
        Some(Value::Set(items)) => items.iter().collect(),
        single => {
            return (single != expected).then(|| Report::Single(make_difference(single, expected, true)));
        }
    };

    let differences = elements
        .into_iter()
        .filter(|element| Some(*element) != expected)
        .map(|element| make_difference(Some(element), expected, false))
        .collect();

    collect_report(differences, false)
}

/// Key/value pairs of mapping data: a map, or a list of two-element lists.
fn key_value_pairs(data: Option<&Value>) -> Result<Vec<(&Value, &Value)>, CompareError> {
    let not_a_mapping = |value: &Value| CompareError::NotAMapping {
        type_name: value.type_name().to_string(),
    };

    match data {
        None => Ok(Vec::new()),
        Some(Value::Map(map)) => Ok(map.iter().collect()),
        Some(Value::List(items)) => items
            .iter()
            .map(|item| match item {
                Value::List(pair) if pair.len() == 2 => Ok((&pair[0], &pair[1])),
                other => Err(not_a_mapping(other)),
            })
            .collect(),
        Some(other) => Err(not_a_mapping(other)),
    }
}

/// Compares mapping data key by key.
///
/// Data keys without a requirement are compared by equality against a
/// requirement that was not found, so they report as `Extra` (or as a
/// deviation from nothing for numbers). Required keys absent from the data
/// are compared with data that was not found.
///
/// # Returns
///
/// `None` when no key differs, otherwise the reports by key.
pub fn compare_mapping(
    data: Option<&Value>,
    requirement: &BTreeMap<Value, Requirement>,
) -> Result<Option<BTreeMap<Value, Report>>, CompareError> {
    let pairs = key_value_pairs(data)?;
    let mut reports = BTreeMap::new();
    let mut seen = BTreeSet::new();

    for (key, actual) in pairs {
        seen.insert(key);
        let report = match requirement.get(key) {
            Some(required) => compare(Some(actual), required)?,
            None => compare_equality(Some(actual), None),
        };
        if let Some(report) = report {
            reports.insert(key.clone(), report);
        }
    }

    for (key, required) in requirement {
        if seen.contains(key) {
            continue;
        }
        if let Some(report) = compare(None, required)? {
            reports.insert(key.clone(), report);
        }
    }

    tracing::debug!(keys = reports.len(), "mapping compared");
    Ok((!reports.is_empty()).then_some(reports))
}
