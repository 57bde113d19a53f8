//! Allowances: composable rules that accept known differences.
//!
//! An allowance wraps a validation and removes the differences it accepts
//! from the resulting error. When nothing is left the error is suppressed.
//! Allowances combine with `&` (a difference must be accepted by both) and
//! `|` (accepted by either).
//!
//! # Examples
//!
//! ```
//! use datacheck_rs::allow::{allow_deviation, allow_missing};
//! use datacheck_rs::{validate, Requirement, Value};
//!
//! let data = Value::map([("a", 11), ("b", 20)]);
//! let requirement = Requirement::mapping([
//!     ("a", Requirement::equal(10)),
//!     ("b", Requirement::equal(20)),
//!     ("c", Requirement::equal("x")),
//! ]);
//!
//! let allowance = allow_deviation(2.0).unwrap() | allow_missing();
//! let result = allowance.guard(|| validate(&data, &requirement, None));
//! assert!(matches!(result, Ok(None)));
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::ops::{BitAnd, BitOr};
use std::rc::Rc;

use crate::difference::{magnitude, Difference, Magnitude};
use crate::error::{AllowanceError, DatacheckError, ValidationError};
use crate::filter::KeyFilter;
use crate::report::{Differences, Report};
use crate::value::Value;

type FilterFalseFn = dyn Fn(Differences) -> Differences;
type ElementFn = dyn Fn(Option<&Value>, &Difference) -> bool;

#[derive(Clone)]
enum Rule {
    /// Maps the full payload to the differences it does not accept.
    FilterFalse(Rc<FilterFalseFn>),
    /// Accepts one difference at a time, given the key it was reported under.
    Elementwise(Rc<ElementFn>),
    Specified(Rc<Catalog>),
    Limit(usize),
    All(Box<Rule>, Box<Rule>),
    Any(Box<Rule>, Box<Rule>),
}

/// Differences split by a rule.
struct Partition {
    allowed: Differences,
    remainder: Differences,
}

impl Rule {
    fn is_limit(&self) -> bool {
        matches!(self, Rule::Limit(_))
    }

    fn all(left: Rule, right: Rule) -> Rule {
        match (left, right) {
            (Rule::Elementwise(a), Rule::Elementwise(b)) => {
                Rule::Elementwise(Rc::new(move |key: Option<&Value>, difference: &Difference| {
                    a(key, difference) && b(key, difference)
                }))
            }
            (left, right) if left.is_limit() && !right.is_limit() => Rule::All(Box::new(right), Box::new(left)),
            (left, right) => Rule::All(Box::new(left), Box::new(right)),
        }
    }

    fn any(left: Rule, right: Rule) -> Rule {
        match (left, right) {
            (Rule::Elementwise(a), Rule::Elementwise(b)) => {
                Rule::Elementwise(Rc::new(move |key: Option<&Value>, difference: &Difference| {
                    a(key, difference) || b(key, difference)
                }))
            }
            (left, right) if left.is_limit() && !right.is_limit() => Rule::Any(Box::new(right), Box::new(left)),
            (left, right) => Rule::Any(Box::new(left), Box::new(right)),
        }
    }

    fn partition(&self, differences: Differences) -> Result<Partition, AllowanceError> {
        match self {
            Rule::FilterFalse(filterfalse) => {
                let input_shape = differences.shape();
                let remainder = filterfalse(differences.clone()).pruned();
                if remainder.shape() != input_shape {
                    return Err(AllowanceError::ShapeMismatch {
                        input: input_shape,
                        output: remainder.shape(),
                    });
                }
                let allowed = subtract(differences, &remainder);
                Ok(Partition { allowed, remainder })
            }
            Rule::Elementwise(accepts) => Ok(split_elementwise(differences, accepts.as_ref())),
            Rule::Specified(catalog) => split_specified(differences, catalog),
            Rule::Limit(limit) => Ok(split_limit(differences, *limit)),
            Rule::All(first, second) => {
                let a = first.partition(differences)?;
                let b = second.partition(a.allowed)?;
                Ok(Partition {
                    allowed: b.allowed,
                    remainder: a.remainder.merge(b.remainder),
                })
            }
            Rule::Any(first, second) => {
                let a = first.partition(differences)?;
                let b = second.partition(a.remainder)?;
                Ok(Partition {
                    allowed: a.allowed.merge(b.allowed),
                    remainder: b.remainder,
                })
            }
        }
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rule::FilterFalse(_) => write!(f, "FilterFalse"),
            Rule::Elementwise(_) => write!(f, "Elementwise"),
            Rule::Specified(catalog) => write!(f, "Specified({:?})", catalog),
            Rule::Limit(limit) => write!(f, "Limit({})", limit),
            Rule::All(a, b) => write!(f, "({:?} & {:?})", a, b),
            Rule::Any(a, b) => write!(f, "({:?} | {:?})", a, b),
        }
    }
}

/// What `filterfalse` accepted: everything in `all` not kept in `remainder`,
/// matched as a multiset per key.
fn subtract(all: Differences, remainder: &Differences) -> Differences {
    match (all, remainder) {
        (Differences::Flat(items), Differences::Flat(kept)) => {
            let mut take = multiset_taker(kept.iter().collect());
            Differences::Flat(items.into_iter().filter(|d| take(d)).collect())
        }
        (Differences::Keyed(entries), Differences::Keyed(kept)) => Differences::Keyed(subtract_entries(entries, kept)),
        (all, _) => all,
    }
}

fn subtract_entries(entries: BTreeMap<Value, Report>, kept: &BTreeMap<Value, Report>) -> BTreeMap<Value, Report> {
    let mut allowed = BTreeMap::new();
    for (key, report) in entries {
        if let Some(accepted) = subtract_report(report, kept.get(&key)) {
            allowed.insert(key, accepted);
        }
    }
    allowed
}

fn subtract_report(report: Report, kept: Option<&Report>) -> Option<Report> {
    match (report, kept) {
        (report, None) => Some(report),
        (Report::Keyed(entries), Some(Report::Keyed(kept))) => keyed(subtract_entries(entries, kept)),
        (report, Some(kept)) => {
            let mut take = multiset_taker(kept.differences());
            split_report(report, &mut |d: &Difference| take(d)).0
        }
    }
}

/// Returns true for a difference not found in `kept`, consuming one match otherwise.
fn multiset_taker(mut kept: Vec<&Difference>) -> impl FnMut(&Difference) -> bool + '_ {
    move |difference: &Difference| match kept.iter().position(|k| *k == difference) {
        Some(index) => {
            kept.remove(index);
            false
        }
        None => true,
    }
}

/// Splits one keyed entry into accepted and remaining parts of the same shape.
fn split_report(report: Report, accepts: &mut dyn FnMut(&Difference) -> bool) -> (Option<Report>, Option<Report>) {
    match report {
        Report::Single(difference) => {
            if accepts(&difference) {
                (Some(Report::Single(difference)), None)
            } else {
                (None, Some(Report::Single(difference)))
            }
        }
        Report::Group(items) => {
            let (allowed, remainder): (Vec<_>, Vec<_>) = items.into_iter().partition(|d| accepts(d));
            (group(allowed), group(remainder))
        }
        Report::Keyed(entries) => {
            let mut allowed = BTreeMap::new();
            let mut remainder = BTreeMap::new();
            for (key, report) in entries {
                let (a, r) = split_report(report, accepts);
                if let Some(a) = a {
                    allowed.insert(key.clone(), a);
                }
                if let Some(r) = r {
                    remainder.insert(key, r);
                }
            }
            (keyed(allowed), keyed(remainder))
        }
    }
}

fn group(items: Vec<Difference>) -> Option<Report> {
    (!items.is_empty()).then_some(Report::Group(items))
}

fn keyed(entries: BTreeMap<Value, Report>) -> Option<Report> {
    (!entries.is_empty()).then_some(Report::Keyed(entries))
}

fn split_entries<F>(entries: BTreeMap<Value, Report>, mut split: F) -> Partition
where
    F: FnMut(&Value, Report) -> (Option<Report>, Option<Report>),
{
    let mut allowed = BTreeMap::new();
    let mut remainder = BTreeMap::new();
    for (key, report) in entries {
        let (a, r) = split(&key, report);
        if let Some(a) = a {
            allowed.insert(key.clone(), a);
        }
        if let Some(r) = r {
            remainder.insert(key, r);
        }
    }
    Partition {
        allowed: Differences::Keyed(allowed),
        remainder: Differences::Keyed(remainder),
    }
}

fn split_elementwise(differences: Differences, accepts: &ElementFn) -> Partition {
    match differences {
        Differences::Flat(items) => {
            let (allowed, remainder): (Vec<_>, Vec<_>) = items.into_iter().partition(|d| accepts(None, d));
            Partition {
                allowed: Differences::Flat(allowed),
                remainder: Differences::Flat(remainder),
            }
        }
        Differences::Keyed(entries) => split_entries(entries, |key, report| {
            split_report(report, &mut |d: &Difference| accepts(Some(key), d))
        }),
    }
}

fn split_limit(differences: Differences, limit: usize) -> Partition {
    match differences {
        Differences::Flat(items) => {
            let empty = Differences::Flat(Vec::new());
            if items.len() <= limit {
                Partition {
                    allowed: Differences::Flat(items),
                    remainder: empty,
                }
            } else {
                Partition {
                    allowed: empty,
                    remainder: Differences::Flat(items),
                }
            }
        }
        Differences::Keyed(entries) => split_entries(entries, |_, report| {
            if report.len() <= limit {
                (Some(report), None)
            } else {
                (None, Some(report))
            }
        }),
    }
}

/// Differences that are expected up front, each allowed once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Catalog {
    /// Applies to a flat payload, or afresh to every key of a keyed one.
    Flat(Vec<Difference>),
    Keyed(BTreeMap<Value, Vec<Difference>>),
}

impl From<Difference> for Catalog {
    fn from(difference: Difference) -> Self {
        Catalog::Flat(vec![difference])
    }
}

impl From<Vec<Difference>> for Catalog {
    fn from(items: Vec<Difference>) -> Self {
        Catalog::Flat(items)
    }
}

impl From<BTreeMap<Value, Difference>> for Catalog {
    fn from(entries: BTreeMap<Value, Difference>) -> Self {
        Catalog::Keyed(entries.into_iter().map(|(k, d)| (k, vec![d])).collect())
    }
}

impl From<BTreeMap<Value, Vec<Difference>>> for Catalog {
    fn from(entries: BTreeMap<Value, Vec<Difference>>) -> Self {
        Catalog::Keyed(entries)
    }
}

/// Splits a report while consuming matching catalog entries.
fn consume(report: Report, allowed: &mut Vec<Difference>) -> (Option<Report>, Option<Report>) {
    split_report(report, &mut |difference: &Difference| {
        match allowed.iter().position(|a| a == difference) {
            Some(index) => {
                allowed.remove(index);
                true
            }
            None => false,
        }
    })
}

/// Attaches unconsumed catalog entries to a key's remainder.
fn with_unmatched(remainder: Option<Report>, unmatched: Vec<Difference>) -> Option<Report> {
    if unmatched.is_empty() {
        return remainder;
    }
    let note = Difference::Unmatched(unmatched);
    let mut items = remainder.map(Report::into_differences).unwrap_or_default();
    items.push(note);
    Some(Report::Group(items))
}

fn split_specified(differences: Differences, catalog: &Catalog) -> Result<Partition, AllowanceError> {
    match (differences, catalog) {
        (Differences::Flat(_), Catalog::Keyed(_)) => Err(AllowanceError::CatalogShape),
        (Differences::Flat(items), Catalog::Flat(catalog)) => {
            let mut unmatched = catalog.clone();
            let (allowed, remainder) = consume(Report::Group(items), &mut unmatched);
            let mut remainder = remainder.map(Report::into_differences).unwrap_or_default();
            if !unmatched.is_empty() {
                remainder.push(Difference::Unmatched(unmatched));
            }
            Ok(Partition {
                allowed: Differences::Flat(allowed.map(Report::into_differences).unwrap_or_default()),
                remainder: Differences::Flat(remainder),
            })
        }
        (Differences::Keyed(entries), catalog) => {
            let absent: Vec<(Value, Vec<Difference>)> = match catalog {
                Catalog::Keyed(by_key) => by_key
                    .iter()
                    .filter(|(key, items)| !entries.contains_key(*key) && !items.is_empty())
                    .map(|(key, items)| (key.clone(), items.clone()))
                    .collect(),
                Catalog::Flat(_) => Vec::new(),
            };

            let mut partition = split_entries(entries, |key, report| {
                let mut unmatched = match catalog {
                    Catalog::Flat(items) => items.clone(),
                    Catalog::Keyed(by_key) => by_key.get(key).cloned().unwrap_or_default(),
                };
                let (allowed, remainder) = consume(report, &mut unmatched);
                (allowed, with_unmatched(remainder, unmatched))
            });

            if let Differences::Keyed(remainder) = &mut partition.remainder {
                for (key, items) in absent {
                    remainder.insert(key, Report::Group(vec![Difference::Unmatched(items)]));
                }
            }
            Ok(partition)
        }
    }
}

/// A rule for accepting differences, with an optional message prefix.
#[derive(Clone)]
pub struct Allowance {
    rule: Rule,
    msg: Option<String>,
}

impl Allowance {
    /// Builds an allowance from a function that returns the differences it
    /// does not accept. The result must keep the shape of its input.
    pub fn from_filterfalse<F>(filterfalse: F) -> Self
    where
        F: Fn(Differences) -> Differences + 'static,
    {
        Self::from_rule(Rule::FilterFalse(Rc::new(filterfalse)))
    }

    /// Builds an allowance that accepts differences one at a time.
    ///
    /// The key is `None` for flat payloads; for nested reports it is the
    /// top-level key.
    pub fn elementwise<F>(accepts: F) -> Self
    where
        F: Fn(Option<&Value>, &Difference) -> bool + 'static,
    {
        Self::from_rule(Rule::Elementwise(Rc::new(accepts)))
    }

    fn from_rule(rule: Rule) -> Self {
        Self { rule, msg: None }
    }

    /// Sets the message prefixed to any error that still fails.
    ///
    /// Composing with `&` or `|` keeps the left operand's message, or the
    /// right one's when the left has none.
    pub fn with_msg(mut self, msg: impl Into<String>) -> Self {
        self.msg = Some(msg.into());
        self
    }

    pub fn msg(&self) -> Option<&str> {
        self.msg.as_deref()
    }

    /// Returns the differences this allowance does not accept.
    ///
    /// # Errors
    ///
    /// Fails when a rule changes the payload's shape or a catalog's shape
    /// does not fit the payload.
    pub fn filterfalse(&self, differences: Differences) -> Result<Differences, AllowanceError> {
        let input_shape = differences.shape();
        let remainder = self.rule.partition(differences)?.remainder.pruned();
        if remainder.shape() != input_shape {
            return Err(AllowanceError::ShapeMismatch {
                input: input_shape,
                output: remainder.shape(),
            });
        }
        Ok(remainder)
    }

    /// Applies the allowance to a validation error.
    ///
    /// # Returns
    ///
    /// `None` when every difference is accepted, otherwise the error with
    /// its differences reduced to the remainder.
    pub fn apply(&self, mut error: ValidationError) -> Result<Option<ValidationError>, AllowanceError> {
        let before = error.differences().len();
        let remainder = self.filterfalse(error.differences().clone())?;

        if remainder.is_empty() {
            tracing::debug!(rule = ?self.rule, differences = before, "all differences allowed");
            return Ok(None);
        }

        tracing::debug!(
            rule = ?self.rule,
            before,
            after = remainder.len(),
            "differences remain after allowance"
        );

        if let Some(msg) = &self.msg {
            let message = format!("{}: {}", msg, error.message());
            error.set_message(message);
        }
        error.set_differences(remainder);
        Ok(Some(error))
    }

    /// Runs a validation block under this allowance.
    ///
    /// Validation failures are reduced by the allowance; any other error
    /// passes through unchanged.
    ///
    /// # Returns
    ///
    /// `Some(value)` when the block succeeds and `None` when it failed only
    /// with accepted differences.
    pub fn guard<T, F>(&self, block: F) -> Result<Option<T>, DatacheckError>
    where
        F: FnOnce() -> Result<T, DatacheckError>,
    {
        match block() {
            Ok(value) => Ok(Some(value)),
            Err(DatacheckError::Validation(error)) => match self.apply(error)? {
                None => Ok(None),
                Some(remaining) => Err(remaining.into()),
            },
            Err(other) => Err(other),
        }
    }
}

impl fmt::Debug for Allowance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Allowance")
            .field("rule", &self.rule)
            .field("msg", &self.msg)
            .finish()
    }
}

impl BitAnd for Allowance {
    type Output = Allowance;

    fn bitand(self, rhs: Allowance) -> Allowance {
        Allowance {
            rule: Rule::all(self.rule, rhs.rule),
            msg: self.msg.or(rhs.msg),
        }
    }
}

impl BitOr for Allowance {
    type Output = Allowance;

    fn bitor(self, rhs: Allowance) -> Allowance {
        Allowance {
            rule: Rule::any(self.rule, rhs.rule),
            msg: self.msg.or(rhs.msg),
        }
    }
}

/// Accepts differences whose key satisfies `accepts`.
///
/// A list key (such as a sequence position) is unpacked into its parts;
/// differences from a flat payload are tested with a single null key.
pub fn allow_key<F>(accepts: F) -> Allowance
where
    F: Fn(&[Value]) -> bool + 'static,
{
    Allowance::elementwise(move |key, _| match key {
        Some(Value::List(parts)) => accepts(parts),
        Some(key) => accepts(std::slice::from_ref(key)),
        None => accepts(&[Value::Null]),
    })
}

/// Accepts differences whose key path matches a glob-style pattern; see
/// [`crate::filter`] for the syntax.
pub fn allow_key_pattern(pattern: &str) -> Allowance {
    KeyFilter::new().allow(pattern).into_allowance()
}

pub fn allow_error<F>(accepts: F) -> Allowance
where
    F: Fn(&Difference) -> bool + 'static,
{
    Allowance::elementwise(move |_, difference| accepts(difference))
}

/// Accepts differences whose constructor arguments satisfy `accepts`.
pub fn allow_args<F>(accepts: F) -> Allowance
where
    F: Fn(&[Value]) -> bool + 'static,
{
    Allowance::elementwise(move |_, difference| accepts(&difference.args()))
}

pub fn allow_missing() -> Allowance {
    allow_error(Difference::is_missing)
}

pub fn allow_extra() -> Allowance {
    allow_error(Difference::is_extra)
}

fn within(difference: &Difference, lower: f64, upper: f64, percent: bool) -> bool {
    let Difference::Deviation(deviation) = difference else {
        return false;
    };

    match (magnitude(deviation.diff()), magnitude(deviation.expected())) {
        (Magnitude::NotANumber, _) | (_, Magnitude::NotANumber) => false,
        (Magnitude::Empty, _) | (_, Magnitude::Empty) => true,
        (Magnitude::Number(diff), Magnitude::Number(expected)) => {
            let value = if percent {
                if expected == 0.0 {
                    return false;
                }
                diff / expected
            } else {
                diff
            };
            lower <= value && value <= upper
        }
        _ => false,
    }
}

fn symmetric(tolerance: f64) -> Result<(f64, f64), AllowanceError> {
    if !(tolerance >= 0.0) {
        return Err(AllowanceError::NegativeTolerance { value: tolerance });
    }
    Ok((-tolerance, tolerance))
}

fn ordered(lower: f64, upper: f64) -> Result<(f64, f64), AllowanceError> {
    if !(lower <= upper) {
        return Err(AllowanceError::InvertedRange { lower, upper });
    }
    Ok((lower, upper))
}

fn deviation_window(lower: f64, upper: f64, percent: bool) -> Allowance {
    allow_error(move |difference| within(difference, lower, upper, percent))
}

/// Accepts deviations within `-tolerance..=tolerance`.
pub fn allow_deviation(tolerance: f64) -> Result<Allowance, AllowanceError> {
    let (lower, upper) = symmetric(tolerance)?;
    Ok(deviation_window(lower, upper, false))
}

pub fn allow_deviation_range(lower: f64, upper: f64) -> Result<Allowance, AllowanceError> {
    let (lower, upper) = ordered(lower, upper)?;
    Ok(deviation_window(lower, upper, false))
}

/// Accepts deviations whose ratio to the expected value is within
/// `-tolerance..=tolerance`.
pub fn allow_percent_deviation(tolerance: f64) -> Result<Allowance, AllowanceError> {
    let (lower, upper) = symmetric(tolerance)?;
    Ok(deviation_window(lower, upper, true))
}

pub fn allow_percent_deviation_range(lower: f64, upper: f64) -> Result<Allowance, AllowanceError> {
    let (lower, upper) = ordered(lower, upper)?;
    Ok(deviation_window(lower, upper, true))
}

/// Accepts exactly the listed differences, each at most once.
///
/// Listed differences that were never reported are added to the remainder
/// as a single [`Difference::Unmatched`] entry.
pub fn allow_specified(catalog: impl Into<Catalog>) -> Allowance {
    Allowance::from_rule(Rule::Specified(Rc::new(catalog.into())))
}

/// Accepts all differences in a scope when there are at most `limit` of
/// them. The scope is the whole payload when flat, or each key when keyed.
pub fn allow_limit(limit: usize) -> Allowance {
    Allowance::from_rule(Rule::Limit(limit))
}
