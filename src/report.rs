//! Comparison results and the difference collections carried by errors.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::difference::Difference;
use crate::error::CompareError;
use crate::value::{write_joined, Value};

/// The result of comparing data against one requirement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Report {
    /// One difference for a single value.
    Single(Difference),
    /// Differences for the elements of a collection, in order.
    Group(Vec<Difference>),
    /// Differences by key: mapping keys, or `[data_index, requirement_index]`
    /// pairs for sequences.
    Keyed(BTreeMap<Value, Report>),
}

impl Report {
    /// Total number of differences, counting nested entries.
    pub fn len(&self) -> usize {
        match self {
            Report::Single(_) => 1,
            Report::Group(items) => items.len(),
            Report::Keyed(entries) => entries.values().map(Report::len).sum(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All differences in key order, nested entries included.
    pub fn differences(&self) -> Vec<&Difference> {
        let mut out = Vec::new();
        self.collect_into(&mut out);
        out
    }

    /// Consumes the report into its differences, nested entries included.
    pub fn into_differences(self) -> Vec<Difference> {
        match self {
            Report::Single(difference) => vec![difference],
            Report::Group(items) => items,
            Report::Keyed(entries) => entries
                .into_values()
                .flat_map(Report::into_differences)
                .collect(),
        }
    }

    fn collect_into<'a>(&'a self, out: &mut Vec<&'a Difference>) {
        match self {
            Report::Single(difference) => out.push(difference),
            Report::Group(items) => out.extend(items.iter()),
            Report::Keyed(entries) => {
                for report in entries.values() {
                    report.collect_into(out);
                }
            }
        }
    }

    /// Merges `other` into this report: groups concatenate, keyed entries
    /// merge per key.
    pub(crate) fn merge(self, other: Report) -> Report {
        match (self, other) {
            (Report::Keyed(mut left), Report::Keyed(right)) => {
                merge_entries(&mut left, right);
                Report::Keyed(left)
            }
            (left, right) => {
                let mut items = left.into_differences();
                items.extend(right.into_differences());
                Report::Group(items)
            }
        }
    }
}

pub(crate) fn merge_entries(into: &mut BTreeMap<Value, Report>, from: BTreeMap<Value, Report>) {
    for (key, report) in from {
        let merged = match into.remove(&key) {
            Some(existing) => existing.merge(report),
            None => report,
        };
        into.insert(key, merged);
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Report::Single(difference) => write!(f, "{}", difference),
            Report::Group(items) => {
                write!(f, "[")?;
                write_joined(f, items.iter())?;
                write!(f, "]")
            }
            Report::Keyed(entries) => {
                write!(f, "{{")?;
                for (i, (key, report)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, report)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl From<Difference> for Report {
    fn from(difference: Difference) -> Self {
        Report::Single(difference)
    }
}

impl From<Vec<Difference>> for Report {
    fn from(items: Vec<Difference>) -> Self {
        Report::Group(items)
    }
}

/// The differences carried by a validation error: a flat list, or entries
/// by key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Differences {
    Flat(Vec<Difference>),
    Keyed(BTreeMap<Value, Report>),
}

impl Differences {
    /// Number of top-level entries: differences for a flat list, keys otherwise.
    pub fn len(&self) -> usize {
        match self {
            Differences::Flat(items) => items.len(),
            Differences::Keyed(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Differences::Flat(items) => items.is_empty(),
            Differences::Keyed(entries) => entries.values().all(Report::is_empty),
        }
    }

    pub fn is_keyed(&self) -> bool {
        matches!(self, Differences::Keyed(_))
    }

    pub fn shape(&self) -> &'static str {
        match self {
            Differences::Flat(_) => "flat",
            Differences::Keyed(_) => "keyed",
        }
    }

    /// Every difference with the key it was reported under (`None` for flat lists).
    pub fn entries(&self) -> Vec<(Option<&Value>, &Difference)> {
        match self {
            Differences::Flat(items) => items.iter().map(|d| (None, d)).collect(),
            Differences::Keyed(entries) => entries
                .iter()
                .flat_map(|(key, report)| report.differences().into_iter().map(move |d| (Some(key), d)))
                .collect(),
        }
    }

    pub fn stats(&self) -> ReportStats {
        let mut stats = ReportStats::new();
        for (_, difference) in self.entries() {
            stats.record(difference);
        }
        stats
    }

    /// Drops keyed entries left without any difference.
    pub(crate) fn pruned(self) -> Self {
        match self {
            Differences::Keyed(entries) => Differences::Keyed(
                entries
                    .into_iter()
                    .filter_map(|(key, report)| prune_report(report).map(|r| (key, r)))
                    .collect(),
            ),
            flat => flat,
        }
    }

    /// Concatenates flat lists or merges keyed entries.
    pub(crate) fn merge(self, other: Differences) -> Differences {
        match (self, other) {
            (Differences::Flat(mut left), Differences::Flat(right)) => {
                left.extend(right);
                Differences::Flat(left)
            }
            (Differences::Keyed(mut left), Differences::Keyed(right)) => {
                merge_entries(&mut left, right);
                Differences::Keyed(left)
            }
            (Differences::Keyed(mut left), Differences::Flat(right))
            | (Differences::Flat(right), Differences::Keyed(mut left)) => {
                if !right.is_empty() {
                    merge_entries(&mut left, BTreeMap::from([(Value::Null, Report::Group(right))]));
                }
                Differences::Keyed(left)
            }
        }
    }

    pub(crate) fn empty_like(&self) -> Differences {
        match self {
            Differences::Flat(_) => Differences::Flat(Vec::new()),
            Differences::Keyed(_) => Differences::Keyed(BTreeMap::new()),
        }
    }
}

fn prune_report(report: Report) -> Option<Report> {
    match report {
        Report::Single(difference) => Some(Report::Single(difference)),
        Report::Group(items) if items.is_empty() => None,
        Report::Group(items) => Some(Report::Group(items)),
        Report::Keyed(entries) => {
            let kept: BTreeMap<Value, Report> = entries
                .into_iter()
                .filter_map(|(key, report)| prune_report(report).map(|r| (key, r)))
                .collect();
            (!kept.is_empty()).then_some(Report::Keyed(kept))
        }
    }
}

impl From<Vec<Difference>> for Differences {
    fn from(items: Vec<Difference>) -> Self {
        Differences::Flat(items)
    }
}

impl From<BTreeMap<Value, Report>> for Differences {
    fn from(entries: BTreeMap<Value, Report>) -> Self {
        Differences::Keyed(entries)
    }
}

impl From<BTreeMap<Value, Difference>> for Differences {
    fn from(entries: BTreeMap<Value, Difference>) -> Self {
        Differences::Keyed(entries.into_iter().map(|(k, d)| (k, Report::Single(d))).collect())
    }
}

impl From<BTreeMap<Value, Vec<Difference>>> for Differences {
    fn from(entries: BTreeMap<Value, Vec<Difference>>) -> Self {
        Differences::Keyed(entries.into_iter().map(|(k, v)| (k, Report::Group(v))).collect())
    }
}

impl FromIterator<Difference> for Differences {
    fn from_iter<I: IntoIterator<Item = Difference>>(iter: I) -> Self {
        Differences::Flat(iter.into_iter().collect())
    }
}

impl TryFrom<Report> for Differences {
    type Error = CompareError;

    fn try_from(report: Report) -> Result<Self, Self::Error> {
        match report {
            Report::Single(difference) => Err(CompareError::BareDifference {
                difference: difference.to_string(),
            }),
            Report::Group(items) => Ok(Differences::Flat(items)),
            Report::Keyed(entries) => Ok(Differences::Keyed(entries)),
        }
    }
}

/// Counts of differences by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReportStats {
    pub missing: usize,
    pub extra: usize,
    pub invalid: usize,
    pub deviation: usize,
    pub unmatched: usize,
}

impl ReportStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, difference: &Difference) {
        match difference {
            Difference::Missing(_) => self.missing += 1,
            Difference::Extra(_) => self.extra += 1,
            Difference::Invalid { .. } => self.invalid += 1,
            Difference::Deviation(_) => self.deviation += 1,
            Difference::Unmatched(_) => self.unmatched += 1,
        }
    }

    pub fn total(&self) -> usize {
        self.missing + self.extra + self.invalid + self.deviation + self.unmatched
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
