//! Key patterns for accepting differences by where they were reported.
//!
//! A key is split into segments: a list key (such as a sequence position
//! `[data_index, requirement_index]`) contributes one segment per element,
//! any other key a single segment. Nested keyed reports extend the path
//! with their own keys.
//!
//! # Pattern Syntax
//!
//! - `foo` - matches the segment "foo"
//! - `*` - matches any single segment
//! - `**` - matches any number of segments (including zero)
//! - `foo.bar` - matches "bar" nested under "foo"
//! - `**.updated_at` - matches "updated_at" at any depth
//!
//! # Examples
//!
//! ```
//! use datacheck_rs::filter::{KeyPattern, key_segments};
//! use datacheck_rs::Value;
//!
//! let pattern = KeyPattern::parse("**.updated_at");
//! assert!(pattern.matches(&["user".to_string(), "updated_at".to_string()]));
//! assert!(pattern.matches_key(&Value::from("updated_at")));
//!
//! assert_eq!(key_segments(&Value::list([1, 2])), vec!["1", "2"]);
//! ```

use std::collections::BTreeMap;

use crate::allow::Allowance;
use crate::report::{Differences, Report};
use crate::value::Value;

/// One segment of a key pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeySegment {
    Exact(String),
    /// `*`
    AnyOne,
    /// `**`
    AnyDepth,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPattern {
    pub segments: Vec<KeySegment>,
}

impl KeyPattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = pattern
            .split('.')
            .map(|part| match part {
                "**" => KeySegment::AnyDepth,
                "*" => KeySegment::AnyOne,
                exact => KeySegment::Exact(exact.to_string()),
            })
            .collect();
        Self { segments }
    }

    pub fn matches(&self, path: &[String]) -> bool {
        match_segments(&self.segments, path)
    }

    pub fn matches_key(&self, key: &Value) -> bool {
        self.matches(&key_segments(key))
    }
}

fn match_segments(pattern: &[KeySegment], path: &[String]) -> bool {
    match pattern.split_first() {
        None => path.is_empty(),
        Some((KeySegment::AnyDepth, rest)) => {
            match_segments(rest, path) || (!path.is_empty() && match_segments(pattern, &path[1..]))
        }
        Some((segment, rest)) => match path.split_first() {
            None => false,
            Some((head, tail)) => {
                let hit = match segment {
                    KeySegment::Exact(exact) => exact == head,
                    _ => true,
                };
                hit && match_segments(rest, tail)
            }
        },
    }
}

/// Path segments contributed by one key.
pub fn key_segments(key: &Value) -> Vec<String> {
    match key {
        Value::List(parts) => parts.iter().map(segment).collect(),
        other => vec![segment(other)],
    }
}

fn segment(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Key patterns that decide which differences are accepted.
///
/// Differences under an `allow` pattern are accepted. When any `only`
/// patterns are given, differences under keys matching none of them are
/// accepted as well.
#[derive(Debug, Clone, Default)]
pub struct KeyFilter {
    pub allow_patterns: Vec<KeyPattern>,
    pub only_patterns: Vec<KeyPattern>,
}

impl KeyFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn allow(mut self, pattern: &str) -> Self {
        self.allow_patterns.push(KeyPattern::parse(pattern));
        self
    }

    pub fn only(mut self, pattern: &str) -> Self {
        self.only_patterns.push(KeyPattern::parse(pattern));
        self
    }

    pub fn has_patterns(&self) -> bool {
        !self.allow_patterns.is_empty() || !self.only_patterns.is_empty()
    }

    /// Whether differences reported at `path` are accepted.
    pub fn accepts(&self, path: &[String]) -> bool {
        if self.allow_patterns.iter().any(|p| p.matches(path)) {
            return true;
        }
        !self.only_patterns.is_empty() && !self.only_patterns.iter().any(|p| p.matches(path))
    }

    /// The differences this filter does not accept, matched against full
    /// key paths (nested keys included).
    pub fn retain(&self, differences: Differences) -> Differences {
        match differences {
            Differences::Flat(items) => {
                if self.accepts(&[]) {
                    Differences::Flat(Vec::new())
                } else {
                    Differences::Flat(items)
                }
            }
            Differences::Keyed(entries) => {
                let mut path = Vec::new();
                Differences::Keyed(self.retain_entries(entries, &mut path))
            }
        }
    }

    fn retain_entries(&self, entries: BTreeMap<Value, Report>, path: &mut Vec<String>) -> BTreeMap<Value, Report> {
        let mut kept = BTreeMap::new();
        for (key, report) in entries {
            let depth = path.len();
            path.extend(key_segments(&key));
            let report = match report {
                Report::Keyed(nested) => {
                    let nested = self.retain_entries(nested, path);
                    (!nested.is_empty()).then_some(Report::Keyed(nested))
                }
                leaf => (!self.accepts(path.as_slice())).then_some(leaf),
            };
            path.truncate(depth);
            if let Some(report) = report {
                kept.insert(key, report);
            }
        }
        kept
    }

    pub fn into_allowance(self) -> Allowance {
        Allowance::from_filterfalse(move |differences| self.retain(differences))
    }
}
