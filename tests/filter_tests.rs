use std::collections::BTreeMap;

use datacheck_rs::filter::{key_segments, KeySegment};
use datacheck_rs::{Difference, Differences, KeyFilter, KeyPattern, Report, Value};

fn path(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

fn nested() -> Differences {
    Differences::Keyed(BTreeMap::from([
        (
            Value::from("user"),
            Report::Keyed(BTreeMap::from([
                (Value::from("id"), Report::Single(Difference::invalid_expected(7, 8))),
                (Value::from("name"), Report::Single(Difference::missing("ann"))),
            ])),
        ),
        (
            Value::from("id"),
            Report::Single(Difference::extra(1)),
        ),
    ]))
}

#[test]
fn test_pattern_parse_literal() {
    let pattern = KeyPattern::parse("foo.bar.baz");
    assert_eq!(
        pattern.segments,
        vec![
            KeySegment::Exact("foo".to_string()),
            KeySegment::Exact("bar".to_string()),
            KeySegment::Exact("baz".to_string()),
        ]
    );
}

#[test]
fn test_pattern_parse_wildcards() {
    let pattern = KeyPattern::parse("**.foo.*");
    assert_eq!(
        pattern.segments,
        vec![
            KeySegment::AnyDepth,
            KeySegment::Exact("foo".to_string()),
            KeySegment::AnyOne,
        ]
    );
}

#[test]
fn test_pattern_literal_match() {
    let pattern = KeyPattern::parse("foo.bar");
    assert!(pattern.matches(&path(&["foo", "bar"])));
    assert!(!pattern.matches(&path(&["foo", "baz"])));
    assert!(!pattern.matches(&path(&["foo", "bar", "baz"])));
}

#[test]
fn test_pattern_double_wildcard() {
    let pattern = KeyPattern::parse("**.updated_at");
    assert!(pattern.matches(&path(&["updated_at"])));
    assert!(pattern.matches(&path(&["a", "b", "updated_at"])));
    assert!(!pattern.matches(&path(&["updated_at", "x"])));
}

#[test]
fn test_pattern_matches_position_keys() {
    let pattern = KeyPattern::parse("3.*");
    assert!(pattern.matches_key(&Value::list([3, 4])));
    assert!(!pattern.matches_key(&Value::list([4, 4])));
    assert_eq!(key_segments(&Value::from(2.5)), vec!["2.5"]);
}

#[test]
fn test_filter_allow_nested() {
    let filter = KeyFilter::new().allow("user.id");
    let kept = filter.retain(nested());
    let expected = Differences::Keyed(BTreeMap::from([
        (
            Value::from("user"),
            Report::Keyed(BTreeMap::from([(
                Value::from("name"),
                Report::Single(Difference::missing("ann")),
            )])),
        ),
        (Value::from("id"), Report::Single(Difference::extra(1))),
    ]));
    assert_eq!(kept, expected);
}

#[test]
fn test_filter_allow_any_depth() {
    let filter = KeyFilter::new().allow("**.id");
    let kept = filter.retain(nested());
    assert_eq!(kept.stats().total(), 1);
    assert_eq!(kept.stats().missing, 1);
}

#[test]
fn test_filter_only() {
    let filter = KeyFilter::new().only("user.*");
    let kept = filter.retain(nested());
    let stats = kept.stats();
    assert_eq!(stats.extra, 0);
    assert_eq!(stats.invalid, 1);
    assert_eq!(stats.missing, 1);
}

#[test]
fn test_filter_flat_differences() {
    let flat = Differences::Flat(vec![Difference::missing("a")]);
    assert_eq!(KeyFilter::new().allow("a").retain(flat.clone()), flat);
    assert_eq!(
        KeyFilter::new().allow("**").retain(flat),
        Differences::Flat(Vec::new())
    );
}

#[test]
fn test_filter_as_allowance() {
    let error = datacheck_rs::ValidationError::new("invalid data", nested());
    let allowance = KeyFilter::new().allow("user.*").allow("id").into_allowance();
    assert!(allowance.apply(error).unwrap().is_none());
}

#[test]
fn test_filter_has_patterns() {
    assert!(!KeyFilter::new().has_patterns());
    assert!(KeyFilter::new().only("x").has_patterns());
}
