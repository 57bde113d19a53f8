use std::collections::BTreeMap;

use datacheck_rs::output::{format_error, format_success, OutputFormat, OutputOptions};
use datacheck_rs::{Difference, Report, ValidationError, Value};

fn price_error() -> ValidationError {
    ValidationError::new(
        "prices are off",
        BTreeMap::from([
            (
                Value::from("prices"),
                Report::Keyed(BTreeMap::from([(
                    Value::from("apple"),
                    Report::Single(Difference::deviation(1, 10).unwrap()),
                )])),
            ),
            (
                Value::from("tags"),
                Report::Group(vec![Difference::missing("fresh"), Difference::extra("old")]),
            ),
        ]),
    )
}

#[test]
fn test_format_success() {
    assert_eq!(format_success(&OutputFormat::Plain).unwrap(), "No differences found.");
    assert!(format_success(&OutputFormat::Terminal)
        .unwrap()
        .contains("No differences found."));

    let json: serde_json::Value =
        serde_json::from_str(&format_success(&OutputFormat::Json).unwrap()).unwrap();
    assert_eq!(json["valid"], true);
    assert_eq!(json["differences"].as_array().map(Vec::len), Some(0));
}

#[test]
fn test_format_plain() {
    let output = format_error(&price_error(), &OutputFormat::Plain, &OutputOptions::default()).unwrap();
    assert!(output.starts_with("prices are off (2 differences): {"));
    assert!(output.contains("\"prices\": {\"apple\": Deviation(+1, 10)},"));
    assert!(output.contains("\"tags\": [Missing(\"fresh\"), Extra(\"old\")],"));
    assert!(output.ends_with("Summary: 1 missing, 1 extra, 1 deviation"));
}

#[test]
fn test_format_plain_quiet_and_truncated() {
    let options = OutputOptions {
        summary: false,
        max_diff: Some(10),
        ..OutputOptions::default()
    };
    let output = format_error(&price_error(), &OutputFormat::Plain, &options).unwrap();
    assert!(!output.contains("Summary"));
    assert!(output.contains("    ..."));
    assert!(output.ends_with("Set max_diff to None for full message."));
}

#[test]
fn test_format_terminal() {
    let output = format_error(&price_error(), &OutputFormat::Terminal, &OutputOptions::default()).unwrap();
    assert!(output.contains("prices are off"));
    assert!(output.contains("prices.apple"));
    assert!(output.contains("+1 (expected 10)"));
    assert!(output.contains("\"fresh\""));
    assert!(output.contains("\"old\""));
    assert!(output.contains("Summary: 1 missing, 1 extra, 1 deviation"));
}

#[test]
fn test_format_terminal_truncates_values() {
    let error = ValidationError::new("too long", vec![Difference::missing("a".repeat(50))]);
    let options = OutputOptions {
        max_value_length: 10,
        ..OutputOptions::default()
    };
    let output = format_error(&error, &OutputFormat::Terminal, &options).unwrap();
    assert!(output.contains("\"aaaaaa..."));
    assert!(!output.contains(&"a".repeat(50)));
}

#[test]
fn test_format_terminal_flat_positions() {
    let error = ValidationError::new(
        "invalid data",
        vec![Difference::invalid("x"), Difference::invalid_expected("y", "z")],
    );
    let output = format_error(&error, &OutputFormat::Terminal, &OutputOptions::default()).unwrap();
    assert!(output.contains("[0]"));
    assert!(output.contains("[1]"));
    assert!(output.contains("Summary: 2 invalid"));
}

#[test]
fn test_format_json() {
    let output = format_error(&price_error(), &OutputFormat::Json, &OutputOptions::default()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&output).unwrap();

    assert_eq!(json["valid"], false);
    assert_eq!(json["message"], "prices are off");

    let differences = json["differences"].as_array().unwrap();
    assert_eq!(differences.len(), 3);
    assert_eq!(differences[0]["path"], "prices.apple");
    assert_eq!(differences[0]["kind"], "deviation");
    assert_eq!(differences[0]["args"], serde_json::json!([1.0, 10.0]));
    assert_eq!(differences[0]["display"], "Deviation(+1, 10)");
    assert_eq!(differences[1]["path"], "tags");
    assert_eq!(differences[1]["kind"], "missing");

    assert_eq!(json["stats"]["missing"], 1);
    assert_eq!(json["stats"]["extra"], 1);
    assert_eq!(json["stats"]["deviation"], 1);
    assert_eq!(json["stats"]["invalid"], 0);
}

#[test]
fn test_format_json_sequence_positions() {
    let error = ValidationError::new(
        "does not match sequence",
        BTreeMap::from([(Value::list([1, 2]), Difference::extra("x"))]),
    );
    let output = format_error(&error, &OutputFormat::Json, &OutputOptions::default()).unwrap();
    let json: serde_json::Value = serde_json::from_str(&output).unwrap();
    assert_eq!(json["differences"][0]["path"], "[1, 2]");
}

#[test]
fn test_format_unmatched_note() {
    let error = ValidationError::new(
        "invalid data",
        vec![Difference::Unmatched(vec![Difference::missing("yyy")])],
    );
    let output = format_error(&error, &OutputFormat::Terminal, &OutputOptions::default()).unwrap();
    assert!(output.contains("allowed differences not found"));
    assert!(output.contains("1 unmatched allowance"));
}
