use datacheck_rs::{parse_content, parse_file, parse_json, parse_toml, parse_yaml, FormatHint, ParseError, Value};
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Writes `content` to a temporary file with the given extension.
fn temp_with_extension(content: &str, extension: &str) -> std::path::PathBuf {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{}", content).unwrap();
    let path = file.path().with_extension(extension);
    fs::copy(file.path(), &path).unwrap();
    path
}

#[test]
fn test_parse_json_primitives() {
    assert_eq!(parse_json("null").unwrap(), Value::Null);
    assert_eq!(parse_json("true").unwrap(), Value::Bool(true));
    assert_eq!(parse_json("false").unwrap(), Value::Bool(false));
    assert_eq!(parse_json("42").unwrap(), Value::Number(42.0));
    assert_eq!(parse_json("3.15").unwrap(), Value::Number(3.15));
    assert_eq!(parse_json(r#""hello""#).unwrap(), Value::from("hello"));
}

#[test]
fn test_parse_json_array() {
    let value = parse_json("[1, 2, 3]").unwrap();
    assert_eq!(value, Value::list([1, 2, 3]));
}

#[test]
fn test_parse_json_nested() {
    let json = r#"{"user": {"name": "Alice", "tags": ["a", "b"]}}"#;
    let value = parse_json(json).unwrap();
    assert_eq!(
        value,
        Value::map([(
            "user",
            Value::map([
                ("name", Value::from("Alice")),
                ("tags", Value::list(["a", "b"])),
            ]),
        )])
    );
}

#[test]
fn test_parse_json_invalid() {
    assert!(parse_json("{invalid}").is_err());
    assert!(parse_json("[1, 2,").is_err());
}

#[test]
fn test_parse_yaml_object() {
    let yaml = "name: Alice\nage: 30\nscores:\n  - 1\n  - 2";
    let value = parse_yaml(yaml).unwrap();
    assert_eq!(
        value,
        Value::map([
            ("age", Value::from(30)),
            ("name", Value::from("Alice")),
            ("scores", Value::list([1, 2])),
        ])
    );
}

#[test]
fn test_parse_yaml_invalid() {
    assert!(parse_yaml("key: value: invalid").is_err());
    assert!(parse_yaml("[1, 2,").is_err());
}

#[test]
fn test_yaml_non_string_keys() {
    let value = parse_yaml("1: first\n2: second\ntrue: yes").unwrap();
    let Value::Map(map) = value else {
        panic!("Expected map");
    };
    assert_eq!(map.len(), 3);
    assert_eq!(map.get(&Value::from(1)), Some(&Value::from("first")));
    assert_eq!(map.get(&Value::from(2)), Some(&Value::from("second")));
    assert_eq!(map.get(&Value::Bool(true)), Some(&Value::from("yes")));
}

#[test]
fn test_parse_toml_tables() {
    let toml = "title = \"inventory\"\n\n[stock]\napples = 10\npears = 2.5";
    let value = parse_toml(toml).unwrap();
    assert_eq!(
        value,
        Value::map([
            ("stock", Value::map([("apples", 10.0), ("pears", 2.5)])),
            ("title", Value::from("inventory")),
        ])
    );
}

#[test]
fn test_parse_file_json() {
    let path = temp_with_extension(r#"{"key": "value"}"#, "json");
    assert_eq!(parse_file(&path).unwrap(), Value::map([("key", "value")]));
    fs::remove_file(&path).unwrap();
}

#[test]
fn test_parse_file_toml() {
    let path = temp_with_extension("key = \"value\"", "toml");
    assert_eq!(parse_file(&path).unwrap(), Value::map([("key", "value")]));
    fs::remove_file(&path).unwrap();
}

#[test]
fn test_parse_file_invalid_for_extension() {
    let path = temp_with_extension("key: value", "json");
    assert!(matches!(parse_file(&path), Err(ParseError::JsonError { .. })));
    fs::remove_file(&path).unwrap();
}

#[test]
fn test_parse_file_not_found() {
    let result = parse_file(Path::new("/nonexistent/file.json"));
    assert!(matches!(result, Err(ParseError::FileNotFound { .. })));
}

#[test]
fn test_parse_file_unknown_extension() {
    let path = temp_with_extension(r#"{"key": "value"}"#, "txt");
    assert_eq!(parse_file(&path).unwrap(), Value::map([("key", "value")]));
    fs::remove_file(&path).unwrap();
}

#[test]
fn test_format_hint_from_path() {
    assert_eq!(FormatHint::from_path(Path::new("a.JSON")), FormatHint::Json);
    assert_eq!(FormatHint::from_path(Path::new("a.yml")), FormatHint::Yaml);
    assert_eq!(FormatHint::from_path(Path::new("a.toml")), FormatHint::Toml);
    assert_eq!(FormatHint::from_path(Path::new("a")), FormatHint::Auto);
}

#[test]
fn test_parse_content_labels_errors() {
    let err = parse_content("{", FormatHint::Json, "inline").unwrap_err();
    assert!(err.to_string().starts_with("Invalid JSON in inline"));
}
