//! Parsing JSON, YAML and TOML documents into values.
//!
//! Files are recognized by extension (.json, .yaml, .yml, .toml). Content of
//! unknown origin is tried as JSON, then YAML, then TOML.
//!
//! # Examples
//!
//! ```
//! use datacheck_rs::parser::{parse_content, FormatHint};
//! use datacheck_rs::Value;
//!
//! let value = parse_content("name = \"Alice\"", FormatHint::Toml, "inline").unwrap();
//! assert_eq!(value, Value::map([("name", "Alice")]));
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::Path;

use crate::error::ParseError;
use crate::value::Value;

/// The expected format of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormatHint {
    Json,
    Yaml,
    Toml,
    /// Try each format in turn.
    #[default]
    Auto,
}

impl FormatHint {
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|s| s.to_lowercase());

        match extension.as_deref() {
            Some("json") => FormatHint::Json,
            Some("yaml") | Some("yml") => FormatHint::Yaml,
            Some("toml") => FormatHint::Toml,
            _ => FormatHint::Auto,
        }
    }
}

/// Parses a file, detecting the format from its extension.
///
/// # Errors
///
/// This function will return an error if:
/// - The file does not exist (`ParseError::FileNotFound`)
/// - The file cannot be read (`ParseError::ReadError`)
/// - The content is invalid for the detected format
/// - No format accepts content with an unknown extension (`ParseError::UnknownFormat`)
pub fn parse_file(path: &Path) -> Result<Value, ParseError> {
    let label = path.to_string_lossy().to_string();
    if !path.exists() {
        return Err(ParseError::file_not_found(label));
    }

    let content = fs::read_to_string(path).map_err(|e| ParseError::read_error(label.clone(), e))?;
    tracing::debug!(path = %label, bytes = content.len(), "read document");
    parse_content(&content, FormatHint::from_path(path), &label)
}

/// Parses standard input.
pub fn parse_stdin(hint: FormatHint) -> Result<Value, ParseError> {
    let mut content = String::new();
    std::io::stdin()
        .read_to_string(&mut content)
        .map_err(|e| ParseError::read_error("<stdin>", e))?;
    parse_content(&content, hint, "<stdin>")
}

/// Parses a document held in memory. `label` names it in errors.
pub fn parse_content(content: &str, hint: FormatHint, label: &str) -> Result<Value, ParseError> {
    match hint {
        FormatHint::Json => parse_json(content).map_err(|e| ParseError::json_error(label, e)),
        FormatHint::Yaml => parse_yaml(content).map_err(|e| ParseError::yaml_error(label, e)),
        FormatHint::Toml => parse_toml(content).map_err(|e| ParseError::toml_error(label, e)),
        FormatHint::Auto => parse_json(content)
            .ok()
            .or_else(|| parse_yaml(content).ok())
            .or_else(|| parse_toml(content).ok())
            .ok_or_else(|| ParseError::unknown_format(label)),
    }
}

pub fn parse_json(content: &str) -> Result<Value, serde_json::Error> {
    let value: serde_json::Value = serde_json::from_str(content)?;
    Ok(json_to_value(value))
}

pub fn parse_yaml(content: &str) -> Result<Value, serde_yaml::Error> {
    let value: serde_yaml::Value = serde_yaml::from_str(content)?;
    Ok(yaml_to_value(value))
}

pub fn parse_toml(content: &str) -> Result<Value, toml::de::Error> {
    let table: toml::Table = toml::from_str(content)?;
    Ok(toml_to_value(toml::Value::Table(table)))
}

fn json_to_value(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => Value::List(items.into_iter().map(json_to_value).collect()),
        serde_json::Value::Object(obj) => Value::Map(
            obj.into_iter()
                .map(|(k, v)| (Value::String(k), json_to_value(v)))
                .collect(),
        ),
    }
}

/// YAML keys keep their own type, so `1: first` is keyed by the number 1.
fn yaml_to_value(value: serde_yaml::Value) -> Value {
    match value {
        serde_yaml::Value::Null => Value::Null,
        serde_yaml::Value::Bool(b) => Value::Bool(b),
        serde_yaml::Value::Number(n) => Value::Number(n.as_f64().unwrap_or(f64::NAN)),
        serde_yaml::Value::String(s) => Value::String(s),
        serde_yaml::Value::Sequence(items) => Value::List(items.into_iter().map(yaml_to_value).collect()),
        serde_yaml::Value::Mapping(map) => Value::Map(
            map.into_iter()
                .map(|(k, v)| (yaml_to_value(k), yaml_to_value(v)))
                .collect::<BTreeMap<_, _>>(),
        ),
        serde_yaml::Value::Tagged(tagged) => yaml_to_value(tagged.value),
    }
}

/// Datetimes become their string form.
fn toml_to_value(value: toml::Value) -> Value {
    match value {
        toml::Value::String(s) => Value::String(s),
        toml::Value::Integer(i) => Value::Number(i as f64),
        toml::Value::Float(f) => Value::Number(f),
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::String(dt.to_string()),
        toml::Value::Array(items) => Value::List(items.into_iter().map(toml_to_value).collect()),
        toml::Value::Table(table) => Value::Map(
            table
                .into_iter()
                .map(|(k, v)| (Value::String(k), toml_to_value(v)))
                .collect(),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_parse_json_primitives() {
        assert_eq!(parse_json("null").unwrap(), Value::Null);
        assert_eq!(parse_json("true").unwrap(), Value::Bool(true));
        assert_eq!(parse_json("42").unwrap(), Value::Number(42.0));
        assert_eq!(parse_json(r#""hello""#).unwrap(), Value::from("hello"));
    }

    #[test]
    fn test_yaml_keys_keep_their_type() {
        let value = parse_yaml("1: first\ntrue: yes").unwrap();
        let Value::Map(map) = value else {
            panic!("Expected map");
        };
        assert_eq!(map.get(&Value::from(1)), Some(&Value::from("first")));
        assert_eq!(map.get(&Value::Bool(true)), Some(&Value::from("yes")));
    }

    #[test]
    fn test_toml_datetime_is_string() {
        let value = parse_toml("released = 1979-05-27T07:32:00Z").unwrap();
        assert_eq!(value, Value::map([("released", "1979-05-27T07:32:00Z")]));
    }

    #[test]
    fn test_auto_falls_back_to_toml() {
        let value = parse_content("[server]\nport = 8080", FormatHint::Auto, "inline").unwrap();
        assert_eq!(value, Value::map([("server", Value::map([("port", 8080)]))]));
    }

    #[test]
    fn test_parse_file_by_extension() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "key: value").unwrap();
        let path = file.path().with_extension("yaml");
        fs::copy(file.path(), &path).unwrap();

        let value = parse_file(&path).unwrap();
        assert_eq!(value, Value::map([("key", "value")]));

        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_parse_file_not_found() {
        let result = parse_file(Path::new("/nonexistent/file.json"));
        assert!(matches!(result, Err(ParseError::FileNotFound { .. })));
    }

    #[test]
    fn test_unknown_format() {
        let result = parse_content("key: [unclosed", FormatHint::Auto, "inline");
        assert!(matches!(result, Err(ParseError::UnknownFormat { .. })));
    }
}
