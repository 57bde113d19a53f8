use std::collections::BTreeMap;

use datacheck_rs::validate::default_message;
use datacheck_rs::{
    difference_info, validate, CompareError, DatacheckError, Difference, Differences, Report,
    Requirement, Value,
};

fn keyed<const N: usize>(entries: [(&str, Report); N]) -> Differences {
    Differences::Keyed(
        entries
            .into_iter()
            .map(|(key, report)| (Value::from(key), report))
            .collect(),
    )
}

#[test]
fn test_default_messages() {
    assert_eq!(default_message(&Requirement::sequence(["A", "B"])), "does not match sequence");
    assert_eq!(
        default_message(&Requirement::set(["A", "B"])),
        "does not satisfy set membership"
    );
    assert_eq!(
        default_message(&Requirement::test("my_check", |_| true)),
        "does not satisfy my_check"
    );
    assert_eq!(
        default_message(&Requirement::pattern("[AB]").unwrap()),
        "does not match regex [AB]"
    );
    assert_eq!(
        default_message(&Requirement::mapping([("a", Requirement::equal(1))])),
        "does not satisfy mapping requirements"
    );
    assert_eq!(default_message(&Requirement::equal("A")), "does not satisfy equality");
}

#[test]
fn test_info_mapping_requirement() {
    let first = Value::map([("a", "x"), ("b", "y")]);
    let second = Requirement::mapping([("a", "x"), ("b", "z")]);

    let same = Requirement::mapping([("a", "x"), ("b", "y")]);
    assert!(difference_info(&first, &same).unwrap().is_none());

    let (message, differences) = difference_info(&first, &second).unwrap().unwrap();
    assert_eq!(message, "does not satisfy mapping requirements");
    assert_eq!(
        differences,
        keyed([("b", Report::Single(Difference::invalid_expected("y", "z")))])
    );

    let not_a_mapping = Value::set(["x", "y"]);
    assert!(matches!(
        difference_info(&not_a_mapping, &second),
        Err(CompareError::NotAMapping { .. })
    ));
}

#[test]
fn test_info_mapping_data() {
    let data = Value::map([("a", "x"), ("b", "y")]);

    let x_or_y = Requirement::test("x_or_y", |v| v == &Value::from("x") || v == &Value::from("y"));
    assert!(difference_info(&data, &x_or_y).unwrap().is_none());

    let (_, differences) = difference_info(&data, &Requirement::equal("x")).unwrap().unwrap();
    assert_eq!(
        differences,
        keyed([("b", Report::Single(Difference::invalid_expected("y", "x")))])
    );

    let (_, differences) = difference_info(&data, &Requirement::set(["x"])).unwrap().unwrap();
    assert_eq!(
        differences,
        keyed([(
            "b",
            Report::Group(vec![Difference::missing("x"), Difference::extra("y")])
        )])
    );
}

#[test]
fn test_info_nonmapping() {
    let data = Value::set(["x", "y"]);
    assert!(difference_info(&data, &Requirement::set(["x", "y"])).unwrap().is_none());

    let data = Value::set(["x"]);
    let (message, differences) = difference_info(&data, &Requirement::set(["x", "y"]))
        .unwrap()
        .unwrap();
    assert_eq!(message, "does not satisfy set membership");
    assert_eq!(differences, Differences::Flat(vec![Difference::missing("y")]));
}

#[test]
fn test_info_single_value_is_flat() {
    let (_, differences) = difference_info(&Value::from(11), &Requirement::equal(10))
        .unwrap()
        .unwrap();
    assert_eq!(
        differences,
        Differences::Flat(vec![Difference::deviation(1, 10).unwrap()])
    );
}

#[test]
fn test_info_sequence_is_keyed_by_position() {
    let data = Value::list(["a", "c"]);
    let (_, differences) = difference_info(&data, &Requirement::sequence(["a", "b", "c"]))
        .unwrap()
        .unwrap();
    assert_eq!(
        differences,
        Differences::Keyed(BTreeMap::from([(
            Value::list([1, 1]),
            Report::Single(Difference::missing("b"))
        )]))
    );
}

#[test]
fn test_validate_passes() {
    let data = Value::list(["a", "b"]);
    assert!(validate(&data, &Requirement::set(["a", "b"]), None).is_ok());
}

#[test]
fn test_validate_default_and_custom_message() {
    let data = Value::list(["a", "x"]);
    let requirement = Requirement::set(["a", "b"]);

    let err = validate(&data, &requirement, None).unwrap_err();
    let error = err.as_validation().unwrap();
    assert_eq!(error.message(), "does not satisfy set membership");
    assert_eq!(
        error.differences(),
        &Differences::Flat(vec![Difference::missing("b"), Difference::extra("x")])
    );

    let err = validate(&data, &requirement, Some("letters are off")).unwrap_err();
    assert_eq!(err.as_validation().unwrap().message(), "letters are off");
}

#[test]
fn test_validate_comparison_error_is_not_validation() {
    let data = Value::from("abc");
    let err = validate(&data, &Requirement::sequence(["a", "b", "c"]), None).unwrap_err();
    assert!(matches!(err, DatacheckError::Compare(CompareError::StringAsSequence)));
    assert!(err.as_validation().is_none());
}

#[test]
fn test_validate_nested_mapping() {
    let data = Value::map([(
        "user",
        Value::map([("name", Value::from("ann")), ("age", Value::from(31))]),
    )]);
    let requirement = Requirement::mapping([(
        "user",
        Requirement::mapping([
            ("name", Requirement::equal("ann")),
            ("age", Requirement::equal(30)),
            ("email", Requirement::pattern("@").unwrap()),
        ]),
    )]);

    let err = validate(&data, &requirement, None).unwrap_err();
    let error = err.as_validation().unwrap();
    let expected = keyed([(
        "user",
        Report::Keyed(BTreeMap::from([
            (Value::from("age"), Report::Single(Difference::deviation(1, 30).unwrap())),
            (Value::from("email"), Report::Single(Difference::invalid(Value::Null))),
        ])),
    )]);
    assert_eq!(error.differences(), &expected);
}

#[test]
fn test_requirement_from_parsed_value() {
    use datacheck_rs::{parse_json, ArrayStrategy, RequirementConfig};

    let requirement = parse_json(r#"{"tags": ["b", "a"], "count": 2}"#).unwrap();
    let data = parse_json(r#"{"tags": ["a", "b"], "count": 2}"#).unwrap();

    let ordered = Requirement::from_value(requirement.clone(), &RequirementConfig::default());
    assert!(validate(&data, &ordered, None).is_err());

    let unordered = Requirement::from_value(
        requirement,
        &RequirementConfig {
            array_strategy: ArrayStrategy::Unordered,
        },
    );
    assert!(validate(&data, &unordered, None).is_ok());
}
