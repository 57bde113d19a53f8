//! Validation entry points.

use std::collections::BTreeMap;

use crate::compare::{compare, compare_mapping};
use crate::error::{CompareError, DatacheckError, ValidationError};
use crate::report::{Differences, Report};
use crate::requirement::Requirement;
use crate::value::Value;

/// Default failure message for a requirement kind.
pub fn default_message(requirement: &Requirement) -> String {
    match requirement {
        Requirement::Sequence(_) => "does not match sequence".to_string(),
        Requirement::Set(_) => "does not satisfy set membership".to_string(),
        Requirement::Predicate(predicate) => format!("does not satisfy {}", predicate.name()),
        Requirement::Pattern(regex) => format!("does not match regex {}", regex.as_str()),
        Requirement::Mapping(_) => "does not satisfy mapping requirements".to_string(),
        Requirement::Equal(_) => "does not satisfy equality".to_string(),
    }
}

/// Compares data against a requirement and collects the differences in the
/// shape a validation error carries.
///
/// Mapping data against a non-mapping requirement is compared value by
/// value, keeping the data's keys.
///
/// # Returns
///
/// `None` when the data satisfies the requirement, otherwise the default
/// message and the differences.
pub fn difference_info(
    data: &Value,
    requirement: &Requirement,
) -> Result<Option<(String, Differences)>, CompareError> {
    let differences = match (data, requirement) {
        (_, Requirement::Mapping(mapping)) => {
            compare_mapping(Some(data), mapping)?.map(Differences::Keyed)
        }
        (Value::Map(map), _) => {
            let mut reports = BTreeMap::new();
            for (key, value) in map {
                if let Some(report) = compare(Some(value), requirement)? {
                    reports.insert(key.clone(), report);
                }
            }
            (!reports.is_empty()).then_some(Differences::Keyed(reports))
        }
        _ => compare(Some(data), requirement)?.map(|report| match report {
            Report::Single(difference) => Differences::Flat(vec![difference]),
            Report::Group(items) => Differences::Flat(items),
            Report::Keyed(entries) => Differences::Keyed(entries),
        }),
    };

    Ok(differences.map(|differences| (default_message(requirement), differences)))
}

/// Validates data against a requirement.
///
/// # Errors
///
/// [`DatacheckError::Validation`] with the differences when the data does
/// not satisfy the requirement, or [`DatacheckError::Compare`] when it
/// cannot be compared at all.
pub fn validate(data: &Value, requirement: &Requirement, msg: Option<&str>) -> Result<(), DatacheckError> {
    match difference_info(data, requirement)? {
        None => Ok(()),
        Some((default, differences)) => {
            let message = msg.map_or(default, str::to_string);
            tracing::debug!(%message, count = differences.len(), "validation failed");
            Err(ValidationError::new(message, differences).into())
        }
    }
}
