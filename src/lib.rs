//! datacheck - data validation with typed difference reports.
//!
//! Data is compared against a requirement: a sequence, a set, a predicate,
//! a regular expression, a mapping of requirements, or a plain value. Each
//! discrepancy is reported as a typed [`Difference`] (`Missing`, `Extra`,
//! `Invalid` or `Deviation`). Known discrepancies can be accepted with
//! composable [`Allowance`]s.
//!
//! # Example
//!
//! ```
//! use datacheck_rs::allow::allow_deviation;
//! use datacheck_rs::{validate, DatacheckError, Difference, Differences, Requirement, Value};
//! use std::collections::BTreeMap;
//!
//! let data = Value::map([("apples", 12), ("pears", 7)]);
//! let requirement = Requirement::mapping([
//!     ("apples", Requirement::equal(10)),
//!     ("pears", Requirement::equal(7)),
//! ]);
//!
//! let err = validate(&data, &requirement, None).unwrap_err();
//! let DatacheckError::Validation(error) = &err else { panic!() };
//! assert_eq!(
//!     error.differences(),
//!     &Differences::from(BTreeMap::from([(
//!         Value::from("apples"),
//!         Difference::deviation(2, 10).unwrap(),
//!     )]))
//! );
//!
//! // A deviation of 2 is acceptable.
//! let checked = allow_deviation(2.0)?.guard(|| validate(&data, &requirement, None))?;
//! assert!(checked.is_none());
//! # Ok::<(), DatacheckError>(())
//! ```

pub mod allow;
pub mod compare;
pub mod difference;
pub mod error;
pub mod filter;
pub mod output;
pub mod parser;
pub mod report;
pub mod requirement;
pub mod validate;
pub mod value;

// Re-export commonly used types for convenience
pub use allow::{Allowance, Catalog};
pub use compare::{compare, compare_mapping, compare_sequence, compare_set};
pub use difference::{make_difference, magnitude, Deviation, Difference, Magnitude};
pub use error::{AllowanceError, CompareError, DatacheckError, OutputError, ParseError, ValidationError};
pub use filter::{KeyFilter, KeyPattern};
pub use output::{format_error, format_success, OutputFormat, OutputOptions};
pub use parser::{parse_content, parse_file, parse_json, parse_stdin, parse_toml, parse_yaml, FormatHint};
pub use report::{Differences, Report, ReportStats};
pub use requirement::{ArrayStrategy, Predicate, Requirement, RequirementConfig, Verdict};
pub use validate::{difference_info, validate};
pub use value::Value;
