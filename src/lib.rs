//! optscan - table-driven command-line option decoding.
//!
//! This library scans a process argument vector against a declarative table
//! of options, decodes each value to the declared type, and checks that every
//! mandatory option ended up with a usable value. Usage text, exit-status
//! mapping and output rendering are provided for the caller's convenience;
//! the scanner itself never prints anything.

pub mod harness;
pub mod help;
pub mod output;
pub mod scanner;
pub mod table;
pub mod validator;
pub mod value;

pub use harness::{demo_table, evaluate, Evaluation, Verdict};
pub use help::{generate_help, generate_usage};
pub use output::{generate_exports, generate_json, generate_report_string};
pub use scanner::{scan, ConfigState, ParseResult, ScanError};
pub use table::{ConfigError, OptionDescriptor, OptionTable, Requirement};
pub use validator::{check_types, first_unsatisfied, validate, ValidationFailure};
pub use value::{decode, DecodeError, TaggedValue, ValueKind, ValueType};
