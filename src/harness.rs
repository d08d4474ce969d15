//! Exit-status mapping and the built-in demonstration scenarios.

use crate::scanner::{scan, ConfigState, ParseResult};
use crate::table::{OptionDescriptor, OptionTable, Requirement};
use crate::validator::{check_types, validate, ValidationFailure};
use crate::value::ValueType;

/// Long name whose presence turns a successful scan into a help request.
pub const HELP_OPTION: &str = "help";

/// What the invoking process should do with a scanned argument vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    Success,
    /// Malformed input
    Failure,
    /// Help was asked for, or an unknown option was passed
    Help,
    /// A mandatory option is missing or holds the wrong kind of value
    Mandatory,
    /// A value's kind differs from the kind of its declared default
    DiffType,
}

impl Verdict {
    pub fn code(self) -> i32 {
        match self {
            Verdict::Success => 0,
            Verdict::Failure => 1,
            Verdict::Help => 2,
            Verdict::Mandatory => 3,
            Verdict::DiffType => 5,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Verdict::Success => "EXIT_SUCCESS",
            Verdict::Failure => "EXIT_FAILURE",
            Verdict::Help => "EXIT_HELP",
            Verdict::Mandatory => "EXIT_MANDATORY",
            Verdict::DiffType => "EXIT_DIFF_TYPE",
        }
    }
}

/// Scan and validation results together with the verdict drawn from them.
#[derive(Debug, Clone)]
pub struct Evaluation {
    pub verdict: Verdict,
    pub result: ParseResult,
    pub state: ConfigState,
    /// Set only when the scan succeeded and validation ran
    pub validation: Option<ValidationFailure>,
}

/// Scan `argv`, then validate, the way a program entry point would.
pub fn evaluate<S: AsRef<str>>(argv: &[S], table: &[OptionDescriptor]) -> Evaluation {
    let (result, state) = scan(argv, table);
    let mut validation = None;

    let verdict = match result {
        ParseResult::Parsed if state.has_value(HELP_OPTION) => Verdict::Help,
        ParseResult::Parsed => match validate(&state, table) {
            Ok(()) => match check_types(&state, table) {
                Ok(()) => Verdict::Success,
                Err(failure) => {
                    validation = Some(failure);
                    Verdict::DiffType
                }
            },
            Err(failure) => {
                validation = Some(failure);
                Verdict::Mandatory
            }
        },
        ParseResult::Error => Verdict::Failure,
        ParseResult::Unknown | ParseResult::BadOptionIndex => Verdict::Help,
    };

    Evaluation {
        verdict,
        result,
        state,
        validation,
    }
}

/// The option table the demonstration scenarios run against.
pub fn demo_table() -> OptionTable {
    OptionTable::new(vec![
        OptionDescriptor::flag('h', "help", "displays help usage message"),
        OptionDescriptor::with_value(
            'O',
            "output_directory",
            "a directory where received files are stored",
            Requirement::Mandatory,
            ValueType::String,
        ),
        OptionDescriptor::with_value(
            'D',
            "dark_color",
            "a color to detect dark images",
            Requirement::Mandatory,
            ValueType::Int32Hex,
        )
        .with_default(0x090909_i32),
        OptionDescriptor::with_value(
            'I',
            "id",
            "an id for something",
            Requirement::Optional,
            ValueType::Int64,
        )
        .with_default(0x100_i64),
        OptionDescriptor::with_value(
            'L',
            "log_dir",
            "a directory to store program logs",
            Requirement::Mandatory,
            ValueType::String,
        )
        .with_default("."),
        OptionDescriptor::with_value(
            'P',
            "probability",
            "probability to match file",
            Requirement::Mandatory,
            ValueType::Float,
        )
        .with_default(0.5),
    ])
}

/// A canned argument vector with the verdict it must produce.
#[derive(Debug, Clone, Copy)]
pub struct DemoCase {
    pub id: u32,
    pub argv: &'static [&'static str],
    pub expected: Verdict,
}

impl DemoCase {
    pub fn run(&self, table: &[OptionDescriptor]) -> Verdict {
        evaluate(self.argv, table).verdict
    }
}

pub const DEMO_CASES: &[DemoCase] = &[
    DemoCase {
        id: 1,
        argv: &["program1"],
        expected: Verdict::Mandatory,
    },
    DemoCase {
        id: 2,
        argv: &["program1", "-h"],
        expected: Verdict::Help,
    },
    DemoCase {
        id: 31,
        argv: &["program1", "-help"],
        expected: Verdict::Help,
    },
    DemoCase {
        id: 32,
        argv: &["program1", "--help"],
        expected: Verdict::Help,
    },
    DemoCase {
        id: 41,
        argv: &["program1", "-D"],
        expected: Verdict::Failure,
    },
    DemoCase {
        id: 42,
        argv: &["program1", "-D", "505050"],
        expected: Verdict::Mandatory,
    },
    DemoCase {
        id: 5,
        argv: &["program1", "-D", "505050", "-O", "."],
        expected: Verdict::Success,
    },
    DemoCase {
        id: 6,
        argv: &["program1", "-D", "505050", "-O", ".", "-I", "1"],
        expected: Verdict::Success,
    },
    DemoCase {
        id: 7,
        argv: &["program1", "-D", "505050", "-O", ".", "-P", "0"],
        expected: Verdict::Success,
    },
    DemoCase {
        id: 8,
        argv: &["program1", "-D", "505050", "-O", ".", "-P", "0.7"],
        expected: Verdict::Success,
    },
];
