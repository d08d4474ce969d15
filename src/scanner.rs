//! Argument scanning against a descriptor table.
//!
//! The grammar is deliberately small: `--name` long options, `-abc` short
//! clusters, and a bare `--` that stops scanning. A value is only ever taken
//! by looking ahead from an option to the next whole token, and only when
//! that token does not itself start with `-`.

use crate::table::OptionDescriptor;
use crate::value::{decode, DecodeError, TaggedValue};
use log::{debug, trace};
use std::collections::HashMap;
use thiserror::Error;

/// Discriminant of a scan outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseResult {
    /// Every token was understood (positionals included).
    Parsed,
    /// Malformed input: a mandatory value missing or undecodable.
    Error,
    /// A short letter matched no descriptor.
    Unknown,
    /// A long name matched no descriptor.
    BadOptionIndex,
}

/// Why a scan stopped early, with the location of the offending argument.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("unknown option '-{letter}' in argument {index} (offset {offset})")]
    UnknownShortOption {
        index: usize,
        offset: usize,
        letter: char,
    },

    #[error("unknown option '--{name}' in argument {index}")]
    UnknownLongOption { index: usize, name: String },

    #[error("option '{name}' in argument {index} requires a value")]
    MissingMandatoryValue {
        index: usize,
        /// Letter position when the option sat inside a short cluster
        offset: Option<usize>,
        name: String,
    },

    #[error("bad value for option '{name}' in argument {index}: {source}")]
    Decode {
        /// Index of the value token, not of the option
        index: usize,
        name: String,
        #[source]
        source: DecodeError,
    },
}

impl ScanError {
    pub fn result(&self) -> ParseResult {
        match self {
            ScanError::UnknownShortOption { .. } => ParseResult::Unknown,
            ScanError::UnknownLongOption { .. } => ParseResult::BadOptionIndex,
            ScanError::MissingMandatoryValue { .. } | ScanError::Decode { .. } => {
                ParseResult::Error
            }
        }
    }

    /// Index into the argument vector.
    pub fn index(&self) -> usize {
        match self {
            ScanError::UnknownShortOption { index, .. }
            | ScanError::UnknownLongOption { index, .. }
            | ScanError::MissingMandatoryValue { index, .. }
            | ScanError::Decode { index, .. } => *index,
        }
    }

    /// Character offset within the argument, for short clusters.
    pub fn offset(&self) -> Option<usize> {
        match self {
            ScanError::UnknownShortOption { offset, .. } => Some(*offset),
            ScanError::MissingMandatoryValue { offset, .. } => *offset,
            _ => None,
        }
    }
}

/// Everything one scan produced. Owned by the caller once `scan` returns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigState {
    values: HashMap<String, TaggedValue>,
    last_terminator: Option<usize>,
    positionals: Vec<(usize, String)>,
    failure: Option<ScanError>,
}

impl ConfigState {
    pub fn get_value(&self, name: &str) -> Option<&TaggedValue> {
        self.values.get(name)
    }

    /// Typed access; `None` when absent or holding another kind.
    pub fn get<'a, T>(&'a self, name: &str) -> Option<T>
    where
        T: TryFrom<&'a TaggedValue>,
    {
        self.values.get(name).and_then(|v| T::try_from(v).ok())
    }

    pub fn has_value(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn values(&self) -> &HashMap<String, TaggedValue> {
        &self.values
    }

    /// Store a value, returning the one it replaced.
    pub fn set_value(&mut self, name: impl Into<String>, value: TaggedValue) -> Option<TaggedValue> {
        self.values.insert(name.into(), value)
    }

    /// Index of the `--` that stopped the scan.
    pub fn last_terminator(&self) -> Option<usize> {
        self.last_terminator
    }

    /// First index left unscanned after a `--`.
    pub fn unparsed_from(&self) -> Option<usize> {
        self.last_terminator.map(|i| i + 1)
    }

    /// Tokens that were neither options nor consumed as option values.
    pub fn positionals(&self) -> &[(usize, String)] {
        &self.positionals
    }

    pub fn failure(&self) -> Option<&ScanError> {
        self.failure.as_ref()
    }

    pub fn bad_argument_index(&self) -> Option<usize> {
        self.failure.as_ref().map(ScanError::index)
    }

    pub fn bad_argument_offset(&self) -> Option<usize> {
        self.failure.as_ref().and_then(ScanError::offset)
    }
}

/// Scan `argv` (program name first) against `table`.
///
/// Each call starts from a fresh state. On failure the returned state keeps
/// whatever was stored before the offending argument, plus the failure itself.
pub fn scan<S: AsRef<str>>(argv: &[S], table: &[OptionDescriptor]) -> (ParseResult, ConfigState) {
    let mut scanner = Scanner::new(table);
    let result = match scanner.scan(argv) {
        Ok(()) => ParseResult::Parsed,
        Err(err) => {
            debug!("scan stopped: {}", err);
            let result = err.result();
            scanner.state.failure = Some(err);
            result
        }
    };
    (result, scanner.state)
}

/// Internal scanner state.
struct Scanner<'a> {
    table: &'a [OptionDescriptor],
    state: ConfigState,
}

impl<'a> Scanner<'a> {
    fn new(table: &'a [OptionDescriptor]) -> Self {
        Self {
            table,
            state: ConfigState::default(),
        }
    }

    fn scan<S: AsRef<str>>(&mut self, argv: &[S]) -> Result<(), ScanError> {
        self.seed_defaults();

        let mut index = 1;
        while index < argv.len() {
            let arg = argv[index].as_ref();

            if arg == "--" {
                trace!("terminator at argument {}", index);
                self.state.last_terminator = Some(index);
                break;
            }

            if let Some(name) = arg.strip_prefix("--") {
                index += self.long_option(name, index, argv)?;
            } else if arg.starts_with('-') && arg.len() > 1 {
                index += self.short_cluster(arg, index, argv)?;
            } else {
                trace!("positional '{}' at argument {}", arg, index);
                self.state.positionals.push((index, arg.to_string()));
            }
            index += 1;
        }

        Ok(())
    }

    /// Mandatory defaults are present from the start; later matches overwrite them.
    fn seed_defaults(&mut self) {
        for opt in self.table.iter().filter(|opt| opt.is_mandatory()) {
            if let Some(ref default) = opt.default {
                self.state.values.insert(opt.name.clone(), default.clone());
            }
        }
    }

    /// Returns the number of extra tokens consumed.
    fn long_option<S: AsRef<str>>(
        &mut self,
        name: &str,
        index: usize,
        argv: &[S],
    ) -> Result<usize, ScanError> {
        let opt = self
            .find_long(name)
            .ok_or_else(|| ScanError::UnknownLongOption {
                index,
                name: name.to_string(),
            })?;
        self.take_value(opt, index, None, argv)
    }

    /// Every letter but the last is a flag; the last one may take the next token.
    fn short_cluster<S: AsRef<str>>(
        &mut self,
        arg: &str,
        index: usize,
        argv: &[S],
    ) -> Result<usize, ScanError> {
        let mut letters = arg.chars().enumerate().skip(1).peekable();

        while let Some((offset, letter)) = letters.next() {
            let opt = self
                .find_short(letter)
                .ok_or(ScanError::UnknownShortOption {
                    index,
                    offset,
                    letter,
                })?;

            if letters.peek().is_none() {
                return self.take_value(opt, index, Some(offset), argv);
            }

            let value =
                opt.acquire_without_token()
                    .map_err(|_| ScanError::MissingMandatoryValue {
                        index,
                        offset: Some(offset),
                        name: opt.name.clone(),
                    })?;
            self.store(opt, value);
        }

        Ok(0)
    }

    /// Look-ahead value rule shared by long options and the last letter of a cluster.
    fn take_value<S: AsRef<str>>(
        &mut self,
        opt: &OptionDescriptor,
        index: usize,
        offset: Option<usize>,
        argv: &[S],
    ) -> Result<usize, ScanError> {
        if opt.is_flag() {
            self.store(opt, TaggedValue::Bool(true));
            return Ok(0);
        }

        let next = argv
            .get(index + 1)
            .map(|token| token.as_ref())
            .filter(|token| !token.starts_with('-'));

        let Some(token) = next else {
            if opt.is_mandatory() {
                return Err(ScanError::MissingMandatoryValue {
                    index,
                    offset,
                    name: opt.name.clone(),
                });
            }
            debug!("optional '{}' given without a value", opt.name);
            self.store(opt, TaggedValue::Bool(true));
            return Ok(0);
        };

        match decode(Some(token), opt.value_type, opt.default.as_ref()) {
            Ok(value) => self.store(opt, value),
            Err(source) if opt.is_mandatory() => {
                return Err(ScanError::Decode {
                    index: index + 1,
                    name: opt.name.clone(),
                    source,
                });
            }
            Err(source) => {
                debug!("optional '{}' value unusable ({}), recording presence", opt.name, source);
                self.store(opt, TaggedValue::Bool(true));
            }
        }
        Ok(1)
    }

    fn store(&mut self, opt: &OptionDescriptor, value: TaggedValue) {
        self.state.values.insert(opt.name.clone(), value);
    }

    fn find_long(&self, name: &str) -> Option<&'a OptionDescriptor> {
        self.table.iter().find(|opt| opt.name == name)
    }

    /// First match wins when a table repeats a letter.
    fn find_short(&self, letter: char) -> Option<&'a OptionDescriptor> {
        self.table.iter().find(|opt| opt.short == Some(letter))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::demo_table;
    use crate::table::{OptionTable, Requirement};
    use crate::value::ValueType;

    fn scan_demo(args: &[&str]) -> (ParseResult, ConfigState) {
        let mut argv = vec!["prog"];
        argv.extend_from_slice(args);
        scan(&argv, &demo_table())
    }

    fn unwrap_parsed(outcome: (ParseResult, ConfigState)) -> ConfigState {
        match outcome {
            (ParseResult::Parsed, state) => state,
            (other, state) => panic!("Expected Parsed, got {:?} ({:?})", other, state.failure()),
        }
    }

    #[test]
    fn test_no_arguments_yields_seeded_defaults() {
        let state = unwrap_parsed(scan_demo(&[]));
        let mut keys: Vec<_> = state.values().keys().cloned().collect();
        keys.sort();
        assert_eq!(keys, vec!["dark_color", "log_dir", "probability"]);
        assert_eq!(state.get::<i32>("dark_color"), Some(0x090909));
        assert_eq!(state.get::<&str>("log_dir"), Some("."));
        assert_eq!(state.get::<f64>("probability"), Some(0.5));
        assert!(state.last_terminator().is_none());
        assert!(state.failure().is_none());
    }

    #[test]
    fn test_optional_default_is_not_seeded() {
        let state = unwrap_parsed(scan_demo(&[]));
        assert!(!state.has_value("id"));
    }

    #[test]
    fn test_short_flag() {
        let state = unwrap_parsed(scan_demo(&["-h"]));
        assert_eq!(state.get_value("help"), Some(&TaggedValue::Bool(true)));
    }

    #[test]
    fn test_long_flag() {
        let state = unwrap_parsed(scan_demo(&["--help"]));
        assert_eq!(state.get::<bool>("help"), Some(true));
    }

    #[test]
    fn test_flag_does_not_consume_next_token() {
        let state = unwrap_parsed(scan_demo(&["-h", "stray"]));
        assert_eq!(state.get::<bool>("help"), Some(true));
        assert_eq!(state.positionals(), &[(2, "stray".to_string())]);

        let state = unwrap_parsed(scan_demo(&["--help", "stray"]));
        assert_eq!(state.positionals(), &[(2, "stray".to_string())]);
    }

    #[test]
    fn test_mandatory_without_value_is_error() {
        let (result, state) = scan_demo(&["-D"]);
        assert_eq!(result, ParseResult::Error);
        assert_eq!(
            state.failure(),
            Some(&ScanError::MissingMandatoryValue {
                index: 1,
                offset: Some(1),
                name: "dark_color".to_string(),
            })
        );
        assert_eq!(state.bad_argument_index(), Some(1));
    }

    #[test]
    fn test_mandatory_followed_by_option_is_error() {
        let (result, state) = scan_demo(&["--dark_color", "-h"]);
        assert_eq!(result, ParseResult::Error);
        assert_eq!(state.bad_argument_index(), Some(1));
        assert_eq!(state.bad_argument_offset(), None);
    }

    #[test]
    fn test_hex_value_overrides_default() {
        let state = unwrap_parsed(scan_demo(&["-D", "505050"]));
        assert_eq!(state.get_value("dark_color"), Some(&TaggedValue::Int32(0x505050)));
    }

    #[test]
    fn test_full_value_set() {
        let state = unwrap_parsed(scan_demo(&["-D", "505050", "-O", ".", "-P", "0.7"]));
        assert_eq!(state.get::<i32>("dark_color"), Some(0x505050));
        assert_eq!(state.get::<&str>("output_directory"), Some("."));
        assert_eq!(state.get::<f64>("probability"), Some(0.7));
        assert_eq!(state.get::<&str>("log_dir"), Some("."));
        assert!(state.positionals().is_empty());
    }

    #[test]
    fn test_unknown_short_letter() {
        let (result, state) = scan_demo(&["-Z"]);
        assert_eq!(result, ParseResult::Unknown);
        assert_eq!(state.bad_argument_index(), Some(1));
        assert_eq!(state.bad_argument_offset(), Some(1));
    }

    #[test]
    fn test_unknown_letter_inside_cluster() {
        let (result, state) = scan_demo(&["-D", "1", "-help"]);
        assert_eq!(result, ParseResult::Unknown);
        assert_eq!(
            state.failure(),
            Some(&ScanError::UnknownShortOption {
                index: 3,
                offset: 2,
                letter: 'e',
            })
        );
        // letters before the unknown one were already applied
        assert_eq!(state.get::<bool>("help"), Some(true));
    }

    #[test]
    fn test_unknown_long_name() {
        let (result, state) = scan_demo(&["-h", "--nope"]);
        assert_eq!(result, ParseResult::BadOptionIndex);
        assert_eq!(
            state.failure(),
            Some(&ScanError::UnknownLongOption {
                index: 2,
                name: "nope".to_string(),
            })
        );
        assert_eq!(state.bad_argument_offset(), None);
    }

    #[test]
    fn test_long_lookup_ignores_short_letters() {
        let (result, _) = scan_demo(&["--h"]);
        assert_eq!(result, ParseResult::BadOptionIndex);
    }

    #[test]
    fn test_terminator_stops_scanning() {
        let state = unwrap_parsed(scan_demo(&["-h", "--", "-Z", "--nope"]));
        assert_eq!(state.last_terminator(), Some(2));
        assert_eq!(state.unparsed_from(), Some(3));
        assert_eq!(state.get::<bool>("help"), Some(true));
    }

    #[test]
    fn test_terminator_is_not_taken_as_value() {
        let (result, state) = scan_demo(&["-O", "--"]);
        assert_eq!(result, ParseResult::Error);
        assert_eq!(state.last_terminator(), None);
    }

    #[test]
    fn test_optional_followed_by_option_is_presence_marker() {
        let state = unwrap_parsed(scan_demo(&["-I", "-O", "out"]));
        assert_eq!(state.get_value("id"), Some(&TaggedValue::Bool(true)));
        assert_eq!(state.get::<&str>("output_directory"), Some("out"));
    }

    #[test]
    fn test_optional_at_end_is_presence_marker() {
        let state = unwrap_parsed(scan_demo(&["--id"]));
        assert_eq!(state.get::<bool>("id"), Some(true));
    }

    #[test]
    fn test_optional_bad_value_is_presence_marker() {
        let state = unwrap_parsed(scan_demo(&["-I", "abc", "-O", "x"]));
        assert_eq!(state.get::<bool>("id"), Some(true));
        assert!(state.positionals().is_empty());
    }

    #[test]
    fn test_optional_decimal_value() {
        let state = unwrap_parsed(scan_demo(&["-I", "1"]));
        assert_eq!(state.get_value("id"), Some(&TaggedValue::Int64(1)));
    }

    #[test]
    fn test_mandatory_bad_value_is_error_at_value_index() {
        let (result, state) = scan_demo(&["-O", ".", "-P", "abc"]);
        assert_eq!(result, ParseResult::Error);
        match state.failure() {
            Some(ScanError::Decode { index, name, .. }) => {
                assert_eq!(*index, 4);
                assert_eq!(name, "probability");
            }
            other => panic!("Expected Decode failure, got {:?}", other),
        }
        assert_eq!(state.get::<&str>("output_directory"), Some("."));
    }

    #[test]
    fn test_empty_token_is_consumed_as_value() {
        let state = unwrap_parsed(scan_demo(&["-O", ""]));
        assert_eq!(state.get::<&str>("output_directory"), Some(""));

        let (result, _) = scan_demo(&["-D", ""]);
        assert_eq!(result, ParseResult::Error);
    }

    #[test]
    fn test_cluster_last_letter_takes_value() {
        let state = unwrap_parsed(scan_demo(&["-hI", "5"]));
        assert_eq!(state.get::<bool>("help"), Some(true));
        assert_eq!(state.get::<i64>("id"), Some(5));
    }

    #[test]
    fn test_optional_inside_cluster_takes_default() {
        let state = unwrap_parsed(scan_demo(&["-Ih"]));
        assert_eq!(state.get::<i64>("id"), Some(0x100));
        assert_eq!(state.get::<bool>("help"), Some(true));
    }

    #[test]
    fn test_mandatory_inside_cluster_is_error() {
        let (result, state) = scan_demo(&["-hDh"]);
        assert_eq!(result, ParseResult::Error);
        assert_eq!(state.bad_argument_index(), Some(1));
        assert_eq!(state.bad_argument_offset(), Some(2));
    }

    #[test]
    fn test_positionals_are_collected() {
        let state = unwrap_parsed(scan_demo(&["in.txt", "-O", "out", "-", "more"]));
        assert_eq!(
            state.positionals(),
            &[
                (1, "in.txt".to_string()),
                (4, "-".to_string()),
                (5, "more".to_string()),
            ]
        );
    }

    #[test]
    fn test_program_name_is_never_scanned() {
        let table = demo_table();
        let (result, state) = scan(&["-Z"], &table);
        assert_eq!(result, ParseResult::Parsed);
        assert!(state.positionals().is_empty());

        let empty: [&str; 0] = [];
        let (result, _) = scan(&empty, &table);
        assert_eq!(result, ParseResult::Parsed);
    }

    #[test]
    fn test_later_occurrence_overwrites() {
        let state = unwrap_parsed(scan_demo(&["-O", "a", "--output_directory", "b"]));
        assert_eq!(state.get::<&str>("output_directory"), Some("b"));
    }

    #[test]
    fn test_scanning_is_repeatable() {
        let argv = ["prog", "-D", "505050", "-O", ".", "-hI", "7"];
        let table = demo_table();
        let first = scan(&argv, &table);
        let second = scan(&argv, &table);
        assert_eq!(first, second);
    }

    #[test]
    fn test_duplicate_short_first_match_wins() {
        let table = OptionTable::new(vec![
            OptionDescriptor::flag('v', "verbose", ""),
            OptionDescriptor::flag('v', "version", ""),
        ]);
        let (result, state) = scan(&["prog", "-v"], &table);
        assert_eq!(result, ParseResult::Parsed);
        assert!(state.has_value("verbose"));
        assert!(!state.has_value("version"));
    }

    #[test]
    fn test_accepts_owned_strings() {
        let table = OptionTable::new(vec![OptionDescriptor::with_value(
            'n',
            "count",
            "",
            Requirement::Mandatory,
            ValueType::Int32,
        )]);
        let argv: Vec<String> = ["prog", "-n", "-"].iter().map(|s| s.to_string()).collect();
        let (result, _) = scan(&argv, &table);
        assert_eq!(result, ParseResult::Error);

        let argv: Vec<String> = ["prog", "-n", "12"].iter().map(|s| s.to_string()).collect();
        let (_, state) = scan(&argv, &table);
        assert_eq!(state.get::<i32>("count"), Some(12));
    }

    #[test]
    fn test_error_result_mapping() {
        let err = ScanError::UnknownShortOption {
            index: 1,
            offset: 1,
            letter: 'Z',
        };
        assert_eq!(err.result(), ParseResult::Unknown);
        assert_eq!(
            err.to_string(),
            "unknown option '-Z' in argument 1 (offset 1)"
        );
    }
}
