//! Rendering a scanned state: report lines, JSON, or shell export files.

use crate::scanner::ConfigState;
use crate::table::OptionDescriptor;
use crate::value::TaggedValue;
use anyhow::Result;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// Escape a string for safe use in a shell double-quoted context.
///
/// Escapes: $, `, \, ", and !
fn escape_shell_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '$' => escaped.push_str("\\$"),
            '`' => escaped.push_str("\\`"),
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '!' => escaped.push_str("\\!"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Convert an option name to a valid shell variable name.
fn to_shell_var_name(name: &str) -> String {
    name.to_uppercase().replace('-', "_")
}

/// One `name => 'value'` line per stored value, in table order.
pub fn generate_report_string(state: &ConfigState, table: &[OptionDescriptor]) -> String {
    let mut output = String::new();

    for opt in table {
        if let Some(value) = state.get_value(&opt.name) {
            output.push_str(&format!("{} => '{}'\n", opt.name, value));
        }
    }
    for (index, text) in state.positionals() {
        output.push_str(&format!("positional {} => '{}'\n", index, text));
    }
    if let Some(from) = state.unparsed_from() {
        output.push_str(&format!("unparsed arguments from {}\n", from));
    }

    output
}

#[derive(Serialize)]
struct JsonReport<'a> {
    values: BTreeMap<&'a str, &'a TaggedValue>,
    positionals: Vec<&'a str>,
    unparsed_from: Option<usize>,
}

/// The state as a JSON object with sorted keys.
pub fn generate_json(state: &ConfigState) -> serde_json::Result<String> {
    let report = JsonReport {
        values: state
            .values()
            .iter()
            .map(|(name, value)| (name.as_str(), value))
            .collect(),
        positionals: state
            .positionals()
            .iter()
            .map(|(_, text)| text.as_str())
            .collect(),
        unparsed_from: state.unparsed_from(),
    };
    serde_json::to_string_pretty(&report)
}

/// Shell export statements for every stored value, sorted by name.
pub fn generate_exports_string(state: &ConfigState, prefix: &str) -> String {
    let mut output = String::new();

    let mut names: Vec<_> = state.values().keys().collect();
    names.sort();

    for name in names {
        let value = &state.values()[name];
        let var_name = format!("{}{}", prefix, to_shell_var_name(name));
        let escaped_value = escape_shell_value(&value.to_string());
        output.push_str(&format!("export {}=\"{}\"\n", var_name, escaped_value));
    }

    output
}

/// Write the export statements to a temporary file that outlives the process.
pub fn generate_exports(state: &ConfigState, prefix: &str) -> Result<PathBuf> {
    write_temp_file(&generate_exports_string(state, prefix))
}

/// Sourceable text that reports `message` on stderr and exits with `code`.
pub fn generate_error_string(message: &str, code: i32) -> String {
    let escaped = escape_shell_value(message);
    format!("echo \"optscan: {}\" >&2\nexit {}\n", escaped, code)
}

/// Write an error script to a temporary file.
pub fn generate_error_output(message: &str, code: i32) -> Result<PathBuf> {
    write_temp_file(&generate_error_string(message, code))
}

/// Write content to a temporary file and return its path.
fn write_temp_file(content: &str) -> Result<PathBuf> {
    let mut file = NamedTempFile::new()?;
    file.write_all(content.as_bytes())?;
    let path = file.into_temp_path().keep()?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harness::demo_table;
    use crate::scanner::scan;

    fn make_state(pairs: &[(&str, TaggedValue)]) -> ConfigState {
        let mut state = ConfigState::default();
        for (name, value) in pairs {
            state.set_value(*name, value.clone());
        }
        state
    }

    #[test]
    fn test_report_follows_table_order() {
        let table = demo_table();
        let (_, state) = scan(&["prog", "-P", "0.7", "-O", "out"], &table);
        let report = generate_report_string(&state, &table);
        assert_eq!(
            report,
            "output_directory => 'out'\n\
             dark_color => '592137'\n\
             log_dir => '.'\n\
             probability => '0.7'\n"
        );
    }

    #[test]
    fn test_report_mentions_positionals_and_terminator() {
        let table = demo_table();
        let (_, state) = scan(&["prog", "file", "--", "-x"], &table);
        let report = generate_report_string(&state, &table);
        assert!(report.contains("positional 1 => 'file'\n"));
        assert!(report.ends_with("unparsed arguments from 3\n"));
    }

    #[test]
    fn test_json_output() {
        let state = make_state(&[
            ("id", TaggedValue::Int64(256)),
            ("help", TaggedValue::Bool(true)),
            ("log_dir", TaggedValue::from(".")),
        ]);
        let json = generate_json(&state).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["values"]["id"], 256);
        assert_eq!(parsed["values"]["help"], true);
        assert_eq!(parsed["values"]["log_dir"], ".");
        assert!(parsed["unparsed_from"].is_null());
        assert!(parsed["positionals"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_basic_exports() {
        let state = make_state(&[
            ("verbose", TaggedValue::Bool(true)),
            ("output", TaggedValue::from("file.txt")),
        ]);
        let output = generate_exports_string(&state, "OPT_");

        assert_eq!(
            output,
            "export OPT_OUTPUT=\"file.txt\"\nexport OPT_VERBOSE=\"true\"\n"
        );
    }

    #[test]
    fn test_exports_escape_values() {
        let state = make_state(&[("complex", TaggedValue::from("$var \"quoted\" `cmd` \\path!"))]);
        let output = generate_exports_string(&state, "TEST_");

        assert!(
            output.contains("export TEST_COMPLEX=\"\\$var \\\"quoted\\\" \\`cmd\\` \\\\path\\!\"")
        );
    }

    #[test]
    fn test_exports_numeric_values() {
        let state = make_state(&[
            ("dark-color", TaggedValue::Int32(0x505050)),
            ("probability", TaggedValue::Float(0.7)),
        ]);
        let output = generate_exports_string(&state, "OPT_");

        assert!(output.contains("export OPT_DARK_COLOR=\"5263440\""));
        assert!(output.contains("export OPT_PROBABILITY=\"0.7\""));
    }

    #[test]
    fn test_generate_exports_creates_file() {
        let state = make_state(&[("test", TaggedValue::from("value"))]);
        let path = generate_exports(&state, "OPT_").unwrap();

        assert!(path.exists());

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("export OPT_TEST=\"value\""));

        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_generate_error_string() {
        let output = generate_error_string("unknown option '--foo' in argument 1", 2);
        assert!(output.contains("echo \"optscan: unknown option '--foo' in argument 1\" >&2"));
        assert!(output.ends_with("exit 2\n"));
    }

    #[test]
    fn test_generate_error_output_creates_file() {
        let path = generate_error_output("bad value: $HOME", 1).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("\\$HOME"));
        assert!(contents.contains("exit 1"));

        std::fs::remove_file(path).unwrap();
    }
}
