//! Usage text generation for option tables using Clap.
//!
//! Clap only renders here; scanning never goes through it.

use crate::table::{ConfigError, OptionDescriptor, OptionTable, Requirement};
use crate::value::{TaggedValue, ValueType};
use clap::{Arg, ArgAction, Command};
use std::path::Path;

/// Build a Clap Command mirroring the table (for usage rendering only).
fn build_command(table: &OptionTable, program: &str) -> Command {
    let mut cmd = Command::new(display_name(program).to_string())
        .disable_help_flag(true)
        .disable_version_flag(true)
        .disable_help_subcommand(true);

    for opt in table.iter() {
        cmd = cmd.arg(build_arg(opt));
    }

    cmd
}

/// Build a Clap Arg from a descriptor.
fn build_arg(opt: &OptionDescriptor) -> Arg {
    let mut arg = Arg::new(opt.name.clone()).long(opt.name.clone());

    if let Some(short) = opt.short {
        arg = arg.short(short);
    }

    match opt.requirement {
        Requirement::Flag => {
            arg = arg.action(ArgAction::SetTrue);
        }
        Requirement::Optional | Requirement::Mandatory => {
            arg = arg
                .action(ArgAction::Set)
                .value_name(opt.value_type.placeholder());
        }
    }

    // a seeded default already satisfies a mandatory option
    if opt.is_mandatory() && opt.default.is_none() {
        arg = arg.required(true);
    }

    if let Some(ref default) = opt.default {
        arg = arg.default_value(format_default(default, opt.value_type));
    }

    if !opt.description.is_empty() {
        arg = arg.help(opt.description.clone());
    }

    arg
}

/// Program name without its directory part.
fn display_name(program: &str) -> &str {
    Path::new(program)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(program)
}

/// Render a default the way a user would type it; hex types get a `0x` prefix.
pub fn format_default(value: &TaggedValue, value_type: ValueType) -> String {
    match (value, value_type) {
        (TaggedValue::Int32(n), ValueType::Int32Hex) => format!("{:#x}", n),
        (TaggedValue::Int64(n), ValueType::Int64Hex) => format!("{:#x}", n),
        (value, _) => value.to_string(),
    }
}

/// Generate the full usage text for a table.
///
/// The table is validated first; Clap cannot render duplicate letters or names.
pub fn generate_help(table: &OptionTable, program: &str) -> Result<String, ConfigError> {
    table.validate()?;
    let mut cmd = build_command(table, program);
    Ok(cmd.render_help().to_string())
}

/// Generate the one-line usage summary for a table.
pub fn generate_usage(table: &OptionTable, program: &str) -> Result<String, ConfigError> {
    table.validate()?;
    let mut cmd = build_command(table, program);
    Ok(cmd.render_usage().to_string())
}
