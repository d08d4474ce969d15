//! Option descriptor tables and their JSON form.

use crate::value::{decode, DecodeError, TaggedValue, ValueKind, ValueType};
use serde::Deserialize;
use std::ops::Deref;
use thiserror::Error;

/// Errors that can occur while loading or validating a descriptor table.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to parse JSON option table: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("option with an empty long name")]
    EmptyName,

    #[error("invalid option name '{0}': must not start with '-' or contain whitespace or '='")]
    InvalidLongName(String),

    #[error("duplicate option name: {0}")]
    DuplicateName(String),

    #[error("duplicate short option '{0}'")]
    DuplicateShort(char),

    #[error("invalid short option '{0}': must be a single ASCII letter or digit")]
    InvalidShortOption(char),

    #[error("flag '{0}' cannot declare a value type")]
    ValueTypeOnFlag(String),

    #[error("option '{0}' takes a value but declares no value type")]
    MissingValueType(String),

    #[error("flag '{0}' cannot declare a default value")]
    DefaultOnFlag(String),

    #[error("default for '{name}' is a {found} value, expected {expected}")]
    DefaultKindMismatch {
        name: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("default for '{name}' does not fit a {value_type} value")]
    DefaultOutOfRange { name: String, value_type: ValueType },

    #[error("invalid default for '{name}': {source}")]
    InvalidDefault {
        name: String,
        #[source]
        source: DecodeError,
    },
}

/// How an option relates to a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Requirement {
    /// Takes no value; presence alone is recorded
    Flag,
    /// Takes a value; a missing or unusable one degrades to a presence marker
    Optional,
    /// Takes a value; a missing or unusable one fails the scan
    Mandatory,
}

/// One declarable option.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "RawDescriptor")]
pub struct OptionDescriptor {
    /// Long name, used after `--` and as the key in the result mapping
    pub name: String,
    /// Short letter used in `-x` clusters
    pub short: Option<char>,
    pub requirement: Requirement,
    pub value_type: ValueType,
    pub default: Option<TaggedValue>,
    /// Help text, shown in usage output only
    pub description: String,
}

impl OptionDescriptor {
    /// A flag: no value, recorded as `true` when present.
    pub fn flag(short: impl Into<Option<char>>, name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            short: short.into(),
            requirement: Requirement::Flag,
            value_type: ValueType::None,
            default: None,
            description: description.to_string(),
        }
    }

    /// An option that takes a value of `value_type`.
    pub fn with_value(
        short: impl Into<Option<char>>,
        name: &str,
        description: &str,
        requirement: Requirement,
        value_type: ValueType,
    ) -> Self {
        Self {
            name: name.to_string(),
            short: short.into(),
            requirement,
            value_type,
            default: None,
            description: description.to_string(),
        }
    }

    pub fn with_default(mut self, default: impl Into<TaggedValue>) -> Self {
        self.default = Some(default.into());
        self
    }

    pub fn is_flag(&self) -> bool {
        self.requirement == Requirement::Flag
    }

    pub fn is_mandatory(&self) -> bool {
        self.requirement == Requirement::Mandatory
    }

    /// Value for an occurrence that has no token to decode.
    ///
    /// Flags yield `true`, optional options their default or `true`, and
    /// mandatory options always fail.
    pub fn acquire_without_token(&self) -> Result<TaggedValue, DecodeError> {
        match self.requirement {
            Requirement::Flag => Ok(TaggedValue::Bool(true)),
            Requirement::Optional => Ok(decode(None, self.value_type, self.default.as_ref())
                .unwrap_or(TaggedValue::Bool(true))),
            Requirement::Mandatory => Err(DecodeError::MissingValue(self.value_type)),
        }
    }
}

/// JSON shape of a descriptor before its default is resolved.
#[derive(Deserialize)]
struct RawDescriptor {
    name: String,
    short: Option<char>,
    requirement: Requirement,
    #[serde(default)]
    value_type: ValueType,
    default: Option<RawDefault>,
    #[serde(default)]
    description: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawDefault {
    Integer(i64),
    Number(f64),
    Text(String),
}

impl TryFrom<RawDescriptor> for OptionDescriptor {
    type Error = ConfigError;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        let default = match raw.default {
            Some(default) => Some(resolve_default(&raw.name, raw.value_type, default)?),
            None => None,
        };
        Ok(Self {
            name: raw.name,
            short: raw.short,
            requirement: raw.requirement,
            value_type: raw.value_type,
            default,
            description: raw.description,
        })
    }
}

/// Text defaults go through the decoder, so `"0x090909"` works for hex types.
fn resolve_default(
    name: &str,
    value_type: ValueType,
    raw: RawDefault,
) -> Result<TaggedValue, ConfigError> {
    let out_of_range = || ConfigError::DefaultOutOfRange {
        name: name.to_string(),
        value_type,
    };
    match (raw, value_type) {
        (_, ValueType::None) => Err(ConfigError::DefaultOnFlag(name.to_string())),
        (RawDefault::Text(text), value_type) => {
            decode(Some(&text), value_type, None).map_err(|source| ConfigError::InvalidDefault {
                name: name.to_string(),
                source,
            })
        }
        (RawDefault::Integer(n), ValueType::Int32 | ValueType::Int32Hex) => i32::try_from(n)
            .map(TaggedValue::Int32)
            .map_err(|_| out_of_range()),
        (RawDefault::Integer(n), ValueType::Int64 | ValueType::Int64Hex) => {
            Ok(TaggedValue::Int64(n))
        }
        (RawDefault::Integer(n), ValueType::Float) => Ok(TaggedValue::Float(n as f64)),
        (RawDefault::Number(x), ValueType::Float) => Ok(TaggedValue::Float(x)),
        _ => Err(out_of_range()),
    }
}

/// Ordered table of option descriptors.
///
/// Dereferences to a slice so it can be handed straight to the scanner.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OptionTable {
    #[serde(default)]
    pub options: Vec<OptionDescriptor>,
}

impl OptionTable {
    pub fn new(options: Vec<OptionDescriptor>) -> Self {
        Self { options }
    }

    /// Parse a JSON string into a table.
    pub fn from_json(json: &str) -> Result<OptionTable, ConfigError> {
        let table: OptionTable = serde_json::from_str(json)?;
        Ok(table)
    }

    /// Validate the table.
    ///
    /// Scanning works on unvalidated tables too; there the first descriptor
    /// with a matching short letter wins.
    pub fn validate(&self) -> Result<(), ConfigError> {
        use std::collections::HashSet;

        let mut names = HashSet::new();
        let mut shorts = HashSet::new();

        for opt in &self.options {
            if opt.name.is_empty() {
                return Err(ConfigError::EmptyName);
            }
            if opt.name.starts_with('-')
                || opt.name.contains(|c: char| c.is_whitespace() || c == '=')
            {
                return Err(ConfigError::InvalidLongName(opt.name.clone()));
            }
            if !names.insert(opt.name.as_str()) {
                return Err(ConfigError::DuplicateName(opt.name.clone()));
            }
            if let Some(short) = opt.short {
                if !short.is_ascii_alphanumeric() {
                    return Err(ConfigError::InvalidShortOption(short));
                }
                if !shorts.insert(short) {
                    return Err(ConfigError::DuplicateShort(short));
                }
            }
            Self::validate_value_type(opt)?;
            Self::validate_default(opt)?;
        }

        Ok(())
    }

    /// Flags and only flags have no value type.
    fn validate_value_type(opt: &OptionDescriptor) -> Result<(), ConfigError> {
        match (opt.requirement, opt.value_type) {
            (Requirement::Flag, ValueType::None) => Ok(()),
            (Requirement::Flag, _) => Err(ConfigError::ValueTypeOnFlag(opt.name.clone())),
            (_, ValueType::None) => Err(ConfigError::MissingValueType(opt.name.clone())),
            _ => Ok(()),
        }
    }

    fn validate_default(opt: &OptionDescriptor) -> Result<(), ConfigError> {
        let Some(ref default) = opt.default else {
            return Ok(());
        };
        let Some(expected) = opt.value_type.kind() else {
            return Err(ConfigError::DefaultOnFlag(opt.name.clone()));
        };
        if default.kind() != expected {
            return Err(ConfigError::DefaultKindMismatch {
                name: opt.name.clone(),
                expected,
                found: default.kind(),
            });
        }
        Ok(())
    }
}

impl From<Vec<OptionDescriptor>> for OptionTable {
    fn from(options: Vec<OptionDescriptor>) -> Self {
        Self::new(options)
    }
}

impl Deref for OptionTable {
    type Target = [OptionDescriptor];

    fn deref(&self) -> &Self::Target {
        &self.options
    }
}
