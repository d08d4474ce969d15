//! Completeness check run after a successful scan.

use crate::scanner::ConfigState;
use crate::table::OptionDescriptor;
use crate::value::ValueKind;
use thiserror::Error;

/// First mandatory descriptor, in table order, that the state does not satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("mandatory value for '{name}' was not provided")]
    Missing { index: usize, name: String },

    #[error("mandatory value for '{name}' is a {found} value, expected {expected}")]
    KindMismatch {
        index: usize,
        name: String,
        expected: ValueKind,
        found: ValueKind,
    },

    #[error("value for '{name}' is a {found} value, expected {expected}")]
    TypeMismatch {
        index: usize,
        name: String,
        expected: ValueKind,
        found: ValueKind,
    },
}

impl ValidationFailure {
    /// Position of the failing descriptor in the table.
    pub fn index(&self) -> usize {
        match self {
            ValidationFailure::Missing { index, .. }
            | ValidationFailure::KindMismatch { index, .. }
            | ValidationFailure::TypeMismatch { index, .. } => *index,
        }
    }
}

/// Check that every mandatory descriptor has a value.
///
/// When the descriptor declares a default, the stored value must also carry
/// the same tag as that default.
pub fn validate(state: &ConfigState, table: &[OptionDescriptor]) -> Result<(), ValidationFailure> {
    for (index, opt) in table.iter().enumerate() {
        if !opt.is_mandatory() {
            continue;
        }

        let Some(value) = state.get_value(&opt.name) else {
            return Err(ValidationFailure::Missing {
                index,
                name: opt.name.clone(),
            });
        };

        if let Some(ref default) = opt.default {
            if !value.same_kind(default) {
                return Err(ValidationFailure::KindMismatch {
                    index,
                    name: opt.name.clone(),
                    expected: default.kind(),
                    found: value.kind(),
                });
            }
        }
    }

    Ok(())
}

/// Check every stored value whose descriptor declares a default, whatever
/// its requirement, against the tag of that default.
///
/// An optional option whose value was missing or undecodable holds `true`
/// here and is reported.
pub fn check_types(state: &ConfigState, table: &[OptionDescriptor]) -> Result<(), ValidationFailure> {
    for (index, opt) in table.iter().enumerate() {
        let (Some(default), Some(value)) = (opt.default.as_ref(), state.get_value(&opt.name)) else {
            continue;
        };
        if !value.same_kind(default) {
            return Err(ValidationFailure::TypeMismatch {
                index,
                name: opt.name.clone(),
                expected: default.kind(),
                found: value.kind(),
            });
        }
    }

    Ok(())
}

/// Index form of [`validate`]: `None` when every mandatory option is satisfied.
pub fn first_unsatisfied(state: &ConfigState, table: &[OptionDescriptor]) -> Option<usize> {
    validate(state, table).err().map(|failure| failure.index())
}
