//! Typed option values and the token decoder.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::ParseIntError;
use thiserror::Error;

/// Errors produced while turning a raw token into a typed value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    #[error("no value supplied for {0} option and no default available")]
    MissingValue(ValueType),

    #[error("empty token where a {0} value was expected")]
    Empty(ValueType),

    #[error("invalid {value_type} value '{token}'")]
    Invalid { value_type: ValueType, token: String },
}

/// Expected value type of an option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    /// No value (flags)
    #[default]
    None,
    String,
    Int32,
    /// 32-bit integer written in hex, `0x` prefix optional
    Int32Hex,
    Int64,
    /// 64-bit integer written in hex, `0x` prefix optional
    Int64Hex,
    Float,
}

impl ValueType {
    /// The tag a successfully decoded token of this type carries.
    ///
    /// `None` has no natural tag: flags only ever hold the boolean presence marker.
    pub fn kind(self) -> Option<ValueKind> {
        match self {
            ValueType::None => None,
            ValueType::String => Some(ValueKind::Text),
            ValueType::Int32 | ValueType::Int32Hex => Some(ValueKind::Int32),
            ValueType::Int64 | ValueType::Int64Hex => Some(ValueKind::Int64),
            ValueType::Float => Some(ValueKind::Float),
        }
    }

    /// Placeholder shown in usage text for the option's value.
    pub fn placeholder(self) -> &'static str {
        match self {
            ValueType::None => "",
            ValueType::String => "TEXT",
            ValueType::Int32 | ValueType::Int64 => "INT",
            ValueType::Int32Hex | ValueType::Int64Hex => "HEX",
            ValueType::Float => "FLOAT",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueType::None => "none",
            ValueType::String => "string",
            ValueType::Int32 => "int32",
            ValueType::Int32Hex => "int32hex",
            ValueType::Int64 => "int64",
            ValueType::Int64Hex => "int64hex",
            ValueType::Float => "float",
        };
        f.write_str(name)
    }
}

/// Active tag of a [`TaggedValue`], independent of its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Text,
    Int32,
    Int64,
    Float,
    Bool,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::Text => "text",
            ValueKind::Int32 => "int32",
            ValueKind::Int64 => "int64",
            ValueKind::Float => "float",
            ValueKind::Bool => "bool",
        };
        f.write_str(name)
    }
}

/// A decoded option value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TaggedValue {
    Text(String),
    Int32(i32),
    Int64(i64),
    Float(f64),
    /// Presence marker for flags and for optional options whose value was unusable.
    Bool(bool),
}

impl TaggedValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            TaggedValue::Text(_) => ValueKind::Text,
            TaggedValue::Int32(_) => ValueKind::Int32,
            TaggedValue::Int64(_) => ValueKind::Int64,
            TaggedValue::Float(_) => ValueKind::Float,
            TaggedValue::Bool(_) => ValueKind::Bool,
        }
    }

    /// Two values are type-compatible when their tags match.
    pub fn same_kind(&self, other: &TaggedValue) -> bool {
        self.kind() == other.kind()
    }
}

impl fmt::Display for TaggedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaggedValue::Text(s) => f.write_str(s),
            TaggedValue::Int32(n) => write!(f, "{}", n),
            TaggedValue::Int64(n) => write!(f, "{}", n),
            TaggedValue::Float(x) => write!(f, "{}", x),
            TaggedValue::Bool(b) => write!(f, "{}", b),
        }
    }
}

impl From<&str> for TaggedValue {
    fn from(value: &str) -> Self {
        TaggedValue::Text(value.to_string())
    }
}

impl From<String> for TaggedValue {
    fn from(value: String) -> Self {
        TaggedValue::Text(value)
    }
}

impl From<i32> for TaggedValue {
    fn from(value: i32) -> Self {
        TaggedValue::Int32(value)
    }
}

impl From<i64> for TaggedValue {
    fn from(value: i64) -> Self {
        TaggedValue::Int64(value)
    }
}

impl From<f64> for TaggedValue {
    fn from(value: f64) -> Self {
        TaggedValue::Float(value)
    }
}

impl From<bool> for TaggedValue {
    fn from(value: bool) -> Self {
        TaggedValue::Bool(value)
    }
}

/// Requested a payload of one kind from a value holding another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("expected a {expected} value, found {found}")]
pub struct KindMismatch {
    pub expected: ValueKind,
    pub found: ValueKind,
}

macro_rules! impl_try_from_value {
    ($ty:ty, $variant:ident) => {
        impl TryFrom<&TaggedValue> for $ty {
            type Error = KindMismatch;

            fn try_from(value: &TaggedValue) -> Result<Self, Self::Error> {
                match value {
                    TaggedValue::$variant(v) => Ok(*v),
                    other => Err(KindMismatch {
                        expected: ValueKind::$variant,
                        found: other.kind(),
                    }),
                }
            }
        }
    };
}

impl_try_from_value!(i32, Int32);
impl_try_from_value!(i64, Int64);
impl_try_from_value!(f64, Float);
impl_try_from_value!(bool, Bool);

impl<'a> TryFrom<&'a TaggedValue> for &'a str {
    type Error = KindMismatch;

    fn try_from(value: &'a TaggedValue) -> Result<Self, Self::Error> {
        match value {
            TaggedValue::Text(s) => Ok(s.as_str()),
            other => Err(KindMismatch {
                expected: ValueKind::Text,
                found: other.kind(),
            }),
        }
    }
}

/// Decode a raw token according to `value_type`.
///
/// An absent token yields `default`, or `true` for flags. A token that is
/// present but malformed is always an error; the default is never
/// substituted for it.
pub fn decode(
    token: Option<&str>,
    value_type: ValueType,
    default: Option<&TaggedValue>,
) -> Result<TaggedValue, DecodeError> {
    let Some(token) = token else {
        return match (default, value_type) {
            (Some(default), _) => Ok(default.clone()),
            (None, ValueType::None) => Ok(TaggedValue::Bool(true)),
            (None, value_type) => Err(DecodeError::MissingValue(value_type)),
        };
    };

    match value_type {
        ValueType::None => Ok(TaggedValue::Bool(true)),
        ValueType::String => Ok(TaggedValue::Text(token.to_string())),
        ValueType::Int32 => decode_decimal::<i32>(token, value_type).map(TaggedValue::Int32),
        ValueType::Int64 => decode_decimal::<i64>(token, value_type).map(TaggedValue::Int64),
        ValueType::Int32Hex => {
            decode_hex(token, value_type, i32::from_str_radix).map(TaggedValue::Int32)
        }
        ValueType::Int64Hex => {
            decode_hex(token, value_type, i64::from_str_radix).map(TaggedValue::Int64)
        }
        ValueType::Float => decode_float(token).map(TaggedValue::Float),
    }
}

fn invalid(value_type: ValueType, token: &str) -> DecodeError {
    DecodeError::Invalid {
        value_type,
        token: token.to_string(),
    }
}

/// Base-10 with an optional sign; trailing garbage is rejected.
fn decode_decimal<T>(token: &str, value_type: ValueType) -> Result<T, DecodeError>
where
    T: std::str::FromStr<Err = ParseIntError>,
{
    if token.is_empty() {
        return Err(DecodeError::Empty(value_type));
    }
    token.parse::<T>().map_err(|_| invalid(value_type, token))
}

/// Hex digits only, after an optional `0x`/`0X`. Signs are not accepted and
/// magnitudes beyond the signed maximum of the width are rejected.
fn decode_hex<T>(
    token: &str,
    value_type: ValueType,
    from_radix: fn(&str, u32) -> Result<T, ParseIntError>,
) -> Result<T, DecodeError> {
    if token.is_empty() {
        return Err(DecodeError::Empty(value_type));
    }
    let digits = token
        .strip_prefix("0x")
        .or_else(|| token.strip_prefix("0X"))
        .unwrap_or(token);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(invalid(value_type, token));
    }
    from_radix(digits, 16).map_err(|_| invalid(value_type, token))
}

/// Decodes the longest leading floating-point literal, like C `strtod`:
/// decimal and `0x` hexadecimal forms plus `inf`/`infinity`/`nan`.
/// Fails only when nothing could be consumed.
fn decode_float(token: &str) -> Result<f64, DecodeError> {
    if token.is_empty() {
        return Err(DecodeError::Empty(ValueType::Float));
    }
    if let Some(value) = hex_float(token) {
        return Ok(value);
    }
    let literal = float_prefix(token);
    if literal.is_empty() {
        return Err(invalid(ValueType::Float, token));
    }
    literal
        .parse::<f64>()
        .map_err(|_| invalid(ValueType::Float, token))
}

fn float_prefix(token: &str) -> &str {
    let s = token.trim_start();
    let bytes = s.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end = 1;
    }

    let rest = &s[end..];
    for word in ["infinity", "inf", "nan"] {
        if rest
            .get(..word.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(word))
        {
            return &s[..end + word.len()];
        }
    }

    let int_digits = count_digits(bytes, end);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = count_digits(bytes, end + 1);
        if int_digits + frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return "";
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = count_digits(bytes, exp);
        if exp_digits > 0 {
            end = exp + exp_digits;
        }
    }

    &s[..end]
}

/// `[sign]0x<hex>[.<hex>][p[sign]<decimal>]`. `None` when no hex digit
/// follows the prefix, in which case only the leading `0` is a literal.
fn hex_float(token: &str) -> Option<f64> {
    let s = token.trim_start();
    let (negative, s) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let bytes = s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))?.as_bytes();
    let hex_digit = |pos: usize| bytes.get(pos).and_then(|b| char::from(*b).to_digit(16));

    let mut mantissa = 0.0_f64;
    let mut exponent: i64 = 0;
    let mut digits = 0;
    let mut pos = 0;

    while let Some(d) = hex_digit(pos) {
        mantissa = mantissa * 16.0 + f64::from(d);
        digits += 1;
        pos += 1;
    }
    if bytes.get(pos) == Some(&b'.') {
        pos += 1;
        while let Some(d) = hex_digit(pos) {
            mantissa = mantissa * 16.0 + f64::from(d);
            exponent -= 4;
            digits += 1;
            pos += 1;
        }
    }
    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(pos), Some(b'p' | b'P')) {
        let mut exp = pos + 1;
        let exp_negative = bytes.get(exp) == Some(&b'-');
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = count_digits(bytes, exp);
        if exp_digits > 0 {
            let magnitude = bytes[exp..exp + exp_digits]
                .iter()
                .fold(0_i64, |acc, b| {
                    acc.saturating_mul(10).saturating_add(i64::from(b - b'0'))
                });
            exponent = if exp_negative {
                exponent.saturating_sub(magnitude)
            } else {
                exponent.saturating_add(magnitude)
            };
        }
    }

    // i32 covers far more than the f64 exponent range
    let exponent = exponent.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32;
    let value = mantissa * 2.0_f64.powi(exponent);
    Some(if negative { -value } else { value })
}

fn count_digits(bytes: &[u8], from: usize) -> usize {
    bytes
        .get(from..)
        .map(|tail| tail.iter().take_while(|b| b.is_ascii_digit()).count())
        .unwrap_or(0)
}
