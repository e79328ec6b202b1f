//! Value coercion
//!
//! Converts loosely typed request literals (mostly strings) into the type of
//! the field they are compared against. Parsing is culture invariant.
//!
//! Coercion is strict: a non-empty literal that cannot be read as the target
//! type is a [`CoercionError`]. Filtering decides for itself how to degrade.

use super::value::{EnumDescriptor, EnumValue, FieldKind, TypeInfo, Value, CANONICAL_DATE_FORMAT};
use crate::error::ErrorCode;
use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// Literal carries an explicit zone: `Z` or a `+hh:mm` / `-hhmm` offset
static OFFSET_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:[Zz]|[+-]\d{2}:?\d{2})$").expect("Valid regex pattern"));

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M%:z",
];

const LOCAL_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const LOCAL_DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"];

/// Strict coercion failure
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoercionError {
    #[error("'{input}' is not a valid Guid")]
    Guid { input: String },

    #[error("'{input}' is not a valid {target}")]
    Date { input: String, target: &'static str },

    #[error("'{input}' does not name a member of {target}")]
    Enum { input: String, target: &'static str },

    #[error("'{input}' is not a valid {target}")]
    Numeric { input: String, target: &'static str },

    #[error("'{input}' is not a valid Boolean")]
    Bool { input: String },

    #[error("null cannot be assigned to non-nullable {target}")]
    NullNotAllowed { target: &'static str },

    #[error("{target} does not accept the literal '{input}'")]
    Unsupported { input: String, target: &'static str },
}

impl CoercionError {
    pub fn code(&self) -> u16 {
        match self {
            CoercionError::Guid { .. } => ErrorCode::COERCION_GUID,
            CoercionError::Date { .. } => ErrorCode::COERCION_DATE,
            CoercionError::Enum { .. } => ErrorCode::COERCION_ENUM,
            CoercionError::Numeric { .. } => ErrorCode::COERCION_NUMERIC,
            CoercionError::Bool { .. } => ErrorCode::COERCION_BOOL,
            CoercionError::NullNotAllowed { .. } => ErrorCode::COERCION_GENERIC,
            CoercionError::Unsupported { .. } => ErrorCode::COERCION_UNSUPPORTED,
        }
    }

    /// Name of the target type the literal was coerced to
    pub fn target(&self) -> Option<&str> {
        match self {
            CoercionError::Guid { .. } => Some("Guid"),
            CoercionError::Bool { .. } => Some("Boolean"),
            CoercionError::Date { target, .. }
            | CoercionError::Enum { target, .. }
            | CoercionError::Numeric { target, .. }
            | CoercionError::NullNotAllowed { target }
            | CoercionError::Unsupported { target, .. } => Some(target),
        }
    }
}

/// A parsed date literal, before it is fitted to a target kind
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParsedDate {
    /// Literal carried an explicit zone
    Offset(DateTime<FixedOffset>),
    /// Literal had no zone; read as a wall-clock time
    Local(NaiveDateTime),
}

impl ParsedDate {
    /// Wall-clock time normalized to UTC when a zone was given
    pub fn to_utc_naive(self) -> NaiveDateTime {
        match self {
            ParsedDate::Offset(dt) => dt.naive_utc(),
            ParsedDate::Local(dt) => dt,
        }
    }

    pub fn to_offset(self) -> DateTime<FixedOffset> {
        match self {
            ParsedDate::Offset(dt) => dt,
            ParsedDate::Local(dt) => dt.and_utc().fixed_offset(),
        }
    }

    /// Canonical `yyyy-MM-ddTHH:mm:ss.fffZ` rendering
    pub fn to_canonical(self) -> String {
        self.to_utc_naive().format(CANONICAL_DATE_FORMAT).to_string()
    }
}

/// Pure function: Coerce a raw literal to the given field type
///
/// - Null, and empty strings for non-string targets, coerce to null.
/// - A value that already has the target kind is returned unchanged.
/// - Unknown, object and list targets accept the value as it is.
pub fn coerce(raw: &Value, target: &TypeInfo) -> Result<Value, CoercionError> {
    if raw.is_null() {
        return Ok(Value::Null);
    }
    if matches!(raw, Value::String(s) if s.is_empty()) && target.kind != FieldKind::String {
        return Ok(Value::Null);
    }
    if raw.kind() == Some(target.kind) {
        return Ok(raw.clone());
    }

    match target.kind {
        FieldKind::Unknown | FieldKind::Object | FieldKind::List => Ok(raw.clone()),
        FieldKind::String => Ok(Value::String(raw.to_string())),
        FieldKind::Guid => coerce_guid(raw),
        FieldKind::DateTime => {
            coerce_date(raw, target.kind).map(|d| Value::DateTime(d.to_utc_naive()))
        }
        FieldKind::DateTimeOffset => {
            coerce_date(raw, target.kind).map(|d| Value::DateTimeOffset(d.to_offset()))
        }
        FieldKind::Enum(descriptor) => {
            resolve_enum(raw, descriptor)
                .map(Value::Enum)
                .ok_or_else(|| CoercionError::Enum {
                    input: raw.to_string(),
                    target: descriptor.name,
                })
        }
        FieldKind::Bool => coerce_bool(raw),
        numeric => coerce_numeric(raw, numeric),
    }
}

/// Coerce a filter literal for comparison against a field of `target` type.
///
/// Same as [`coerce`], except that a fractional literal against an integer
/// field keeps its fraction: `Qty > 15.5` must not turn into `Qty > 16`.
pub fn coerce_for_comparison(raw: &Value, target: &TypeInfo) -> Result<Value, CoercionError> {
    let integral_target = matches!(
        target.kind,
        FieldKind::Int16 | FieldKind::Int32 | FieldKind::Int64
    );
    match fractional_literal(raw) {
        Some(fraction) if integral_target => Ok(fraction),
        _ => coerce(raw, target),
    }
}

fn fractional_literal(raw: &Value) -> Option<Value> {
    match raw {
        Value::Float32(f) if f.fract() != 0.0 => Some(Value::Float64(f64::from(*f))),
        Value::Float64(f) if f.fract() != 0.0 => Some(raw.clone()),
        Value::Decimal(d) if !d.fract().is_zero() => Some(raw.clone()),
        Value::String(text) => {
            let text = text.trim();
            if text.parse::<i64>().is_ok() {
                return None;
            }
            text.parse::<f64>()
                .ok()
                .filter(|f| f.is_finite())
                .map(Value::Float64)
        }
        _ => None,
    }
}

/// Pure function: Resolve a literal to an enum value
///
/// Member lookup (wire name, else identifier) comes first. Failing that the
/// literal is read against the underlying representation: an identifier
/// even when the member declares a wire name, or an integer.
pub fn resolve_enum(raw: &Value, descriptor: &'static EnumDescriptor) -> Option<EnumValue> {
    match raw {
        Value::Enum(e) if e.descriptor == descriptor => Some(*e),
        Value::String(text) => {
            let text = text.trim();
            descriptor
                .lookup(text)
                .or_else(|| descriptor.by_name(text))
                .map(|member| descriptor.value_of(member))
                .or_else(|| {
                    text.parse::<i64>().ok().map(|value| EnumValue { descriptor, value })
                })
        }
        other => other.as_i64().map(|value| EnumValue { descriptor, value }),
    }
}

/// Pure function: Parse a date literal, honoring an explicit zone suffix
pub fn parse_date_literal(text: &str) -> Option<ParsedDate> {
    let text = text.trim();
    if OFFSET_SUFFIX.is_match(text) {
        if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
            return Some(ParsedDate::Offset(dt));
        }
        return OFFSET_FORMATS
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(text, fmt).ok())
            .map(ParsedDate::Offset);
    }

    LOCAL_DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .or_else(|| {
            LOCAL_DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
        .map(ParsedDate::Local)
}

/// Pure function: Normalize a date literal to `yyyy-MM-ddTHH:mm:ss.fffZ`
pub fn normalize_date_string(text: &str) -> Result<String, CoercionError> {
    parse_date_literal(text)
        .map(ParsedDate::to_canonical)
        .ok_or_else(|| CoercionError::Date {
            input: text.to_string(),
            target: "DateTime",
        })
}

fn coerce_guid(raw: &Value) -> Result<Value, CoercionError> {
    match raw {
        Value::String(text) => Uuid::parse_str(text.trim())
            .map(Value::Guid)
            .map_err(|_| CoercionError::Guid {
                input: text.clone(),
            }),
        other => Err(CoercionError::Guid {
            input: other.to_string(),
        }),
    }
}

fn coerce_date(raw: &Value, kind: FieldKind) -> Result<ParsedDate, CoercionError> {
    match raw {
        Value::DateTime(dt) => Ok(ParsedDate::Local(*dt)),
        Value::DateTimeOffset(dt) => Ok(ParsedDate::Offset(*dt)),
        Value::String(text) => parse_date_literal(text).ok_or_else(|| CoercionError::Date {
            input: text.clone(),
            target: kind.name(),
        }),
        other => Err(CoercionError::Date {
            input: other.to_string(),
            target: kind.name(),
        }),
    }
}

fn coerce_bool(raw: &Value) -> Result<Value, CoercionError> {
    let error = || CoercionError::Bool {
        input: raw.to_string(),
    };
    match raw {
        Value::String(text) => {
            let text = text.trim();
            if text.eq_ignore_ascii_case("true") {
                Ok(Value::Bool(true))
            } else if text.eq_ignore_ascii_case("false") {
                Ok(Value::Bool(false))
            } else {
                Err(error())
            }
        }
        other => match other.as_f64() {
            Some(n) => Ok(Value::Bool(n != 0.0)),
            None => Err(error()),
        },
    }
}

fn coerce_numeric(raw: &Value, kind: FieldKind) -> Result<Value, CoercionError> {
    let error = || CoercionError::Numeric {
        input: raw.to_string(),
        target: kind.name(),
    };
    let converted = match raw {
        Value::String(text) => parse_numeric(text.trim(), kind),
        Value::Bool(b) => integral_to(i64::from(*b), kind),
        Value::Enum(e) => integral_to(e.value, kind),
        other if other.is_numeric() => convert_numeric(other, kind),
        _ => None,
    };
    converted.ok_or_else(error)
}

fn parse_numeric(text: &str, kind: FieldKind) -> Option<Value> {
    match kind {
        FieldKind::Int16 => text.parse::<i16>().ok().map(Value::Int16),
        FieldKind::Int32 => text.parse::<i32>().ok().map(Value::Int32),
        FieldKind::Int64 => text.parse::<i64>().ok().map(Value::Int64),
        FieldKind::Float32 => text.parse::<f32>().ok().map(Value::Float32),
        FieldKind::Float64 => text.parse::<f64>().ok().map(Value::Float64),
        FieldKind::Decimal => Decimal::from_str(text)
            .or_else(|_| Decimal::from_scientific(text))
            .ok()
            .map(Value::Decimal),
        _ => None,
    }
}

/// Numeric-to-numeric conversion; fractions round half to even when the
/// target is integral
fn convert_numeric(value: &Value, kind: FieldKind) -> Option<Value> {
    match kind {
        FieldKind::Int16 | FieldKind::Int32 | FieldKind::Int64 => {
            let integral = match value.as_i64() {
                Some(i) => i,
                None => {
                    let f = value.as_f64()?.round_ties_even();
                    if !f.is_finite() || f < i64::MIN as f64 || f > i64::MAX as f64 {
                        return None;
                    }
                    f as i64
                }
            };
            integral_to(integral, kind)
        }
        FieldKind::Float32 => value.as_f64().map(|f| Value::Float32(f as f32)),
        FieldKind::Float64 => value.as_f64().map(Value::Float64),
        FieldKind::Decimal => value.as_decimal().map(Value::Decimal),
        _ => None,
    }
}

fn integral_to(value: i64, kind: FieldKind) -> Option<Value> {
    match kind {
        FieldKind::Int16 => i16::try_from(value).ok().map(Value::Int16),
        FieldKind::Int32 => i32::try_from(value).ok().map(Value::Int32),
        FieldKind::Int64 => Some(Value::Int64(value)),
        FieldKind::Float32 => Some(Value::Float32(value as f32)),
        FieldKind::Float64 => Some(Value::Float64(value as f64)),
        FieldKind::Decimal => Some(Value::Decimal(Decimal::from(value))),
        _ => None,
    }
}
