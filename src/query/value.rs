//! Dynamic field values and field type descriptors
//!
//! Records of every representation hand their members to the engine as
//! [`Value`]s. Comparison, equality and stringification rules live here so
//! that filtering, sorting, grouping and aggregation agree on them.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Serialize, Serializer};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Canonical UTC rendering of dates: `yyyy-MM-ddTHH:mm:ss.fffZ`
pub const CANONICAL_DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// One declared member of an enum type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumMember {
    /// Code identifier of the member
    pub name: &'static str,
    /// Explicit wire name, when it differs from the identifier
    pub wire_name: Option<&'static str>,
    /// Underlying numeric representation
    pub value: i64,
}

impl EnumMember {
    pub const fn new(name: &'static str, value: i64) -> Self {
        Self {
            name,
            wire_name: None,
            value,
        }
    }

    pub const fn with_wire_name(name: &'static str, wire_name: &'static str, value: i64) -> Self {
        Self {
            name,
            wire_name: Some(wire_name),
            value,
        }
    }

    /// Name used on the wire: the explicit wire name or the identifier
    pub fn display_name(&self) -> &'static str {
        self.wire_name.unwrap_or(self.name)
    }
}

/// Static description of an enum type, registered once per enum shape
#[derive(Debug, PartialEq, Eq)]
pub struct EnumDescriptor {
    pub name: &'static str,
    pub members: &'static [EnumMember],
}

impl EnumDescriptor {
    /// Look up a member by its textual form.
    ///
    /// A member with a wire name matches only its wire name; other members
    /// match their identifier.
    pub fn lookup(&self, text: &str) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.display_name() == text)
    }

    /// Look up a member by its code identifier only
    pub fn by_name(&self, name: &str) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.name == name)
    }

    /// Look up a member by underlying value
    pub fn by_value(&self, value: i64) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.value == value)
    }

    pub fn value_of(&'static self, member: &EnumMember) -> EnumValue {
        EnumValue {
            descriptor: self,
            value: member.value,
        }
    }
}

/// A value of a registered enum type
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnumValue {
    pub descriptor: &'static EnumDescriptor,
    pub value: i64,
}

impl EnumValue {
    pub fn member(&self) -> Option<&'static EnumMember> {
        self.descriptor.members.iter().find(|m| m.value == self.value)
    }
}

/// Effective kind of a field, with nullable wrappers already removed
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Bool,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal,
    String,
    Guid,
    DateTime,
    DateTimeOffset,
    Enum(&'static EnumDescriptor),
    List,
    Object,
    Unknown,
}

impl FieldKind {
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldKind::Int16
                | FieldKind::Int32
                | FieldKind::Int64
                | FieldKind::Float32
                | FieldKind::Float64
                | FieldKind::Decimal
        )
    }

    /// The narrowest numeric kind holding both `self` and `other`.
    ///
    /// Integers widen to floats, floats to decimal. Non-numeric kinds are
    /// left as they are.
    pub fn widen(self, other: FieldKind) -> FieldKind {
        fn rank(kind: FieldKind) -> u8 {
            match kind {
                FieldKind::Int16 => 0,
                FieldKind::Int32 => 1,
                FieldKind::Int64 => 2,
                FieldKind::Float32 => 3,
                FieldKind::Float64 => 4,
                _ => 5,
            }
        }
        if !self.is_numeric() || !other.is_numeric() {
            return self;
        }
        let (low, high) = if rank(self) <= rank(other) {
            (self, other)
        } else {
            (other, self)
        };
        // f32 cannot hold every 32/64-bit integer
        if high == FieldKind::Float32 && matches!(low, FieldKind::Int32 | FieldKind::Int64) {
            return FieldKind::Float64;
        }
        high
    }

    pub fn is_date(&self) -> bool {
        matches!(self, FieldKind::DateTime | FieldKind::DateTimeOffset)
    }

    pub fn enum_descriptor(&self) -> Option<&'static EnumDescriptor> {
        match self {
            FieldKind::Enum(descriptor) => Some(descriptor),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            FieldKind::Bool => "Boolean",
            FieldKind::Int16 => "Int16",
            FieldKind::Int32 => "Int32",
            FieldKind::Int64 => "Int64",
            FieldKind::Float32 => "Single",
            FieldKind::Float64 => "Double",
            FieldKind::Decimal => "Decimal",
            FieldKind::String => "String",
            FieldKind::Guid => "Guid",
            FieldKind::DateTime => "DateTime",
            FieldKind::DateTimeOffset => "DateTimeOffset",
            FieldKind::Enum(descriptor) => descriptor.name,
            FieldKind::List => "List",
            FieldKind::Object => "Object",
            FieldKind::Unknown => "Unknown",
        }
    }
}

/// Declared or sampled type of a field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TypeInfo {
    pub kind: FieldKind,
    pub nullable: bool,
}

impl TypeInfo {
    pub const fn of(kind: FieldKind) -> Self {
        Self {
            kind,
            nullable: false,
        }
    }

    pub const fn unknown() -> Self {
        Self {
            kind: FieldKind::Unknown,
            nullable: true,
        }
    }

    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    /// Runtime type of a concrete value; `None` for null
    pub fn of_value(value: &Value) -> Option<Self> {
        value.kind().map(Self::of)
    }
}

/// A dynamically typed field value
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Float32(f32),
    Float64(f64),
    Decimal(Decimal),
    String(String),
    Guid(Uuid),
    DateTime(NaiveDateTime),
    DateTimeOffset(DateTime<FixedOffset>),
    Enum(EnumValue),
    List(Vec<Value>),
    Object(BTreeMap<String, Value>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Runtime kind; `None` for null
    pub fn kind(&self) -> Option<FieldKind> {
        let kind = match self {
            Value::Null => return None,
            Value::Bool(_) => FieldKind::Bool,
            Value::Int16(_) => FieldKind::Int16,
            Value::Int32(_) => FieldKind::Int32,
            Value::Int64(_) => FieldKind::Int64,
            Value::Float32(_) => FieldKind::Float32,
            Value::Float64(_) => FieldKind::Float64,
            Value::Decimal(_) => FieldKind::Decimal,
            Value::String(_) => FieldKind::String,
            Value::Guid(_) => FieldKind::Guid,
            Value::DateTime(_) => FieldKind::DateTime,
            Value::DateTimeOffset(_) => FieldKind::DateTimeOffset,
            Value::Enum(e) => FieldKind::Enum(e.descriptor),
            Value::List(_) => FieldKind::List,
            Value::Object(_) => FieldKind::Object,
        };
        Some(kind)
    }

    /// Short tag identifying the variant, used to build group keys
    pub fn type_tag(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Int16(_) | Value::Int32(_) | Value::Int64(_) => "int",
            Value::Float32(_) | Value::Float64(_) => "float",
            Value::Decimal(_) => "decimal",
            Value::String(_) => "string",
            Value::Guid(_) => "guid",
            Value::DateTime(_) => "datetime",
            Value::DateTimeOffset(_) => "datetimeoffset",
            Value::Enum(_) => "enum",
            Value::List(_) => "list",
            Value::Object(_) => "object",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer kinds only; floats and decimals are not truncated
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int16(v) => Some(i64::from(*v)),
            Value::Int32(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int16(v) => Some(f64::from(*v)),
            Value::Int32(v) => Some(f64::from(*v)),
            Value::Int64(v) => Some(*v as f64),
            Value::Float32(v) => Some(f64::from(*v)),
            Value::Float64(v) => Some(*v),
            Value::Decimal(d) => d.to_f64(),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Value::Int16(v) => Some(Decimal::from(*v)),
            Value::Int32(v) => Some(Decimal::from(*v)),
            Value::Int64(v) => Some(Decimal::from(*v)),
            Value::Float32(v) => Decimal::from_f32(*v),
            Value::Float64(v) => Decimal::from_f64(*v),
            Value::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.kind().is_some_and(|k| k.is_numeric())
    }

    /// Date value as a UTC-comparable instant
    pub fn as_instant(&self) -> Option<NaiveDateTime> {
        match self {
            Value::DateTime(dt) => Some(*dt),
            Value::DateTimeOffset(dt) => Some(dt.naive_utc()),
            _ => None,
        }
    }

    /// Calendar date on the value's own clock
    pub fn date_part(&self) -> Option<NaiveDate> {
        match self {
            Value::DateTime(dt) => Some(dt.date()),
            Value::DateTimeOffset(dt) => Some(dt.date_naive()),
            _ => None,
        }
    }

    /// Whether a date value sits exactly at midnight on its own clock
    pub fn is_midnight(&self) -> bool {
        let time = match self {
            Value::DateTime(dt) => dt.time(),
            Value::DateTimeOffset(dt) => dt.time(),
            _ => return false,
        };
        time.num_seconds_from_midnight() == 0 && time.nanosecond() == 0
    }

    /// Child value addressed by a path segment (object key or list index)
    pub fn get_member(&self, segment: &str) -> Option<&Value> {
        match self {
            Value::Object(map) => map.get(segment),
            Value::List(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }
    }

    /// Natural ordering between two non-null values of compatible kinds.
    ///
    /// Numbers compare across integer, float and decimal kinds; dates compare
    /// as UTC instants; enums compare by underlying value. `None` when the
    /// kinds are not comparable.
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            (Value::Guid(a), Value::Guid(b)) => Some(a.cmp(b)),
            (Value::Enum(a), Value::Enum(b)) => Some(a.value.cmp(&b.value)),
            (Value::Enum(a), b) => b.as_i64().map(|b| a.value.cmp(&b)),
            (a, Value::Enum(b)) => a.as_i64().map(|a| a.cmp(&b.value)),
            (a, b) if a.is_numeric() && b.is_numeric() => compare_numeric(a, b),
            (a, b) => match (a.as_instant(), b.as_instant()) {
                (Some(a), Some(b)) => Some(a.cmp(&b)),
                _ => None,
            },
        }
    }

    /// Equality under the natural ordering; null equals only null
    pub fn loosely_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Null, _) | (_, Value::Null) => false,
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loosely_eq(y))
            }
            (Value::Object(a), Value::Object(b)) => a == b,
            (a, b) => a.compare(b) == Some(Ordering::Equal),
        }
    }

    /// Total order used by sorting: nulls first, then natural ordering, then
    /// variant rank for values that cannot be compared.
    pub fn sort_cmp(&self, other: &Value) -> Ordering {
        match (self.is_null(), other.is_null()) {
            (true, true) => Ordering::Equal,
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            (false, false) => self
                .compare(other)
                .unwrap_or_else(|| self.rank().cmp(&other.rank())),
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Int16(_)
            | Value::Int32(_)
            | Value::Int64(_)
            | Value::Float32(_)
            | Value::Float64(_)
            | Value::Decimal(_)
            | Value::Enum(_) => 2,
            Value::String(_) => 3,
            Value::Guid(_) => 4,
            Value::DateTime(_) | Value::DateTimeOffset(_) => 5,
            Value::List(_) => 6,
            Value::Object(_) => 7,
        }
    }

    /// Canonical `yyyy-MM-ddTHH:mm:ss.fffZ` form of a date value
    pub fn to_canonical_date(&self) -> Option<String> {
        match self {
            Value::DateTime(dt) => Some(dt.format(CANONICAL_DATE_FORMAT).to_string()),
            Value::DateTimeOffset(dt) => Some(dt.naive_utc().format(CANONICAL_DATE_FORMAT).to_string()),
            _ => None,
        }
    }

    /// Convert into a JSON value
    pub fn to_json(&self) -> serde_json::Value {
        match serde_json::to_value(self) {
            Ok(json) => json,
            Err(_) => serde_json::Value::Null,
        }
    }
}

fn compare_numeric(a: &Value, b: &Value) -> Option<Ordering> {
    if let (Some(x), Some(y)) = (a.as_i64(), b.as_i64()) {
        return Some(x.cmp(&y));
    }
    if matches!(a, Value::Decimal(_)) || matches!(b, Value::Decimal(_)) {
        if let (Some(x), Some(y)) = (a.as_decimal(), b.as_decimal()) {
            return Some(x.cmp(&y));
        }
    }
    a.as_f64()?.partial_cmp(&b.as_f64()?)
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
            Value::Decimal(d) => write!(f, "{}", d),
            Value::String(s) => f.write_str(s),
            Value::Guid(g) => write!(f, "{}", g.hyphenated()),
            Value::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%dT%H:%M:%S%.f")),
            Value::DateTimeOffset(dt) => write!(f, "{}", dt.to_rfc3339()),
            Value::Enum(e) => match e.member() {
                Some(member) => f.write_str(member.display_name()),
                None => write!(f, "{}", e.value),
            },
            Value::List(_) | Value::Object(_) => write!(f, "{}", self.to_json()),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int16(v) => serializer.serialize_i16(*v),
            Value::Int32(v) => serializer.serialize_i32(*v),
            Value::Int64(v) => serializer.serialize_i64(*v),
            Value::Float32(v) => serializer.serialize_f32(*v),
            Value::Float64(v) => serializer.serialize_f64(*v),
            Value::Decimal(d) => match d.to_f64() {
                Some(v) => serializer.serialize_f64(v),
                None => serializer.serialize_str(&d.to_string()),
            },
            Value::String(s) => serializer.serialize_str(s),
            Value::Guid(g) => serializer.serialize_str(&g.hyphenated().to_string()),
            Value::DateTime(dt) => {
                serializer.serialize_str(&dt.format("%Y-%m-%dT%H:%M:%S%.3f").to_string())
            }
            Value::DateTimeOffset(dt) => {
                serializer.serialize_str(&dt.naive_utc().format(CANONICAL_DATE_FORMAT).to_string())
            }
            Value::Enum(e) => match e.member() {
                Some(member) => serializer.serialize_str(member.display_name()),
                None => serializer.serialize_i64(e.value),
            },
            Value::List(items) => items.serialize(serializer),
            Value::Object(map) => map.serialize(serializer),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int64(i),
                None => n.as_f64().map_or(Value::Null, Value::Float64),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => {
                Value::Object(map.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&serde_json::Value> for Value {
    fn from(json: &serde_json::Value) -> Self {
        Value::from(json.clone())
    }
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_from! {
    bool => Bool,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    Decimal => Decimal,
    String => String,
    Uuid => Guid,
    NaiveDateTime => DateTime,
    DateTime<FixedOffset> => DateTimeOffset,
    EnumValue => Enum,
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    static STATUS: EnumDescriptor = EnumDescriptor {
        name: "Status",
        members: &[
            EnumMember::new("Open", 0),
            EnumMember::with_wire_name("InProgress", "in-progress", 1),
        ],
    };

    #[test]
    fn test_numeric_comparison_widens() {
        assert_eq!(
            Value::Int32(5).compare(&Value::Float64(5.5)),
            Some(Ordering::Less)
        );
        assert!(Value::Int16(7).loosely_eq(&Value::Int64(7)));
        assert!(Value::Decimal(Decimal::new(25, 1)).loosely_eq(&Value::Float64(2.5)));
        assert_eq!(Value::String("a".into()).compare(&Value::Int32(1)), None);
    }

    #[test]
    fn test_numeric_kinds_widen() {
        assert_eq!(FieldKind::Int64.widen(FieldKind::Float64), FieldKind::Float64);
        assert_eq!(FieldKind::Float64.widen(FieldKind::Int16), FieldKind::Float64);
        assert_eq!(FieldKind::Int16.widen(FieldKind::Int32), FieldKind::Int32);
        assert_eq!(FieldKind::Int64.widen(FieldKind::Float32), FieldKind::Float64);
        assert_eq!(FieldKind::Float64.widen(FieldKind::Decimal), FieldKind::Decimal);
        assert_eq!(FieldKind::String.widen(FieldKind::Float64), FieldKind::String);
    }

    #[test]
    fn test_sort_cmp_nulls_first() {
        let mut values = vec![Value::Int32(3), Value::Null, Value::Int32(1)];
        values.sort_by(|a, b| a.sort_cmp(b));
        assert_eq!(values, vec![Value::Null, Value::Int32(1), Value::Int32(3)]);
    }

    #[test]
    fn test_enum_lookup_prefers_wire_name() {
        assert_eq!(STATUS.lookup("in-progress").map(|m| m.value), Some(1));
        assert!(STATUS.lookup("InProgress").is_none());
        assert_eq!(STATUS.lookup("Open").map(|m| m.value), Some(0));
        assert_eq!(STATUS.by_name("InProgress").map(|m| m.value), Some(1));

        let value = Value::Enum(EnumValue {
            descriptor: &STATUS,
            value: 1,
        });
        assert_eq!(value.to_string(), "in-progress");
        assert_eq!(value.compare(&Value::Int32(1)), Some(Ordering::Equal));
    }

    #[test]
    fn test_dates_compare_as_instants() {
        let offset = DateTime::parse_from_rfc3339("2023-08-23T10:00:00+02:00").unwrap();
        let naive = NaiveDate::from_ymd_opt(2023, 8, 23)
            .unwrap()
            .and_hms_opt(8, 0, 0)
            .unwrap();
        assert!(Value::DateTimeOffset(offset).loosely_eq(&Value::DateTime(naive)));
        assert_eq!(
            Value::DateTimeOffset(offset).to_canonical_date().unwrap(),
            "2023-08-23T08:00:00.000Z"
        );
        assert!(!Value::DateTimeOffset(offset).is_midnight());
    }

    #[test]
    fn test_json_conversion() {
        let value = Value::from(json!({"a": 1, "b": [1.5, null], "c": "x"}));
        assert_eq!(value.get_member("a"), Some(&Value::Int64(1)));
        assert_eq!(
            value.get_member("b").and_then(|b| b.get_member("0")),
            Some(&Value::Float64(1.5))
        );
        assert_eq!(value.to_json(), json!({"a": 1, "b": [1.5, null], "c": "x"}));
    }

    #[test]
    fn test_display() {
        assert_eq!(Value::Float64(11.4).to_string(), "11.4");
        assert_eq!(Value::Float64(5.0).to_string(), "5");
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Bool(true).to_string(), "true");
    }
}
