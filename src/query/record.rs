//! Record representations
//!
//! The engine never knows the shape of the records it shapes. Every record
//! is reached through the [`Record`] trait, which covers three
//! representations:
//!
//! - **Static**: a declared struct whose members are known at compile time.
//!   Implemented by hand per shape, usually with [`FieldValue`] doing the
//!   per-member conversions.
//! - **Map**: key-value rows (`serde_json::Value`, `BTreeMap<String, Value>`,
//!   `HashMap<String, Value>`). Missing keys read as null.
//! - **Dynamic**: late-bound objects that answer get/set-member requests by
//!   name at runtime, adapted through [`Dynamic`].

use super::coercion::{coerce, CoercionError};
use super::value::{EnumDescriptor, EnumValue, FieldKind, TypeInfo, Value};
use crate::error::ErrorCode;
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Which of the three record representations a record uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Representation {
    Static,
    Map,
    Dynamic,
}

/// A member read from a record: either a plain value or a nested record
pub enum Member<'a> {
    Value(Value),
    Record(&'a dyn Record),
}

impl<'a> Member<'a> {
    /// Member for an optional nested static record
    pub fn nested<R: Record>(record: Option<&'a R>) -> Self {
        match record {
            Some(record) => Member::Record(record),
            None => Member::Value(Value::Null),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Member::Value(Value::Null))
    }

    pub fn into_value(self) -> Value {
        match self {
            Member::Value(value) => value,
            Member::Record(record) => record.to_value(),
        }
    }
}

/// Failure of a write through a record
#[derive(Debug, Error)]
pub enum AccessError {
    #[error("no member named '{0}'")]
    NoSuchMember(String),

    #[error("member '{0}' is read-only")]
    ReadOnly(String),

    #[error("member '{member}' rejects the value: {source}")]
    TypeMismatch {
        member: String,
        #[source]
        source: CoercionError,
    },

    #[error("member '{0}' cannot be materialized")]
    NotMaterializable(String),

    #[error("value at '{0}' is not a container")]
    NotAContainer(String),
}

impl AccessError {
    pub fn code(&self) -> u16 {
        match self {
            AccessError::NoSuchMember(_) => ErrorCode::ACCESS_NO_SUCH_MEMBER,
            AccessError::ReadOnly(_) => ErrorCode::ACCESS_READ_ONLY,
            AccessError::TypeMismatch { .. } => ErrorCode::ACCESS_TYPE_MISMATCH,
            AccessError::NotMaterializable(_) | AccessError::NotAContainer(_) => {
                ErrorCode::ACCESS_GENERIC
            }
        }
    }
}

/// Uniform accessor over the three record representations
pub trait Record {
    fn representation(&self) -> Representation;

    /// Read a member by exact name; `None` when the record has no such member
    fn member(&self, name: &str) -> Option<Member<'_>>;

    /// Declared type of a member, for static shapes
    fn member_type(&self, _name: &str) -> Option<TypeInfo> {
        None
    }

    fn member_names(&self) -> Vec<String>;

    /// Assign a scalar value to a member
    fn set_member(&mut self, name: &str, value: Value) -> Result<(), AccessError>;

    /// Mutable access to a nested record member, when one is present
    fn member_mut(&mut self, _name: &str) -> Option<&mut dyn Record> {
        None
    }

    /// Construct a default nested record at a null or absent member
    fn materialize_member(&mut self, name: &str) -> Result<(), AccessError> {
        Err(AccessError::NotMaterializable(name.to_string()))
    }

    /// Snapshot of the whole record as a value tree
    fn to_value(&self) -> Value {
        Value::Object(
            self.member_names()
                .into_iter()
                .map(|name| {
                    let value = self.member(&name).map_or(Value::Null, Member::into_value);
                    (name, value)
                })
                .collect(),
        )
    }
}

/// Conversion between a statically typed member and [`Value`]
pub trait FieldValue: Sized {
    fn type_info() -> TypeInfo;

    fn to_value(&self) -> Value;

    fn from_value(value: Value) -> Result<Self, CoercionError>;
}

macro_rules! scalar_field_value {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl FieldValue for $ty {
                fn type_info() -> TypeInfo {
                    TypeInfo::of(FieldKind::$kind)
                }

                fn to_value(&self) -> Value {
                    Value::$kind(self.clone())
                }

                fn from_value(value: Value) -> Result<Self, CoercionError> {
                    match coerce(&value, &Self::type_info())? {
                        Value::$kind(v) => Ok(v),
                        Value::Null => Err(CoercionError::NullNotAllowed {
                            target: FieldKind::$kind.name(),
                        }),
                        other => Err(CoercionError::Unsupported {
                            input: other.to_string(),
                            target: FieldKind::$kind.name(),
                        }),
                    }
                }
            }
        )*
    };
}

scalar_field_value! {
    bool => Bool,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    rust_decimal::Decimal => Decimal,
    String => String,
    uuid::Uuid => Guid,
    chrono::NaiveDateTime => DateTime,
    chrono::DateTime<chrono::FixedOffset> => DateTimeOffset,
}

impl<T: FieldValue> FieldValue for Option<T> {
    fn type_info() -> TypeInfo {
        T::type_info().nullable()
    }

    fn to_value(&self) -> Value {
        self.as_ref().map_or(Value::Null, FieldValue::to_value)
    }

    fn from_value(value: Value) -> Result<Self, CoercionError> {
        match coerce(&value, &Self::type_info())? {
            Value::Null => Ok(None),
            coerced => T::from_value(coerced).map(Some),
        }
    }
}

/// Underlying value of an enum member given as a value of any accepted form
pub fn enum_from_value(descriptor: &'static EnumDescriptor, value: Value) -> Result<i64, CoercionError> {
    match coerce(&value, &TypeInfo::of(FieldKind::Enum(descriptor)))? {
        Value::Enum(e) => Ok(e.value),
        _ => Err(CoercionError::NullNotAllowed {
            target: descriptor.name,
        }),
    }
}

/// Value of an enum member given its underlying value
pub fn enum_to_value(descriptor: &'static EnumDescriptor, value: i64) -> Value {
    Value::Enum(EnumValue { descriptor, value })
}

/// Assign a value to a statically typed member slot
pub fn assign<T: FieldValue>(slot: &mut T, member: &str, value: Value) -> Result<(), AccessError> {
    *slot = T::from_value(value).map_err(|source| AccessError::TypeMismatch {
        member: member.to_string(),
        source,
    })?;
    Ok(())
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Object(_) | Value::List(_))
}

fn value_member(child: &Value) -> Member<'_> {
    if is_container(child) {
        Member::Record(child)
    } else {
        Member::Value(child.clone())
    }
}

impl Record for Value {
    fn representation(&self) -> Representation {
        Representation::Map
    }

    fn member(&self, name: &str) -> Option<Member<'_>> {
        self.get_member(name).map(value_member)
    }

    fn member_names(&self) -> Vec<String> {
        match self {
            Value::Object(map) => map.keys().cloned().collect(),
            Value::List(items) => (0..items.len()).map(|i| i.to_string()).collect(),
            _ => Vec::new(),
        }
    }

    fn set_member(&mut self, name: &str, value: Value) -> Result<(), AccessError> {
        match self {
            Value::Object(map) => {
                map.insert(name.to_string(), value);
                Ok(())
            }
            Value::List(items) => {
                let slot = name
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get_mut(i))
                    .ok_or_else(|| AccessError::NoSuchMember(name.to_string()))?;
                *slot = value;
                Ok(())
            }
            _ => Err(AccessError::NotAContainer(name.to_string())),
        }
    }

    fn member_mut(&mut self, name: &str) -> Option<&mut dyn Record> {
        let child = match self {
            Value::Object(map) => map.get_mut(name)?,
            Value::List(items) => items.get_mut(name.parse::<usize>().ok()?)?,
            _ => return None,
        };
        if is_container(child) {
            Some(child as &mut dyn Record)
        } else {
            None
        }
    }

    fn materialize_member(&mut self, name: &str) -> Result<(), AccessError> {
        match self {
            Value::Object(map) => match map.get(name) {
                None | Some(Value::Null) => {
                    map.insert(name.to_string(), Value::Object(BTreeMap::new()));
                    Ok(())
                }
                Some(_) => Err(AccessError::NotAContainer(name.to_string())),
            },
            _ => Err(AccessError::NotMaterializable(name.to_string())),
        }
    }

    fn to_value(&self) -> Value {
        self.clone()
    }
}

macro_rules! map_record {
    ($($map:ident),*) => {
        $(
            impl Record for $map<String, Value> {
                fn representation(&self) -> Representation {
                    Representation::Map
                }

                fn member(&self, name: &str) -> Option<Member<'_>> {
                    self.get(name).map(value_member)
                }

                fn member_names(&self) -> Vec<String> {
                    self.keys().cloned().collect()
                }

                fn set_member(&mut self, name: &str, value: Value) -> Result<(), AccessError> {
                    self.insert(name.to_string(), value);
                    Ok(())
                }

                fn member_mut(&mut self, name: &str) -> Option<&mut dyn Record> {
                    match self.get_mut(name) {
                        Some(child) if is_container(child) => Some(child as &mut dyn Record),
                        _ => None,
                    }
                }

                fn materialize_member(&mut self, name: &str) -> Result<(), AccessError> {
                    match self.get(name) {
                        None | Some(Value::Null) => {
                            self.insert(name.to_string(), Value::Object(BTreeMap::new()));
                            Ok(())
                        }
                        Some(_) => Err(AccessError::NotAContainer(name.to_string())),
                    }
                }
            }
        )*
    };
}

map_record!(BTreeMap, HashMap);

fn json_member(child: &serde_json::Value) -> Member<'_> {
    match child {
        serde_json::Value::Object(_) | serde_json::Value::Array(_) => Member::Record(child),
        scalar => Member::Value(Value::from(scalar)),
    }
}

impl Record for serde_json::Value {
    fn representation(&self) -> Representation {
        Representation::Map
    }

    fn member(&self, name: &str) -> Option<Member<'_>> {
        let child = match self {
            serde_json::Value::Object(map) => map.get(name)?,
            serde_json::Value::Array(items) => items.get(name.parse::<usize>().ok()?)?,
            _ => return None,
        };
        Some(json_member(child))
    }

    fn member_names(&self) -> Vec<String> {
        match self {
            serde_json::Value::Object(map) => map.keys().cloned().collect(),
            serde_json::Value::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
            _ => Vec::new(),
        }
    }

    fn set_member(&mut self, name: &str, value: Value) -> Result<(), AccessError> {
        match self {
            serde_json::Value::Object(map) => {
                map.insert(name.to_string(), value.to_json());
                Ok(())
            }
            serde_json::Value::Array(items) => {
                let slot = name
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| items.get_mut(i))
                    .ok_or_else(|| AccessError::NoSuchMember(name.to_string()))?;
                *slot = value.to_json();
                Ok(())
            }
            _ => Err(AccessError::NotAContainer(name.to_string())),
        }
    }

    fn member_mut(&mut self, name: &str) -> Option<&mut dyn Record> {
        let child = match self {
            serde_json::Value::Object(map) => map.get_mut(name)?,
            serde_json::Value::Array(items) => items.get_mut(name.parse::<usize>().ok()?)?,
            _ => return None,
        };
        if child.is_object() || child.is_array() {
            Some(child as &mut dyn Record)
        } else {
            None
        }
    }

    fn materialize_member(&mut self, name: &str) -> Result<(), AccessError> {
        match self {
            serde_json::Value::Object(map) => match map.get(name) {
                None | Some(serde_json::Value::Null) => {
                    map.insert(
                        name.to_string(),
                        serde_json::Value::Object(serde_json::Map::new()),
                    );
                    Ok(())
                }
                Some(_) => Err(AccessError::NotAContainer(name.to_string())),
            },
            _ => Err(AccessError::NotMaterializable(name.to_string())),
        }
    }

    fn to_value(&self) -> Value {
        Value::from(self)
    }
}

impl<T: Record> Record for Vec<T> {
    fn representation(&self) -> Representation {
        Representation::Static
    }

    fn member(&self, name: &str) -> Option<Member<'_>> {
        let item = self.get(name.parse::<usize>().ok()?)?;
        Some(Member::Record(item))
    }

    fn member_names(&self) -> Vec<String> {
        (0..self.len()).map(|i| i.to_string()).collect()
    }

    fn set_member(&mut self, name: &str, _value: Value) -> Result<(), AccessError> {
        Err(AccessError::ReadOnly(name.to_string()))
    }

    fn member_mut(&mut self, name: &str) -> Option<&mut dyn Record> {
        let item = self.get_mut(name.parse::<usize>().ok()?)?;
        Some(item as &mut dyn Record)
    }

    fn to_value(&self) -> Value {
        Value::List(self.iter().map(Record::to_value).collect())
    }
}

/// Late-bound member protocol: members are discovered by asking the object
pub trait DynamicObject {
    fn dyn_get(&self, name: &str) -> Option<Value>;

    /// Returns false when the object refuses the assignment
    fn dyn_set(&mut self, name: &str, value: Value) -> bool;

    fn dyn_member_names(&self) -> Vec<String>;
}

/// Adapter exposing a [`DynamicObject`] as a [`Record`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dynamic<T>(pub T);

impl<T: DynamicObject> Record for Dynamic<T> {
    fn representation(&self) -> Representation {
        Representation::Dynamic
    }

    fn member(&self, name: &str) -> Option<Member<'_>> {
        self.0.dyn_get(name).map(Member::Value)
    }

    fn member_names(&self) -> Vec<String> {
        self.0.dyn_member_names()
    }

    fn set_member(&mut self, name: &str, value: Value) -> Result<(), AccessError> {
        if self.0.dyn_set(name, value) {
            Ok(())
        } else {
            Err(AccessError::ReadOnly(name.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Default)]
    struct Bag {
        values: BTreeMap<String, Value>,
    }

    impl DynamicObject for Bag {
        fn dyn_get(&self, name: &str) -> Option<Value> {
            self.values.get(name).cloned()
        }

        fn dyn_set(&mut self, name: &str, value: Value) -> bool {
            if name.starts_with('_') {
                return false;
            }
            self.values.insert(name.to_string(), value);
            true
        }

        fn dyn_member_names(&self) -> Vec<String> {
            self.values.keys().cloned().collect()
        }
    }

    #[test]
    fn test_json_record_members() {
        let row = json!({"OrderID": 1001, "Address": {"ShipCity": "Berlin"}, "Tags": ["a", "b"]});
        assert_eq!(row.representation(), Representation::Map);
        assert!(matches!(row.member("OrderID"), Some(Member::Value(Value::Int64(1001)))));
        assert!(matches!(row.member("Address"), Some(Member::Record(_))));
        assert!(row.member("Missing").is_none());
        assert_eq!(
            row.member("Tags").map(Member::into_value),
            Some(Value::List(vec![Value::from("a"), Value::from("b")]))
        );
    }

    #[test]
    fn test_json_materialize_only_fills_gaps() {
        let mut row = json!({"a": 5, "b": null});
        assert!(row.materialize_member("b").is_ok());
        assert_eq!(row["b"], json!({}));
        assert!(row.materialize_member("a").is_err());
        assert_eq!(row["a"], json!(5));
    }

    #[test]
    fn test_dynamic_record() {
        let mut record = Dynamic(Bag::default());
        assert!(record.set_member("Name", Value::from("x")).is_ok());
        assert!(record.set_member("_hidden", Value::from("x")).is_err());
        assert_eq!(record.representation(), Representation::Dynamic);
        assert_eq!(record.member("Name").map(Member::into_value), Some(Value::from("x")));
        assert!(record.materialize_member("Nested").is_err());
    }

    #[test]
    fn test_field_value_conversions() {
        let mut slot = 0i32;
        assert!(assign(&mut slot, "OrderID", Value::from("42")).is_ok());
        assert_eq!(slot, 42);
        assert!(assign(&mut slot, "OrderID", Value::from("abc")).is_err());
        assert_eq!(slot, 42);

        let mut optional: Option<uuid::Uuid> = None;
        assert!(assign(&mut optional, "Id", Value::from("")).is_ok());
        assert!(optional.is_none());
        assert!(assign(&mut optional, "Id", Value::from("not-a-guid")).is_err());

        assert_eq!(Option::<f64>::type_info(), TypeInfo::of(FieldKind::Float64).nullable());
        assert!(String::from_value(Value::Null).is_err());
    }

    #[test]
    fn test_vec_record_indexes() {
        let rows = vec![json!({"x": 1}), json!({"x": 2})];
        assert_eq!(rows.representation(), Representation::Static);
        assert!(matches!(rows.member("1"), Some(Member::Record(_))));
        assert!(rows.member("2").is_none());
        assert!(rows.member("x").is_none());
    }
}
