//! Dotted field path resolution
//!
//! Reads and writes values at paths like `Address.ShipCity` or `Items.0.Qty`
//! on any [`Record`]. Reads never fail: a null intermediate stops traversal
//! and reads as null. Writes report success as a boolean.

use super::record::{AccessError, Member, Record, Representation};
use super::value::{TypeInfo, Value};
use std::fmt;
use tracing::{debug, trace};

/// A dot-separated chain of member names
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldPath {
    raw: String,
    segments: Vec<String>,
}

impl FieldPath {
    pub fn parse(path: &str) -> Self {
        let raw = path.trim().to_string();
        let segments = if raw.is_empty() {
            Vec::new()
        } else {
            raw.split('.').map(|s| s.trim().to_string()).collect()
        };
        Self { raw, segments }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// More than one segment
    pub fn is_complex(&self) -> bool {
        self.segments.len() > 1
    }

    pub fn root(&self) -> Option<&str> {
        self.segments.first().map(String::as_str)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for FieldPath {
    fn from(path: &str) -> Self {
        FieldPath::parse(path)
    }
}

/// Outcome of reading a path
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// The leaf was reached; the value may itself be null
    Value(Value),
    /// Traversal stopped at a null intermediate segment
    IntermediateNull,
    /// A static record has no member with this name
    Missing,
}

impl Resolved {
    /// The read value; null unless the leaf was reached
    pub fn into_value(self) -> Value {
        match self {
            Resolved::Value(value) => value,
            Resolved::IntermediateNull | Resolved::Missing => Value::Null,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Resolved::Missing)
    }
}

/// The record (or owned value tree) holding a path's last segment
pub(crate) enum Parent<'a> {
    Record(&'a dyn Record),
    Owned(Value),
    IntermediateNull,
    Missing,
}

pub struct PathResolver;

impl PathResolver {
    /// Read the value at `path`; null for anything that does not resolve
    pub fn get(record: &dyn Record, path: &str) -> Value {
        Self::resolve(record, &FieldPath::parse(path)).into_value()
    }

    /// Read the value at `path`, reporting why a read stopped short
    pub fn resolve(record: &dyn Record, path: &FieldPath) -> Resolved {
        let Some(last) = path.segments().last() else {
            return Resolved::Value(Value::Null);
        };

        match Self::parent(record, path) {
            Parent::Record(parent) => match Self::lookup(parent, last) {
                Some(member) => Resolved::Value(member.into_value()),
                None if parent.representation() == Representation::Static => Resolved::Missing,
                None => Resolved::Value(Value::Null),
            },
            Parent::Owned(value) => {
                Resolved::Value(value.get_member(last).cloned().unwrap_or(Value::Null))
            }
            Parent::IntermediateNull => Resolved::IntermediateNull,
            Parent::Missing => Resolved::Missing,
        }
    }

    /// Walk every segment but the last
    pub(crate) fn parent<'a>(record: &'a dyn Record, path: &FieldPath) -> Parent<'a> {
        let segments = path.segments();
        let parents = &segments[..segments.len().saturating_sub(1)];
        let mut current = Parent::Record(record);

        for segment in parents {
            current = match current {
                Parent::Record(r) => match Self::lookup(r, segment) {
                    Some(Member::Record(child)) => Parent::Record(child),
                    Some(Member::Value(Value::Null)) => Parent::IntermediateNull,
                    Some(Member::Value(value @ (Value::Object(_) | Value::List(_)))) => {
                        Parent::Owned(value)
                    }
                    Some(Member::Value(_)) | None
                        if r.representation() == Representation::Static =>
                    {
                        Parent::Missing
                    }
                    Some(Member::Value(_)) | None => Parent::IntermediateNull,
                },
                Parent::Owned(value) => match value.get_member(segment) {
                    Some(child @ (Value::Object(_) | Value::List(_))) => Parent::Owned(child.clone()),
                    _ => Parent::IntermediateNull,
                },
                done => return done,
            };
            if matches!(current, Parent::IntermediateNull | Parent::Missing) {
                trace!(path = %path, segment = %segment, "path traversal stopped early");
                return current;
            }
        }
        current
    }

    /// Read one member, falling back to a case-insensitive name match on
    /// static records
    pub(crate) fn lookup<'a>(record: &'a dyn Record, segment: &str) -> Option<Member<'a>> {
        record.member(segment).or_else(|| {
            let name = Self::case_insensitive_name(record, segment)?;
            record.member(&name)
        })
    }

    /// Declared type of a member on a static record
    pub(crate) fn member_type(record: &dyn Record, segment: &str) -> Option<TypeInfo> {
        record.member_type(segment).or_else(|| {
            let name = Self::case_insensitive_name(record, segment)?;
            record.member_type(&name)
        })
    }

    fn case_insensitive_name(record: &dyn Record, segment: &str) -> Option<String> {
        if record.representation() != Representation::Static {
            return None;
        }
        record
            .member_names()
            .into_iter()
            .find(|name| name.eq_ignore_ascii_case(segment))
    }

    /// Write `value` at `path`, materializing null intermediates on static
    /// records; false when any step refuses
    pub fn set(record: &mut dyn Record, path: &str, value: impl Into<Value>) -> bool {
        let path = FieldPath::parse(path);
        if path.is_empty() {
            return false;
        }
        match Self::try_set(record, &path, value.into()) {
            Ok(()) => true,
            Err(err) => {
                debug!(path = %path, code = err.code(), error = %err, "path assignment failed");
                false
            }
        }
    }

    fn try_set(record: &mut dyn Record, path: &FieldPath, value: Value) -> Result<(), AccessError> {
        let Some((last, parents)) = path.segments().split_last() else {
            return Err(AccessError::NoSuchMember(path.to_string()));
        };

        let mut current: &mut dyn Record = record;
        for segment in parents {
            let name = Self::writable_name(current, segment)?;
            if current.member_mut(&name).is_none() {
                current.materialize_member(&name)?;
            }
            current = current
                .member_mut(&name)
                .ok_or_else(|| AccessError::NotAContainer(name.clone()))?;
        }

        let name = Self::writable_name(current, last)?;
        current.set_member(&name, value)
    }

    fn writable_name(record: &dyn Record, segment: &str) -> Result<String, AccessError> {
        if record.representation() != Representation::Static || record.member(segment).is_some() {
            return Ok(segment.to_string());
        }
        Self::case_insensitive_name(record, segment)
            .ok_or_else(|| AccessError::NoSuchMember(segment.to_string()))
    }
}
