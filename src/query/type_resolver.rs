//! Field type inference
//!
//! Static records declare member types; map-like and dynamic records do not,
//! so their field types are sampled from the data: the first record with a
//! non-null value at the path decides. Numbers are the exception. JSON
//! writers emit `32` for `32.0`, so a numeric field takes the widest kind
//! seen across every sampled record.

use super::path::{FieldPath, Parent, PathResolver};
use super::record::{Record, Representation};
use super::value::{EnumDescriptor, FieldKind, TypeInfo};
use std::cell::RefCell;
use std::collections::HashMap;
use tracing::trace;

/// What one record says about a field's type
enum Sample {
    Declared(TypeInfo),
    Sampled(TypeInfo),
    Null,
    Missing,
}

/// Resolves and memoizes field types for one record set
///
/// A resolver is scoped to a single pipeline invocation; its cache assumes
/// every record it is asked about comes from the same collection.
#[derive(Debug, Default)]
pub struct TypeResolver {
    sample_limit: Option<usize>,
    cache: RefCell<HashMap<String, Option<TypeInfo>>>,
}

impl TypeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the number of records sampled per field
    pub fn with_sample_limit(sample_limit: Option<usize>) -> Self {
        Self {
            sample_limit,
            cache: RefCell::default(),
        }
    }

    /// Effective type of the field at `path` across `records`.
    ///
    /// `None` means the path names no member on a static shape. A field with
    /// only null values resolves to [`TypeInfo::unknown`].
    pub fn resolve_field_type<R: Record>(&self, records: &[R], path: &FieldPath) -> Option<TypeInfo> {
        if let Some(cached) = self.cache.borrow().get(path.as_str()) {
            return *cached;
        }
        let resolved = self.resolve_uncached(records, path);
        trace!(path = %path, resolved = ?resolved.map(|t| t.kind.name()), "resolved field type");
        self.cache.borrow_mut().insert(path.as_str().to_string(), resolved);
        resolved
    }

    fn resolve_uncached<R: Record>(&self, records: &[R], path: &FieldPath) -> Option<TypeInfo> {
        if path.is_empty() {
            return None;
        }
        let limit = self.sample_limit.unwrap_or(usize::MAX);
        let mut numeric: Option<FieldKind> = None;
        for record in records.iter().take(limit) {
            match Self::observe(record, path) {
                Sample::Declared(info) => return Some(info),
                Sample::Missing if numeric.is_none() => return None,
                Sample::Sampled(info) if info.kind.is_numeric() => {
                    numeric = Some(numeric.map_or(info.kind, |seen| seen.widen(info.kind)));
                }
                Sample::Sampled(info) if numeric.is_none() => return Some(info.nullable()),
                Sample::Sampled(_) | Sample::Null | Sample::Missing => continue,
            }
        }
        Some(numeric.map_or(TypeInfo::unknown(), |kind| TypeInfo::of(kind).nullable()))
    }

    fn observe(record: &dyn Record, path: &FieldPath) -> Sample {
        let Some(last) = path.segments().last() else {
            return Sample::Missing;
        };
        match PathResolver::parent(record, path) {
            Parent::Record(parent) => {
                if parent.representation() == Representation::Static {
                    if let Some(declared) = PathResolver::member_type(parent, last) {
                        return Sample::Declared(declared);
                    }
                }
                match PathResolver::lookup(parent, last) {
                    Some(member) => Self::sample(member.into_value()),
                    None if parent.representation() == Representation::Static => Sample::Missing,
                    None => Sample::Null,
                }
            }
            Parent::Owned(value) => Self::sample(value.get_member(last).cloned().unwrap_or_default()),
            Parent::IntermediateNull => Sample::Null,
            Parent::Missing => Sample::Missing,
        }
    }

    fn sample(value: super::value::Value) -> Sample {
        match TypeInfo::of_value(&value) {
            Some(info) => Sample::Sampled(info),
            None => Sample::Null,
        }
    }

    /// The enum type behind a resolved field, nullable or not
    pub fn resolve_enum_underlying_type(info: &TypeInfo) -> Option<&'static EnumDescriptor> {
        info.kind.enum_descriptor()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_samples_until_non_null() {
        let rows = vec![
            json!({"Freight": null}),
            json!({"Other": 1}),
            json!({"Freight": 32.38}),
        ];
        let resolver = TypeResolver::new();
        let info = resolver
            .resolve_field_type(&rows, &FieldPath::parse("Freight"))
            .unwrap();
        assert_eq!(info.kind, FieldKind::Float64);
        assert!(info.nullable);
    }

    #[test]
    fn test_numeric_fields_take_widest_kind() {
        let rows = vec![
            json!({"Freight": 32, "Qty": 1}),
            json!({"Freight": 10.5, "Qty": null}),
            json!({"Freight": 0.25, "Qty": 4}),
        ];
        let resolver = TypeResolver::new();
        let freight = resolver.resolve_field_type(&rows, &FieldPath::parse("Freight")).unwrap();
        assert_eq!(freight.kind, FieldKind::Float64);
        assert!(freight.nullable);
        let qty = resolver.resolve_field_type(&rows, &FieldPath::parse("Qty")).unwrap();
        assert_eq!(qty.kind, FieldKind::Int64);
    }

    #[test]
    fn test_all_null_falls_back_to_unknown() {
        let rows = vec![json!({"A": null}), json!({"A": {"B": null}})];
        let resolver = TypeResolver::new();
        assert_eq!(
            resolver.resolve_field_type(&rows, &FieldPath::parse("A.B")),
            Some(TypeInfo::unknown())
        );
    }

    #[test]
    fn test_sample_limit() {
        let rows = vec![json!({"A": null}), json!({"A": "x"})];
        let resolver = TypeResolver::with_sample_limit(Some(1));
        assert_eq!(
            resolver.resolve_field_type(&rows, &FieldPath::parse("A")),
            Some(TypeInfo::unknown())
        );
    }

    #[test]
    fn test_results_are_memoized() {
        let resolver = TypeResolver::new();
        let path = FieldPath::parse("A");
        let first = resolver.resolve_field_type(&[json!({"A": 1})], &path);
        let second = resolver.resolve_field_type(&[json!({"A": "x"})], &path);
        assert_eq!(first, second);
        assert_eq!(first.map(|t| t.kind), Some(FieldKind::Int64));
    }
}
