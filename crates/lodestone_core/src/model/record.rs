//! Field maps and fetched records.
//!
//! # Responsibility
//! - Define the ordered field-to-value mapping used for attribute filters
//!   and write payloads.
//! - Define the record shape returned by queries, including eagerly
//!   attached related rows.
//!
//! # Invariants
//! - `FieldMap` preserves insertion order; re-setting a field updates the
//!   value in place without moving the field.
//! - A relation attached with zero rows is distinguishable from a relation
//!   that was never attached.

use crate::model::value::Value;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;

/// Ordered mapping from field name to value.
///
/// Used as the attribute filter (a conjunction of equality predicates,
/// applied in insertion order) and as the payload for create/update/bulk
/// insert operations.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FieldMap {
    entries: Vec<(String, Value)>,
}

impl FieldMap {
    /// Creates an empty map. As a filter it matches every row.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, consuming and returning the map.
    pub fn set(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Inserts a field, replacing the value in place when the field is
    /// already present.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        let field = field.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(name, _)| *name == field) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((field, value)),
        }
    }

    /// Returns the value for a field, if present.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == field)
            .map(|(_, value)| value)
    }

    /// Returns whether the field is present.
    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    /// Iterates field names in insertion order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<F: Into<String>, V: Into<Value>> FromIterator<(F, V)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (F, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        for (field, value) in iter {
            map.insert(field, value);
        }
        map
    }
}

impl Serialize for FieldMap {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (field, value) in &self.entries {
            map.serialize_entry(field, value)?;
        }
        map.end()
    }
}

/// One fetched entity: its fields plus any eagerly attached related rows.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    fields: FieldMap,
    related: BTreeMap<String, Vec<FieldMap>>,
}

impl Record {
    /// Creates a record from its field values, with no relations attached.
    pub fn new(fields: FieldMap) -> Self {
        Self {
            fields,
            related: BTreeMap::new(),
        }
    }

    /// Returns the value of a field, if selected.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns the record's field map.
    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    /// Attaches the rows of a named relation, replacing any previous
    /// attachment under the same name.
    pub fn attach(&mut self, relation: impl Into<String>, rows: Vec<FieldMap>) {
        self.related.insert(relation.into(), rows);
    }

    /// Returns the attached rows for a relation, or an empty slice when
    /// the relation was never attached.
    pub fn related(&self, relation: &str) -> &[FieldMap] {
        self.related
            .get(relation)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    /// Returns whether the relation was attached, even with zero rows.
    pub fn has_related(&self, relation: &str) -> bool {
        self.related.contains_key(relation)
    }
}
