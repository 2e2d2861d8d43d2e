//! Declarative query descriptions handed to the store.
//!
//! # Responsibility
//! - Describe one select query: equality filter, id set, translation
//!   filter, relations to eager-load, ordering, projection and limit.
//! - Define the paginated result envelope.
//!
//! # Invariants
//! - The filter is a conjunction of equality predicates applied in
//!   insertion order.
//! - A non-empty translation filter matches entities having at least one
//!   translation row satisfying every entry.

use crate::model::record::{FieldMap, Record};
use crate::model::value::Value;
use serde::{Deserialize, Serialize};

/// Sort direction for an ordering clause.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    /// Ascending, the default direction for attribute queries.
    #[default]
    Asc,
    /// Descending, the direction of the newest-first default ordering.
    Desc,
}

impl SortOrder {
    /// Stable lowercase name, also valid as a SQL direction keyword.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

/// One ordering clause.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderBy {
    /// Field to order by; validated against the entity allow-list before
    /// the store sees it.
    pub field: String,
    /// Direction.
    pub direction: SortOrder,
}

/// Declarative description of a select query.
///
/// Built by the repository (or by callers via `Repository::select`) and
/// interpreted by a [`crate::store::Store`] implementation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectQuery {
    /// Equality predicates, ANDed in insertion order. Empty matches all.
    pub filter: FieldMap,
    /// Restricts matches to rows whose id is in the set.
    pub id_set: Option<Vec<Value>>,
    /// Equality predicates over the translation table; an entity matches
    /// when at least one of its translation rows satisfies all entries.
    pub translation_filter: FieldMap,
    /// Relation names to eager-load onto each returned record.
    pub relations: Vec<String>,
    /// Ordering clause, if any.
    pub order: Option<OrderBy>,
    /// Column projection; `None` selects all entity columns.
    pub columns: Option<Vec<String>>,
    /// Row limit.
    pub limit: Option<u32>,
}

impl SelectQuery {
    /// Creates an empty query matching all rows.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style relation attachment.
    pub fn with_relation(mut self, name: impl Into<String>) -> Self {
        self.relations.push(name.into());
        self
    }

    /// Builder-style ordering clause.
    pub fn order_by(mut self, field: impl Into<String>, direction: SortOrder) -> Self {
        self.order = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }

    /// Builder-style row limit.
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// One paginated window over an ordered collection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page {
    /// Window items, at most `per_page` of them.
    pub items: Vec<Record>,
    /// Total number of rows matching the query across all windows.
    pub total: u64,
    /// Requested window size.
    pub per_page: u32,
}

#[cfg(test)]
mod tests {
    use super::{SelectQuery, SortOrder};

    #[test]
    fn sort_order_defaults_to_ascending() {
        assert_eq!(SortOrder::default(), SortOrder::Asc);
        assert_eq!(SortOrder::Asc.as_str(), "asc");
        assert_eq!(SortOrder::Desc.as_str(), "desc");
    }

    #[test]
    fn builders_compose() {
        let query = SelectQuery::new()
            .with_relation("translations")
            .order_by("created_at", SortOrder::Desc)
            .limit(10);
        assert_eq!(query.relations, vec!["translations".to_string()]);
        assert_eq!(query.order.as_ref().map(|order| order.field.as_str()), Some("created_at"));
        assert_eq!(query.limit, Some(10));
        assert!(query.filter.is_empty());
    }
}
