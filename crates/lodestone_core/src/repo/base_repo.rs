//! Generic repository over one entity definition.
//!
//! # Responsibility
//! - Expose the uniform find/list/paginate/write/query operation set.
//! - Attach the translation relation automatically for localized entities
//!   on every capability-aware read path.
//!
//! # Invariants
//! - The capability attach is uniform across `find`, `all`, `paginate`,
//!   `find_by_slug`, `find_by_attributes`, `get_by_attributes`,
//!   `get_by_attributes_with_columns`, `find_by_many` and
//!   `all_translated_in`; the `*_with` operations bypass it because the
//!   caller controls the relation set completely.
//! - Listings order by creation time descending unless the caller names
//!   another field or requests no ordering.
//! - Argument errors are raised before the store is touched.

use crate::model::entity::EntityDef;
use crate::model::record::{FieldMap, Record};
use crate::model::value::Value;
use crate::query::{OrderBy, Page, SelectQuery, SortOrder};
use crate::store::{Store, StoreError};
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Window size used by [`Repository::paginate`] when none is given.
pub const DEFAULT_PAGE_SIZE: u32 = 15;

pub type RepoResult<T> = Result<T, RepoError>;

/// Errors raised by repository operations.
///
/// Absence of a record is not an error: single-record lookups return
/// `Ok(None)`.
#[derive(Debug)]
pub enum RepoError {
    /// Page size must be at least one.
    InvalidPageSize(u32),
    /// Bulk delete was called with no ids.
    EmptyIdSet,
    /// Field name is not declared by the entity definition.
    UnknownField {
        entity: &'static str,
        field: String,
    },
    /// Relation name is not declared by the entity definition.
    UnknownRelation {
        entity: &'static str,
        relation: String,
    },
    /// Operation requires the translation capability.
    NotTranslatable { entity: &'static str },
    /// Entity declares neither an own slug field nor a translated slug.
    NoSlugSource { entity: &'static str },
    /// Record passed to a mutation has no identifier value.
    MissingId { entity: &'static str },
    /// Mutation target no longer exists.
    NotFound { entity: &'static str, id: Value },
    /// Bulk insert rows do not share one column set.
    MixedInsertShape,
    /// Underlying store failure, passed through unchanged.
    Store(StoreError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPageSize(size) => {
                write!(f, "page size must be at least 1, got {size}")
            }
            Self::EmptyIdSet => write!(f, "bulk delete requires at least one id"),
            Self::UnknownField { entity, field } => {
                write!(f, "entity `{entity}` declares no field `{field}`")
            }
            Self::UnknownRelation { entity, relation } => {
                write!(f, "entity `{entity}` declares no relation `{relation}`")
            }
            Self::NotTranslatable { entity } => {
                write!(f, "entity `{entity}` has no translation capability")
            }
            Self::NoSlugSource { entity } => {
                write!(f, "entity `{entity}` has no slug field to match against")
            }
            Self::MissingId { entity } => {
                write!(f, "`{entity}` record carries no identifier value")
            }
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::MixedInsertShape => {
                write!(f, "bulk insert rows must share one column set")
            }
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// Generic repository over one entity definition.
///
/// Stateless beyond the store handle and the definition; every operation
/// builds a fresh query.
pub struct Repository<'a, S: Store> {
    store: &'a S,
    def: &'static EntityDef,
}

impl<'a, S: Store> Repository<'a, S> {
    /// Creates a repository for the given entity definition.
    pub fn new(store: &'a S, def: &'static EntityDef) -> Self {
        Self { store, def }
    }

    /// Returns the entity definition backing this repository.
    pub fn definition(&self) -> &'static EntityDef {
        self.def
    }

    /// Returns an empty query shaped by the capability rule: for localized
    /// entities the translation relation is already attached.
    pub fn select(&self) -> SelectQuery {
        let mut query = SelectQuery::new();
        if let Some(translation) = self.def.translation() {
            query.relations.push(translation.relation.name.to_string());
        }
        query
    }

    /// Fetches one entity by id, with translations attached when the
    /// entity is localized.
    pub fn find(&self, id: impl Into<Value>) -> RepoResult<Option<Record>> {
        let mut query = self.select();
        query.filter.insert(self.def.id_field, id.into());
        Ok(self.store.fetch_first(self.def, &query)?)
    }

    /// Lists every entity, newest first.
    pub fn all(&self) -> RepoResult<Vec<Record>> {
        let mut query = self.select();
        query.order = Some(self.created_desc());
        Ok(self.store.fetch_all(self.def, &query)?)
    }

    /// Returns the first window of a newest-first listing together with
    /// the total count.
    ///
    /// # Errors
    /// - [`RepoError::InvalidPageSize`] when `per_page` is zero.
    pub fn paginate(&self, per_page: Option<u32>) -> RepoResult<Page> {
        let per_page = per_page.unwrap_or(DEFAULT_PAGE_SIZE);
        if per_page == 0 {
            return Err(RepoError::InvalidPageSize(per_page));
        }
        let mut query = self.select();
        query.order = Some(self.created_desc());
        let total = self.store.count(self.def, &query)?;
        query.limit = Some(per_page);
        let items = self.store.fetch_all(self.def, &query)?;
        Ok(Page {
            items,
            total,
            per_page,
        })
    }

    /// Creates one entity from a field map and returns it as stored.
    /// Value validation is the store's responsibility.
    pub fn create(&self, fields: FieldMap) -> RepoResult<Record> {
        self.ensure_fields(&fields)?;
        Ok(self.store.insert_one(self.def, &fields)?)
    }

    /// Applies a partial update to an existing entity: only the supplied
    /// fields change. An empty change set reads the row back unchanged.
    pub fn update(&self, record: &Record, changes: FieldMap) -> RepoResult<Record> {
        self.ensure_fields(&changes)?;
        let id = self.record_id(record)?;
        if changes.is_empty() {
            let mut query = SelectQuery::new();
            query.filter.insert(self.def.id_field, id.clone());
            return self
                .store
                .fetch_first(self.def, &query)?
                .ok_or(RepoError::NotFound {
                    entity: self.def.name,
                    id,
                });
        }
        self.store
            .update_by_id(self.def, &id, &changes)?
            .ok_or(RepoError::NotFound {
                entity: self.def.name,
                id,
            })
    }

    /// Deletes one entity. Returns `false` when the row was already gone;
    /// deleting twice is not an error at this layer.
    pub fn destroy(&self, record: &Record) -> RepoResult<bool> {
        let id = self.record_id(record)?;
        Ok(self.store.delete_by_ids(self.def, &[id])? > 0)
    }

    /// Deletes one entity by id, returning the number of rows removed.
    pub fn delete_by_id(&self, id: impl Into<Value>) -> RepoResult<usize> {
        Ok(self.store.delete_by_ids(self.def, &[id.into()])?)
    }

    /// Deletes a set of entities in one store round-trip.
    ///
    /// # Errors
    /// - [`RepoError::EmptyIdSet`] when `ids` is empty.
    pub fn delete_all(&self, ids: &[Value]) -> RepoResult<usize> {
        if ids.is_empty() {
            return Err(RepoError::EmptyIdSet);
        }
        Ok(self.store.delete_by_ids(self.def, ids)?)
    }

    /// Lists entities having at least one translation in the locale,
    /// newest first, translations attached.
    pub fn all_translated_in(&self, locale: &str) -> RepoResult<Vec<Record>> {
        let translation = self.def.translation().ok_or(RepoError::NotTranslatable {
            entity: self.def.name,
        })?;
        let mut query = self.select();
        query.translation_filter.insert(translation.locale_field, locale);
        query.order = Some(self.created_desc());
        Ok(self.store.fetch_all(self.def, &query)?)
    }

    /// Fetches one entity by slug. Localized entities match through their
    /// translations' slug; others match their own slug field, exactly and
    /// case-sensitively.
    pub fn find_by_slug(&self, slug: &str) -> RepoResult<Option<Record>> {
        if let Some(translation) = self.def.translation() {
            if let Some(slug_field) = translation.slug_field {
                let mut query = self.select();
                query.translation_filter.insert(slug_field, slug);
                return Ok(self.store.fetch_first(self.def, &query)?);
            }
        }
        if let Some(slug_field) = self.def.slug_field {
            let mut query = self.select();
            query.filter.insert(slug_field, slug);
            return Ok(self.store.fetch_first(self.def, &query)?);
        }
        Err(RepoError::NoSlugSource {
            entity: self.def.name,
        })
    }

    /// Fetches the first entity matching every filter entry.
    pub fn find_by_attributes(&self, filter: &FieldMap) -> RepoResult<Option<Record>> {
        self.ensure_fields(filter)?;
        let mut query = self.select();
        query.filter = filter.clone();
        Ok(self.store.fetch_first(self.def, &query)?)
    }

    /// Lists entities matching every filter entry, optionally ordered.
    pub fn get_by_attributes(
        &self,
        filter: &FieldMap,
        order_by: Option<&str>,
        direction: SortOrder,
    ) -> RepoResult<Vec<Record>> {
        self.ensure_fields(filter)?;
        let mut query = self.select();
        query.filter = filter.clone();
        if let Some(field) = order_by {
            query.order = Some(self.order(field, direction)?);
        }
        Ok(self.store.fetch_all(self.def, &query)?)
    }

    /// Like [`Repository::get_by_attributes`] but selecting only the named
    /// columns. Projection affects neither the filter nor the ordering.
    pub fn get_by_attributes_with_columns(
        &self,
        filter: &FieldMap,
        columns: Option<&[&str]>,
        order_by: Option<&str>,
        direction: SortOrder,
    ) -> RepoResult<Vec<Record>> {
        self.ensure_fields(filter)?;
        let mut query = self.select();
        query.filter = filter.clone();
        query.columns = self.projection(columns)?;
        if let Some(field) = order_by {
            query.order = Some(self.order(field, direction)?);
        }
        Ok(self.store.fetch_all(self.def, &query)?)
    }

    /// Fetches the entities whose id is in the set. An empty set matches
    /// nothing without a store round-trip.
    pub fn find_by_many(&self, ids: &[Value]) -> RepoResult<Vec<Record>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut query = self.select();
        query.id_set = Some(ids.to_vec());
        Ok(self.store.fetch_all(self.def, &query)?)
    }

    /// Lists every entity with an explicit relation set and ordering. The
    /// capability attach is bypassed: the caller controls relations fully.
    pub fn all_with(
        &self,
        relations: &[&str],
        direction: SortOrder,
        sort_field: &str,
    ) -> RepoResult<Vec<Record>> {
        self.ensure_relations(relations)?;
        let mut query = SelectQuery::new();
        query.relations = relations.iter().map(|name| name.to_string()).collect();
        query.order = Some(self.order(sort_field, direction)?);
        Ok(self.store.fetch_all(self.def, &query)?)
    }

    /// Lists every entity selecting only the named columns, optionally
    /// ordered. No relations are attached.
    pub fn all_with_columns(
        &self,
        columns: &[&str],
        order_by: Option<&str>,
        direction: SortOrder,
    ) -> RepoResult<Vec<Record>> {
        let mut query = SelectQuery::new();
        query.columns = self.projection(Some(columns))?;
        if let Some(field) = order_by {
            query.order = Some(self.order(field, direction)?);
        }
        Ok(self.store.fetch_all(self.def, &query)?)
    }

    /// Fetches one entity by id with an explicit relation set.
    pub fn find_with(
        &self,
        id: impl Into<Value>,
        relations: &[&str],
    ) -> RepoResult<Option<Record>> {
        self.ensure_relations(relations)?;
        let mut query = SelectQuery::new();
        query.filter.insert(self.def.id_field, id.into());
        query.relations = relations.iter().map(|name| name.to_string()).collect();
        Ok(self.store.fetch_first(self.def, &query)?)
    }

    /// Lists entities matching the filter, with an explicit relation set
    /// and ordering.
    pub fn find_many_by_with(
        &self,
        filter: &FieldMap,
        relations: &[&str],
        order_by: &str,
        direction: SortOrder,
    ) -> RepoResult<Vec<Record>> {
        self.ensure_fields(filter)?;
        self.ensure_relations(relations)?;
        let mut query = SelectQuery::new();
        query.filter = filter.clone();
        query.relations = relations.iter().map(|name| name.to_string()).collect();
        query.order = Some(self.order(order_by, direction)?);
        Ok(self.store.fetch_all(self.def, &query)?)
    }

    /// Lists entities matching the filter, descending on the given field
    /// when one is named. No relations are attached.
    pub fn find_many_by_attributes(
        &self,
        filter: &FieldMap,
        order_by: Option<&str>,
    ) -> RepoResult<Vec<Record>> {
        self.ensure_fields(filter)?;
        let mut query = SelectQuery::new();
        query.filter = filter.clone();
        if let Some(field) = order_by {
            query.order = Some(self.order(field, SortOrder::Desc)?);
        }
        Ok(self.store.fetch_all(self.def, &query)?)
    }

    /// Fetches the first entity matching the filter, with an explicit
    /// relation set.
    pub fn find_by_attributes_with(
        &self,
        filter: &FieldMap,
        relations: &[&str],
        order_by: Option<&str>,
        direction: SortOrder,
    ) -> RepoResult<Option<Record>> {
        self.ensure_fields(filter)?;
        self.ensure_relations(relations)?;
        let mut query = SelectQuery::new();
        query.filter = filter.clone();
        query.relations = relations.iter().map(|name| name.to_string()).collect();
        if let Some(field) = order_by {
            query.order = Some(self.order(field, direction)?);
        }
        Ok(self.store.fetch_first(self.def, &query)?)
    }

    /// Lists entities matching the filter, with an explicit relation set.
    pub fn get_by_attributes_with(
        &self,
        filter: &FieldMap,
        relations: &[&str],
        order_by: Option<&str>,
        direction: SortOrder,
    ) -> RepoResult<Vec<Record>> {
        self.ensure_fields(filter)?;
        self.ensure_relations(relations)?;
        let mut query = SelectQuery::new();
        query.filter = filter.clone();
        query.relations = relations.iter().map(|name| name.to_string()).collect();
        if let Some(field) = order_by {
            query.order = Some(self.order(field, direction)?);
        }
        Ok(self.store.fetch_all(self.def, &query)?)
    }

    /// Fetches the first entity matching the filter, selecting only the
    /// named columns.
    pub fn find_by_attributes_with_columns(
        &self,
        filter: &FieldMap,
        columns: &[&str],
        order_by: Option<&str>,
        direction: SortOrder,
    ) -> RepoResult<Option<Record>> {
        self.ensure_fields(filter)?;
        let mut query = SelectQuery::new();
        query.filter = filter.clone();
        query.columns = self.projection(Some(columns))?;
        if let Some(field) = order_by {
            query.order = Some(self.order(field, direction)?);
        }
        Ok(self.store.fetch_first(self.def, &query)?)
    }

    /// Inserts multiple rows in a single store round-trip. No per-record
    /// identifiers are returned. An empty slice is a no-op success.
    ///
    /// # Errors
    /// - [`RepoError::MixedInsertShape`] when rows differ in column set.
    pub fn insert(&self, rows: &[FieldMap]) -> RepoResult<bool> {
        if rows.is_empty() {
            return Ok(true);
        }
        let shape: BTreeSet<&str> = rows[0].fields().collect();
        for row in rows {
            self.ensure_fields(row)?;
            let row_shape: BTreeSet<&str> = row.fields().collect();
            if row_shape != shape {
                return Err(RepoError::MixedInsertShape);
            }
        }
        self.store.insert_many(self.def, rows)?;
        Ok(true)
    }

    /// Returns `(id value, name value)` pairs for populating selection
    /// lists.
    pub fn get_name_value(
        &self,
        name_field: &str,
        id_field: &str,
    ) -> RepoResult<Vec<(Value, Value)>> {
        self.ensure_field(name_field)?;
        self.ensure_field(id_field)?;
        Ok(self.store.pluck(self.def, name_field, id_field)?)
    }

    /// No-op hook reserved for a caching decorator. Always succeeds.
    pub fn clear_cache(&self) -> bool {
        true
    }

    fn created_desc(&self) -> OrderBy {
        OrderBy {
            field: self.def.created_at_field.to_string(),
            direction: SortOrder::Desc,
        }
    }

    fn order(&self, field: &str, direction: SortOrder) -> RepoResult<OrderBy> {
        self.ensure_field(field)?;
        Ok(OrderBy {
            field: field.to_string(),
            direction,
        })
    }

    fn ensure_field(&self, field: &str) -> RepoResult<()> {
        if self.def.has_field(field) {
            Ok(())
        } else {
            Err(RepoError::UnknownField {
                entity: self.def.name,
                field: field.to_string(),
            })
        }
    }

    fn ensure_fields(&self, fields: &FieldMap) -> RepoResult<()> {
        for field in fields.fields() {
            self.ensure_field(field)?;
        }
        Ok(())
    }

    fn ensure_relations(&self, relations: &[&str]) -> RepoResult<()> {
        for name in relations {
            if self.def.relation(name).is_none() {
                return Err(RepoError::UnknownRelation {
                    entity: self.def.name,
                    relation: (*name).to_string(),
                });
            }
        }
        Ok(())
    }

    fn projection(&self, columns: Option<&[&str]>) -> RepoResult<Option<Vec<String>>> {
        match columns {
            None => Ok(None),
            Some(names) => {
                let mut list = Vec::with_capacity(names.len());
                for name in names {
                    self.ensure_field(name)?;
                    list.push((*name).to_string());
                }
                Ok(Some(list))
            }
        }
    }

    fn record_id(&self, record: &Record) -> RepoResult<Value> {
        match record.get(self.def.id_field) {
            Some(id) if !id.is_null() => Ok(id.clone()),
            _ => Err(RepoError::MissingId {
                entity: self.def.name,
            }),
        }
    }
}
