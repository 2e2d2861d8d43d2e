//! Observes the queries the repository hands its store, using a recording
//! double instead of SQLite.

mod common;

use common::{ARTICLE, PROJECT};
use lodestone_core::{
    EntityDef, FieldMap, Record, Repository, SelectQuery, SortOrder, Store, StoreResult, Value,
};
use std::cell::RefCell;

#[derive(Default)]
struct RecordingStore {
    queries: RefCell<Vec<SelectQuery>>,
    mutations: RefCell<usize>,
}

impl RecordingStore {
    fn new() -> Self {
        Self::default()
    }

    fn recorded(&self) -> Vec<SelectQuery> {
        self.queries.borrow().clone()
    }

    fn translation_requests(&self) -> usize {
        self.queries
            .borrow()
            .iter()
            .filter(|query| query.relations.iter().any(|name| name == "translations"))
            .count()
    }
}

impl Store for RecordingStore {
    fn fetch_first(&self, _def: &EntityDef, query: &SelectQuery) -> StoreResult<Option<Record>> {
        self.queries.borrow_mut().push(query.clone());
        Ok(None)
    }

    fn fetch_all(&self, _def: &EntityDef, query: &SelectQuery) -> StoreResult<Vec<Record>> {
        self.queries.borrow_mut().push(query.clone());
        Ok(Vec::new())
    }

    fn count(&self, _def: &EntityDef, query: &SelectQuery) -> StoreResult<u64> {
        self.queries.borrow_mut().push(query.clone());
        Ok(0)
    }

    fn insert_one(&self, _def: &EntityDef, row: &FieldMap) -> StoreResult<Record> {
        *self.mutations.borrow_mut() += 1;
        Ok(Record::new(row.clone()))
    }

    fn insert_many(&self, _def: &EntityDef, _rows: &[FieldMap]) -> StoreResult<()> {
        *self.mutations.borrow_mut() += 1;
        Ok(())
    }

    fn update_by_id(
        &self,
        _def: &EntityDef,
        _id: &Value,
        _changes: &FieldMap,
    ) -> StoreResult<Option<Record>> {
        *self.mutations.borrow_mut() += 1;
        Ok(None)
    }

    fn delete_by_ids(&self, _def: &EntityDef, _ids: &[Value]) -> StoreResult<usize> {
        *self.mutations.borrow_mut() += 1;
        Ok(0)
    }

    fn pluck(
        &self,
        _def: &EntityDef,
        _value_field: &str,
        _key_field: &str,
    ) -> StoreResult<Vec<(Value, Value)>> {
        Ok(Vec::new())
    }
}

#[test]
fn capability_ops_request_translations_for_localized_entities() {
    let store = RecordingStore::new();
    let repo = Repository::new(&store, &ARTICLE);

    repo.find(1).expect("find");
    repo.all().expect("all");
    repo.paginate(Some(5)).expect("paginate");
    repo.find_by_attributes(&FieldMap::new().set("status", "published"))
        .expect("find by attributes");
    repo.find_by_many(&[Value::Integer(1)]).expect("find by many");
    repo.find_by_slug("hello").expect("find by slug");
    repo.all_translated_in("en").expect("all translated in");

    // Every recorded query carries the translation relation, including
    // both halves of paginate (count + window).
    let recorded = store.recorded();
    assert_eq!(recorded.len(), 8);
    assert_eq!(store.translation_requests(), recorded.len());
}

#[test]
fn no_translation_attach_happens_for_plain_entities() {
    let store = RecordingStore::new();
    let repo = Repository::new(&store, &PROJECT);

    repo.find(1).expect("find");
    repo.all().expect("all");
    repo.paginate(Some(5)).expect("paginate");
    repo.find_by_attributes(&FieldMap::new().set("status", "active"))
        .expect("find by attributes");
    repo.find_by_slug("hello").expect("find by slug");

    assert!(!store.recorded().is_empty());
    assert_eq!(store.translation_requests(), 0);
}

#[test]
fn filter_insertion_order_reaches_the_store_intact() {
    let store = RecordingStore::new();
    let repo = Repository::new(&store, &ARTICLE);

    repo.find_by_attributes(
        &FieldMap::new()
            .set("status", "published")
            .set("author_id", 7)
            .set("created_at", 0),
    )
    .expect("find by attributes");

    let recorded = store.recorded();
    let fields: Vec<String> = recorded[0]
        .filter
        .fields()
        .map(|field| field.to_string())
        .collect();
    assert_eq!(fields, vec!["status", "author_id", "created_at"]);
}

#[test]
fn default_ordering_is_creation_time_descending() {
    let store = RecordingStore::new();
    let repo = Repository::new(&store, &ARTICLE);

    repo.all().expect("all");
    let recorded = store.recorded();
    let order = recorded[0].order.as_ref().expect("default ordering");
    assert_eq!(order.field, "created_at");
    assert_eq!(order.direction, SortOrder::Desc);

    // Attribute queries stay unordered unless a field is named.
    let store = RecordingStore::new();
    let repo = Repository::new(&store, &ARTICLE);
    repo.get_by_attributes(&FieldMap::new(), None, SortOrder::Asc)
        .expect("unordered query");
    assert!(store.recorded()[0].order.is_none());
}

#[test]
fn argument_errors_never_reach_the_store() {
    let store = RecordingStore::new();
    let repo = Repository::new(&store, &ARTICLE);

    repo.paginate(Some(0)).expect_err("zero page size");
    repo.delete_all(&[]).expect_err("empty id set");
    repo.find_by_attributes(&FieldMap::new().set("nope", 1))
        .expect_err("unknown field");
    repo.all_with(&["nope"], SortOrder::Asc, "created_at")
        .expect_err("unknown relation");
    repo.create(FieldMap::new().set("nope", 1))
        .expect_err("unknown create field");
    repo.insert(&[
        FieldMap::new().set("status", "a"),
        FieldMap::new().set("author_id", 1),
    ])
    .expect_err("mixed insert shapes");

    assert!(store.recorded().is_empty());
    assert_eq!(*store.mutations.borrow(), 0);
}
