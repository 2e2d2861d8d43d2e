//! Store contract consumed by the repository layer.
//!
//! # Responsibility
//! - Define the minimal query-builder capability a storage engine must
//!   expose: declarative select/count, create/update/delete, bulk insert
//!   and a key-to-value projection.
//! - Keep query *shaping* out of implementations; a store only binds and
//!   executes what a [`SelectQuery`] describes.
//!
//! # Invariants
//! - Field and relation names inside a `SelectQuery` have already been
//!   validated by the repository against the entity definition; a store
//!   is responsible for safe value binding, never for name sanitizing.
//! - Store failures carry their original diagnostic context; this layer
//!   adds none and swallows none.

use crate::db::DbError;
use crate::model::entity::EntityDef;
use crate::model::record::{FieldMap, Record};
use crate::model::value::Value;
use crate::query::SelectQuery;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod sqlite;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure raised by a store implementation.
#[derive(Debug)]
pub enum StoreError {
    /// Connection or statement failure from the underlying engine.
    Db(DbError),
    /// Persisted or supplied data cannot be executed as described.
    InvalidData(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid store data: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage engine capability the repository delegates to.
///
/// Every method is one logical round-trip; eager loading of requested
/// relations happens inside the fetch methods so callers never follow up
/// per row.
pub trait Store {
    /// Fetches the first record matching the query, with requested
    /// relations attached.
    fn fetch_first(&self, def: &EntityDef, query: &SelectQuery) -> StoreResult<Option<Record>>;

    /// Fetches every record matching the query, with requested relations
    /// attached.
    fn fetch_all(&self, def: &EntityDef, query: &SelectQuery) -> StoreResult<Vec<Record>>;

    /// Counts records matching the query's predicates, ignoring ordering,
    /// projection and limit.
    fn count(&self, def: &EntityDef, query: &SelectQuery) -> StoreResult<u64>;

    /// Inserts one row and returns the created record as re-read from the
    /// store.
    fn insert_one(&self, def: &EntityDef, row: &FieldMap) -> StoreResult<Record>;

    /// Inserts multiple rows in a single batched statement. Rows share one
    /// column set; the repository validates this before calling.
    fn insert_many(&self, def: &EntityDef, rows: &[FieldMap]) -> StoreResult<()>;

    /// Applies a partial update to the row with the given id and returns
    /// the updated record, or `None` when no such row exists.
    fn update_by_id(
        &self,
        def: &EntityDef,
        id: &Value,
        changes: &FieldMap,
    ) -> StoreResult<Option<Record>>;

    /// Deletes the rows with the given ids in one statement, returning the
    /// number of rows removed.
    fn delete_by_ids(&self, def: &EntityDef, ids: &[Value]) -> StoreResult<usize>;

    /// Returns `(key, value)` pairs projected from two columns, in store
    /// order.
    fn pluck(
        &self,
        def: &EntityDef,
        value_field: &str,
        key_field: &str,
    ) -> StoreResult<Vec<(Value, Value)>>;
}
