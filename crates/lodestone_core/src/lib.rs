//! Store-agnostic repository layer with capability-aware translation
//! loading.
//!
//! A [`Repository`] turns uniform find/list/paginate/write/query calls
//! into declarative [`SelectQuery`] values executed by a [`Store`]. For
//! entities declaring the translation capability, the translation relation
//! is attached automatically on every capability-aware read path.

pub mod db;
pub mod logging;
pub mod model;
pub mod query;
pub mod repo;
pub mod store;

pub use db::{open_store, open_store_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::entity::{EntityDef, RelationDef, TranslationDef};
pub use model::record::{FieldMap, Record};
pub use model::value::Value;
pub use query::{OrderBy, Page, SelectQuery, SortOrder};
pub use repo::base_repo::{RepoError, RepoResult, Repository, DEFAULT_PAGE_SIZE};
pub use store::sqlite::SqliteStore;
pub use store::{Store, StoreError, StoreResult};
