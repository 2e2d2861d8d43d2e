//! SQLite implementation of the store contract.
//!
//! # Responsibility
//! - Compose parameterized SQL from declarative select queries.
//! - Bind values safely and map rows back into records.
//! - Hydrate eagerly requested relations with one batched query each.
//!
//! # Invariants
//! - Every identifier interpolated into SQL comes from an entity
//!   definition or has been allow-list validated by the repository;
//!   caller-supplied values only ever travel as bind parameters.
//! - Explicit orderings get an id-ascending tiebreak so repeated queries
//!   return rows in a deterministic sequence.

use crate::db::{open_store, open_store_in_memory, DbResult};
use crate::model::entity::{EntityDef, RelationDef};
use crate::model::record::{FieldMap, Record};
use crate::model::value::Value;
use crate::query::{SelectQuery, SortOrder};
use crate::store::{Store, StoreError, StoreResult};
use log::debug;
use rusqlite::types::Value as SqlValue;
use rusqlite::{params_from_iter, Connection};
use std::path::Path;

/// SQLite-backed store.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Wraps an already configured connection.
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Opens a file-backed store with repository pragmas applied.
    pub fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        Ok(Self::new(open_store(path)?))
    }

    /// Opens an in-memory store with repository pragmas applied.
    pub fn open_in_memory() -> DbResult<Self> {
        Ok(Self::new(open_store_in_memory()?))
    }

    /// Borrows the underlying connection, e.g. for schema setup.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    fn run_select(&self, def: &EntityDef, query: &SelectQuery) -> StoreResult<Vec<Record>> {
        let (sql, binds) = select_sql(def, query)?;
        let mut stmt = self.conn.prepare(&sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();

        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let mut fields = FieldMap::new();
            for (index, column) in columns.iter().enumerate() {
                let value: SqlValue = row.get(index)?;
                fields.insert(column.as_str(), from_sql_value(value));
            }
            records.push(Record::new(fields));
        }
        drop(rows);

        self.attach_relations(def, query, &mut records)?;
        debug!(
            "event=store_select module=store table={} rows={}",
            def.table,
            records.len()
        );
        Ok(records)
    }

    fn attach_relations(
        &self,
        def: &EntityDef,
        query: &SelectQuery,
        records: &mut [Record],
    ) -> StoreResult<()> {
        if query.relations.is_empty() || records.is_empty() {
            return Ok(());
        }

        let mut ids = Vec::with_capacity(records.len());
        for record in records.iter() {
            let id = record.get(def.id_field).ok_or_else(|| {
                StoreError::InvalidData(format!(
                    "rows selected from `{}` are missing id column `{}`",
                    def.table, def.id_field
                ))
            })?;
            ids.push(id.clone());
        }

        for name in &query.relations {
            let relation = def.relation(name).ok_or_else(|| {
                StoreError::InvalidData(format!(
                    "entity `{}` declares no relation named `{name}`",
                    def.name
                ))
            })?;
            let rows = self.fetch_relation_rows(&relation, &ids)?;
            for record in records.iter_mut() {
                let key = record
                    .get(def.id_field)
                    .cloned()
                    .unwrap_or(Value::Null);
                let matching: Vec<FieldMap> = rows
                    .iter()
                    .filter(|(foreign, _)| *foreign == key)
                    .map(|(_, fields)| fields.clone())
                    .collect();
                record.attach(relation.name, matching);
            }
        }
        Ok(())
    }

    fn fetch_relation_rows(
        &self,
        relation: &RelationDef,
        ids: &[Value],
    ) -> StoreResult<Vec<(Value, FieldMap)>> {
        let placeholders = placeholders(ids.len());
        let sql = format!(
            "SELECT * FROM {} WHERE {} IN ({}) ORDER BY {} ASC",
            relation.table, relation.foreign_key, placeholders, relation.foreign_key
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let columns: Vec<String> = stmt
            .column_names()
            .into_iter()
            .map(|name| name.to_string())
            .collect();

        let binds: Vec<SqlValue> = ids.iter().map(to_sql_value).collect();
        let mut rows = stmt.query(params_from_iter(binds))?;
        let mut related = Vec::new();
        while let Some(row) = rows.next()? {
            let mut fields = FieldMap::new();
            for (index, column) in columns.iter().enumerate() {
                let value: SqlValue = row.get(index)?;
                fields.insert(column.as_str(), from_sql_value(value));
            }
            let foreign = fields
                .get(relation.foreign_key)
                .cloned()
                .ok_or_else(|| {
                    StoreError::InvalidData(format!(
                        "relation table `{}` has no column `{}`",
                        relation.table, relation.foreign_key
                    ))
                })?;
            related.push((foreign, fields));
        }
        Ok(related)
    }

    fn fetch_row_by_id(&self, def: &EntityDef, id: &Value) -> StoreResult<Option<Record>> {
        let mut query = SelectQuery::new();
        query.filter.insert(def.id_field, id.clone());
        query.limit = Some(1);
        Ok(self.run_select(def, &query)?.into_iter().next())
    }
}

impl Store for SqliteStore {
    fn fetch_first(&self, def: &EntityDef, query: &SelectQuery) -> StoreResult<Option<Record>> {
        let mut limited = query.clone();
        limited.limit = Some(1);
        Ok(self.run_select(def, &limited)?.into_iter().next())
    }

    fn fetch_all(&self, def: &EntityDef, query: &SelectQuery) -> StoreResult<Vec<Record>> {
        self.run_select(def, query)
    }

    fn count(&self, def: &EntityDef, query: &SelectQuery) -> StoreResult<u64> {
        let (sql, binds) = count_sql(def, query)?;
        let total = self
            .conn
            .query_row(&sql, params_from_iter(binds), |row| row.get::<_, u64>(0))?;
        Ok(total)
    }

    fn insert_one(&self, def: &EntityDef, row: &FieldMap) -> StoreResult<Record> {
        if row.is_empty() {
            self.conn
                .execute(&format!("INSERT INTO {} DEFAULT VALUES", def.table), [])?;
        } else {
            let columns: Vec<&str> = row.fields().collect();
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                def.table,
                columns.join(", "),
                placeholders(columns.len())
            );
            let binds: Vec<SqlValue> = row.iter().map(|(_, value)| to_sql_value(value)).collect();
            self.conn.execute(&sql, params_from_iter(binds))?;
        }

        let id = match row.get(def.id_field) {
            Some(id) => id.clone(),
            None => Value::Integer(self.conn.last_insert_rowid()),
        };
        debug!(
            "event=store_insert module=store table={} id={id}",
            def.table
        );
        self.fetch_row_by_id(def, &id)?.ok_or_else(|| {
            StoreError::InvalidData(format!(
                "created `{}` row not found on read-back (id {id})",
                def.table
            ))
        })
    }

    fn insert_many(&self, def: &EntityDef, rows: &[FieldMap]) -> StoreResult<()> {
        if rows.is_empty() {
            return Ok(());
        }
        let columns: Vec<&str> = rows[0].fields().collect();
        let row_placeholders = format!("({})", placeholders(columns.len()));
        let all_placeholders = vec![row_placeholders; rows.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES {}",
            def.table,
            columns.join(", "),
            all_placeholders
        );

        let mut binds: Vec<SqlValue> = Vec::with_capacity(rows.len() * columns.len());
        for row in rows {
            for column in &columns {
                let value = row.get(column).ok_or_else(|| {
                    StoreError::InvalidData(format!(
                        "bulk insert row is missing column `{column}`"
                    ))
                })?;
                binds.push(to_sql_value(value));
            }
        }
        self.conn.execute(&sql, params_from_iter(binds))?;
        debug!(
            "event=store_insert module=store table={} rows={}",
            def.table,
            rows.len()
        );
        Ok(())
    }

    fn update_by_id(
        &self,
        def: &EntityDef,
        id: &Value,
        changes: &FieldMap,
    ) -> StoreResult<Option<Record>> {
        if changes.is_empty() {
            return Err(StoreError::InvalidData(
                "update requires at least one change".to_string(),
            ));
        }
        let assignments: Vec<String> = changes
            .fields()
            .map(|field| format!("{field} = ?"))
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE {} = ?",
            def.table,
            assignments.join(", "),
            def.id_field
        );
        let mut binds: Vec<SqlValue> =
            changes.iter().map(|(_, value)| to_sql_value(value)).collect();
        binds.push(to_sql_value(id));

        let changed = self.conn.execute(&sql, params_from_iter(binds))?;
        if changed == 0 {
            return Ok(None);
        }
        self.fetch_row_by_id(def, id)
    }

    fn delete_by_ids(&self, def: &EntityDef, ids: &[Value]) -> StoreResult<usize> {
        if ids.is_empty() {
            return Ok(0);
        }
        let sql = format!(
            "DELETE FROM {} WHERE {} IN ({})",
            def.table,
            def.id_field,
            placeholders(ids.len())
        );
        let binds: Vec<SqlValue> = ids.iter().map(to_sql_value).collect();
        let deleted = self.conn.execute(&sql, params_from_iter(binds))?;
        debug!(
            "event=store_delete module=store table={} rows={deleted}",
            def.table
        );
        Ok(deleted)
    }

    fn pluck(
        &self,
        def: &EntityDef,
        value_field: &str,
        key_field: &str,
    ) -> StoreResult<Vec<(Value, Value)>> {
        let sql = format!("SELECT {key_field}, {value_field} FROM {}", def.table);
        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query([])?;
        let mut pairs = Vec::new();
        while let Some(row) = rows.next()? {
            let key: SqlValue = row.get(0)?;
            let value: SqlValue = row.get(1)?;
            pairs.push((from_sql_value(key), from_sql_value(value)));
        }
        Ok(pairs)
    }
}

fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(inner) => SqlValue::Integer(*inner),
        Value::Real(inner) => SqlValue::Real(*inner),
        Value::Text(inner) => SqlValue::Text(inner.clone()),
        Value::Blob(inner) => SqlValue::Blob(inner.clone()),
    }
}

fn from_sql_value(value: SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::Null,
        SqlValue::Integer(inner) => Value::Integer(inner),
        SqlValue::Real(inner) => Value::Real(inner),
        SqlValue::Text(inner) => Value::Text(inner),
        SqlValue::Blob(inner) => Value::Blob(inner),
    }
}

fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

fn select_columns(def: &EntityDef, query: &SelectQuery) -> String {
    match &query.columns {
        None => "*".to_string(),
        Some(columns) => {
            let mut list: Vec<&str> = columns.iter().map(String::as_str).collect();
            // Relation hydration matches on the id; keep it selected even
            // when the caller's projection omits it.
            if !query.relations.is_empty() && !list.contains(&def.id_field) {
                list.push(def.id_field);
            }
            list.join(", ")
        }
    }
}

fn push_predicates(
    def: &EntityDef,
    query: &SelectQuery,
    sql: &mut String,
    binds: &mut Vec<SqlValue>,
) -> StoreResult<()> {
    sql.push_str(" WHERE 1 = 1");

    for (field, value) in query.filter.iter() {
        if value.is_null() {
            sql.push_str(&format!(" AND {field} IS NULL"));
        } else {
            sql.push_str(&format!(" AND {field} = ?"));
            binds.push(to_sql_value(value));
        }
    }

    if let Some(ids) = &query.id_set {
        if ids.is_empty() {
            sql.push_str(" AND 1 = 0");
        } else {
            sql.push_str(&format!(
                " AND {} IN ({})",
                def.id_field,
                placeholders(ids.len())
            ));
            binds.extend(ids.iter().map(to_sql_value));
        }
    }

    if !query.translation_filter.is_empty() {
        let translation = def.translation().ok_or_else(|| {
            StoreError::InvalidData(format!(
                "entity `{}` has no translation relation to filter on",
                def.name
            ))
        })?;
        let table = translation.relation.table;
        sql.push_str(&format!(
            " AND EXISTS (SELECT 1 FROM {table} WHERE {table}.{} = {}.{}",
            translation.relation.foreign_key, def.table, def.id_field
        ));
        for (field, value) in query.translation_filter.iter() {
            if value.is_null() {
                sql.push_str(&format!(" AND {table}.{field} IS NULL"));
            } else {
                sql.push_str(&format!(" AND {table}.{field} = ?"));
                binds.push(to_sql_value(value));
            }
        }
        sql.push(')');
    }

    Ok(())
}

fn push_order(def: &EntityDef, query: &SelectQuery, sql: &mut String) {
    if let Some(order) = &query.order {
        let direction = match order.direction {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        sql.push_str(&format!(" ORDER BY {} {direction}", order.field));
        if order.field != def.id_field {
            sql.push_str(&format!(", {} ASC", def.id_field));
        }
    }
}

fn select_sql(def: &EntityDef, query: &SelectQuery) -> StoreResult<(String, Vec<SqlValue>)> {
    let mut sql = format!("SELECT {} FROM {}", select_columns(def, query), def.table);
    let mut binds = Vec::new();
    push_predicates(def, query, &mut sql, &mut binds)?;
    push_order(def, query, &mut sql);
    if let Some(limit) = query.limit {
        sql.push_str(" LIMIT ?");
        binds.push(SqlValue::Integer(i64::from(limit)));
    }
    Ok((sql, binds))
}

fn count_sql(def: &EntityDef, query: &SelectQuery) -> StoreResult<(String, Vec<SqlValue>)> {
    let mut sql = format!("SELECT COUNT(*) FROM {}", def.table);
    let mut binds = Vec::new();
    push_predicates(def, query, &mut sql, &mut binds)?;
    Ok((sql, binds))
}
