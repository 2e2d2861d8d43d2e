//! Shared entity definitions, schema and seed helpers for integration
//! tests.

#![allow(dead_code)]

use lodestone_core::{EntityDef, RelationDef, SqliteStore, TranslationDef};
use rusqlite::params;

/// Localized entity: articles carry translations and comments.
pub static ARTICLE: EntityDef = EntityDef {
    name: "article",
    table: "articles",
    id_field: "id",
    created_at_field: "created_at",
    slug_field: None,
    fields: &["id", "status", "author_id", "created_at"],
    relations: &[RelationDef {
        name: "comments",
        table: "comments",
        foreign_key: "article_id",
    }],
    translations: Some(TranslationDef {
        relation: RelationDef {
            name: "translations",
            table: "article_translations",
            foreign_key: "article_id",
        },
        locale_field: "locale",
        slug_field: Some("slug"),
        fields: &["id", "article_id", "locale", "title", "slug", "body"],
    }),
};

/// Non-localized entity: projects carry their own slug.
pub static PROJECT: EntityDef = EntityDef {
    name: "project",
    table: "projects",
    id_field: "id",
    created_at_field: "created_at",
    slug_field: Some("slug"),
    fields: &["id", "name", "slug", "status", "created_at"],
    relations: &[],
    translations: None,
};

const SCHEMA: &str = r#"
CREATE TABLE articles (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    status TEXT NOT NULL DEFAULT 'draft',
    author_id INTEGER,
    created_at INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE article_translations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    article_id INTEGER NOT NULL REFERENCES articles (id) ON DELETE CASCADE,
    locale TEXT NOT NULL,
    title TEXT NOT NULL,
    slug TEXT,
    body TEXT
);

CREATE TABLE comments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    article_id INTEGER NOT NULL REFERENCES articles (id) ON DELETE CASCADE,
    author TEXT NOT NULL,
    body TEXT NOT NULL
);

CREATE TABLE projects (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    slug TEXT,
    status TEXT NOT NULL DEFAULT 'active',
    created_at INTEGER NOT NULL DEFAULT 0
);
"#;

/// Opens an in-memory store with the test schema applied.
pub fn open_store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().expect("open in-memory store");
    store
        .connection()
        .execute_batch(SCHEMA)
        .expect("create test schema");
    store
}

pub fn seed_article(store: &SqliteStore, status: &str, author_id: i64, created_at: i64) -> i64 {
    store
        .connection()
        .execute(
            "INSERT INTO articles (status, author_id, created_at) VALUES (?1, ?2, ?3)",
            params![status, author_id, created_at],
        )
        .expect("seed article");
    store.connection().last_insert_rowid()
}

pub fn seed_translation(
    store: &SqliteStore,
    article_id: i64,
    locale: &str,
    title: &str,
    slug: Option<&str>,
) {
    store
        .connection()
        .execute(
            "INSERT INTO article_translations (article_id, locale, title, slug, body)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![article_id, locale, title, slug, format!("{title} body")],
        )
        .expect("seed translation");
}

pub fn seed_comment(store: &SqliteStore, article_id: i64, author: &str, body: &str) {
    store
        .connection()
        .execute(
            "INSERT INTO comments (article_id, author, body) VALUES (?1, ?2, ?3)",
            params![article_id, author, body],
        )
        .expect("seed comment");
}

pub fn seed_project(
    store: &SqliteStore,
    name: &str,
    slug: Option<&str>,
    status: &str,
    created_at: i64,
) -> i64 {
    store
        .connection()
        .execute(
            "INSERT INTO projects (name, slug, status, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![name, slug, status, created_at],
        )
        .expect("seed project");
    store.connection().last_insert_rowid()
}

/// Extracts integer ids from a record list, in order.
pub fn ids(records: &[lodestone_core::Record]) -> Vec<i64> {
    records
        .iter()
        .map(|record| {
            record
                .get("id")
                .and_then(lodestone_core::Value::as_integer)
                .expect("integer id")
        })
        .collect()
}
