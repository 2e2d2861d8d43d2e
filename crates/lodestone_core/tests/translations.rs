mod common;

use common::{ids, open_store, seed_article, seed_comment, seed_project, seed_translation, ARTICLE, PROJECT};
use lodestone_core::{EntityDef, FieldMap, RepoError, Repository, SortOrder, Value};

/// Entity with neither an own slug nor a translated slug.
static AUDIT_EVENT: EntityDef = EntityDef {
    name: "audit_event",
    table: "projects",
    id_field: "id",
    created_at_field: "created_at",
    slug_field: None,
    fields: &["id", "name", "created_at"],
    relations: &[],
    translations: None,
};

#[test]
fn find_attaches_translations_for_localized_entities() {
    let store = open_store();
    let repo = Repository::new(&store, &ARTICLE);
    let id = seed_article(&store, "published", 1, 100);
    seed_translation(&store, id, "en", "Hello", Some("hello"));
    seed_translation(&store, id, "fr", "Bonjour", Some("bonjour"));

    let found = repo.find(id).expect("find").expect("article exists");
    assert!(found.has_related("translations"));
    let translations = found.related("translations");
    assert_eq!(translations.len(), 2);
    let locales: Vec<&str> = translations
        .iter()
        .map(|row| row.get("locale").and_then(Value::as_text).expect("locale"))
        .collect();
    assert!(locales.contains(&"en"));
    assert!(locales.contains(&"fr"));
}

#[test]
fn localized_entity_without_rows_still_gets_the_relation_attached() {
    let store = open_store();
    let repo = Repository::new(&store, &ARTICLE);
    let id = seed_article(&store, "draft", 1, 100);

    let found = repo.find(id).expect("find").expect("article exists");
    assert!(found.has_related("translations"));
    assert!(found.related("translations").is_empty());
}

#[test]
fn non_localized_entities_never_get_translations_attached() {
    let store = open_store();
    let repo = Repository::new(&store, &PROJECT);
    seed_project(&store, "Atlas", Some("atlas"), "active", 100);

    let found = repo.find(1).expect("find").expect("project exists");
    assert!(!found.has_related("translations"));

    let listed = repo.all().expect("all");
    assert!(!listed[0].has_related("translations"));
}

#[test]
fn capability_attach_covers_attribute_queries() {
    let store = open_store();
    let repo = Repository::new(&store, &ARTICLE);
    let id = seed_article(&store, "published", 1, 100);
    seed_translation(&store, id, "en", "Hello", None);

    let found = repo
        .find_by_attributes(&FieldMap::new().set("status", "published"))
        .expect("find by attributes")
        .expect("article exists");
    assert_eq!(found.related("translations").len(), 1);

    let listed = repo
        .get_by_attributes(&FieldMap::new(), None, SortOrder::Asc)
        .expect("get by attributes");
    assert_eq!(listed[0].related("translations").len(), 1);

    let many = repo.find_by_many(&[Value::Integer(id)]).expect("find by many");
    assert_eq!(many[0].related("translations").len(), 1);

    let page = repo.paginate(Some(5)).expect("paginate");
    assert_eq!(page.items[0].related("translations").len(), 1);
}

#[test]
fn all_translated_in_filters_by_locale() {
    let store = open_store();
    let repo = Repository::new(&store, &ARTICLE);
    let first = seed_article(&store, "published", 1, 100);
    seed_translation(&store, first, "en", "Hello", None);
    seed_translation(&store, first, "fr", "Bonjour", None);
    let second = seed_article(&store, "published", 1, 200);
    seed_translation(&store, second, "en", "World", None);

    let french = repo.all_translated_in("fr").expect("french listing");
    assert_eq!(ids(&french), vec![first]);
    assert!(french[0].has_related("translations"));

    let german = repo.all_translated_in("de").expect("german listing");
    assert!(german.is_empty());

    // Newest first across the whole translated set.
    let english = repo.all_translated_in("en").expect("english listing");
    assert_eq!(ids(&english), vec![second, first]);
}

#[test]
fn all_translated_in_requires_the_capability() {
    let store = open_store();
    let repo = Repository::new(&store, &PROJECT);
    let err = repo.all_translated_in("en").expect_err("no capability");
    assert!(matches!(err, RepoError::NotTranslatable { .. }));
}

#[test]
fn find_by_slug_matches_through_translations_when_localized() {
    let store = open_store();
    let repo = Repository::new(&store, &ARTICLE);
    let id = seed_article(&store, "published", 1, 100);
    seed_translation(&store, id, "en", "Hello World", Some("hello-world"));

    let found = repo
        .find_by_slug("hello-world")
        .expect("find by slug")
        .expect("article exists");
    assert_eq!(ids(&[found.clone()]), vec![id]);
    assert!(found.has_related("translations"));

    assert!(repo.find_by_slug("missing").expect("miss").is_none());
}

#[test]
fn find_by_slug_matches_own_field_case_sensitively_when_not_localized() {
    let store = open_store();
    let repo = Repository::new(&store, &PROJECT);
    seed_project(&store, "Hello", Some("hello-world"), "active", 100);

    assert!(repo
        .find_by_slug("hello-world")
        .expect("exact match")
        .is_some());
    assert!(repo
        .find_by_slug("Hello-World")
        .expect("case mismatch")
        .is_none());
}

#[test]
fn find_by_slug_requires_a_slug_source() {
    let store = open_store();
    let repo = Repository::new(&store, &AUDIT_EVENT);
    let err = repo.find_by_slug("anything").expect_err("no slug source");
    assert!(matches!(err, RepoError::NoSlugSource { .. }));
}

#[test]
fn explicit_relation_sets_bypass_the_capability_attach() {
    let store = open_store();
    let repo = Repository::new(&store, &ARTICLE);
    let id = seed_article(&store, "published", 1, 100);
    seed_translation(&store, id, "en", "Hello", None);
    seed_comment(&store, id, "ada", "first!");

    let found = repo
        .find_with(id, &["comments"])
        .expect("find with")
        .expect("article exists");
    assert!(found.has_related("comments"));
    assert!(!found.has_related("translations"));

    // The caller may of course ask for translations explicitly.
    let found = repo
        .find_with(id, &["translations", "comments"])
        .expect("find with both")
        .expect("article exists");
    assert_eq!(found.related("translations").len(), 1);
    assert_eq!(found.related("comments").len(), 1);
}

#[test]
fn projection_on_localized_entities_keeps_translations_loadable() {
    let store = open_store();
    let repo = Repository::new(&store, &ARTICLE);
    let id = seed_article(&store, "published", 1, 100);
    seed_translation(&store, id, "en", "Hello", None);

    let listed = repo
        .get_by_attributes_with_columns(
            &FieldMap::new().set("status", "published"),
            Some(&["status"]),
            None,
            SortOrder::Asc,
        )
        .expect("projected localized query");
    // The id rides along so hydration has a key; the projection still
    // drops the other columns.
    assert_eq!(listed[0].related("translations").len(), 1);
    assert!(listed[0].get("author_id").is_none());
    assert!(listed[0].get("created_at").is_none());
}
