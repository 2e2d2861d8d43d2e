//! Static entity metadata consumed by the repository layer.
//!
//! # Responsibility
//! - Describe one persisted entity type: table, key fields, field
//!   allow-list, named relations and the optional translation capability.
//! - Answer the runtime capability and relation-resolution queries the
//!   repository performs before shaping a query.
//!
//! # Invariants
//! - Field, relation and column names supplied by callers at runtime are
//!   only ever used after validation against these declarations; the
//!   allow-list is what keeps runtime-supplied names out of raw SQL.
//! - The translation capability is a property of the definition, queried
//!   per call, never inferred from the record shape.

/// A named to-many association loaded eagerly alongside an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationDef {
    /// Stable relation name used in caller-supplied relation sets.
    pub name: &'static str,
    /// Table holding the related rows.
    pub table: &'static str,
    /// Column on the related table referencing the entity id.
    pub foreign_key: &'static str,
}

/// Declaration of the translation capability for a localized entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TranslationDef {
    /// The underlying relation, conventionally named `translations`.
    pub relation: RelationDef,
    /// Column on the translation table holding the locale code.
    pub locale_field: &'static str,
    /// Column on the translation table holding the localized slug, when
    /// the entity is addressed by slug through its translations.
    pub slug_field: Option<&'static str>,
    /// Allow-list of translation table fields usable in translation
    /// filters.
    pub fields: &'static [&'static str],
}

impl TranslationDef {
    /// Returns whether the translation table declares the field.
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|known| *known == field)
    }
}

/// Static description of one entity type.
///
/// Definitions are usually `static` items; the repository holds a
/// reference and consults it on every operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityDef {
    /// Short entity name used in diagnostics.
    pub name: &'static str,
    /// Table holding the entity rows.
    pub table: &'static str,
    /// Identifier column.
    pub id_field: &'static str,
    /// Creation timestamp column, the default ordering key.
    pub created_at_field: &'static str,
    /// Slug column on the entity table itself, for non-localized slug
    /// lookup.
    pub slug_field: Option<&'static str>,
    /// Allow-list of entity table fields usable in filters, ordering,
    /// projections and write payloads.
    pub fields: &'static [&'static str],
    /// Plain relations beyond the translation capability.
    pub relations: &'static [RelationDef],
    /// Translation capability, present only for localized entities.
    pub translations: Option<TranslationDef>,
}

impl EntityDef {
    /// Runtime capability query: does this entity carry translations?
    pub fn supports_translations(&self) -> bool {
        self.translations.is_some()
    }

    /// Returns the translation declaration, if the entity is localized.
    pub fn translation(&self) -> Option<&TranslationDef> {
        self.translations.as_ref()
    }

    /// Resolves a relation by name, covering both plain relations and the
    /// translation relation.
    pub fn relation(&self, name: &str) -> Option<RelationDef> {
        if let Some(found) = self.relations.iter().find(|rel| rel.name == name) {
            return Some(*found);
        }
        self.translations
            .filter(|translation| translation.relation.name == name)
            .map(|translation| translation.relation)
    }

    /// Returns whether the entity table declares the field.
    pub fn has_field(&self, field: &str) -> bool {
        self.fields.iter().any(|known| *known == field)
    }
}
