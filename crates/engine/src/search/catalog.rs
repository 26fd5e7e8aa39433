//! Entity definitions and the field whitelist.
//!
//! Column identifiers cannot be bound as query parameters, so the only safe
//! way to let callers name fields is a closed allow-list. A [`FieldCatalog`]
//! maps each externally nameable field to its internal column; anything not
//! in the map is rejected before it can influence query structure.
//!
//! Definitions are built once at startup and never mutated afterwards, so
//! they are shared across requests without synchronization.

use std::collections::HashMap;

use crate::error::{EngineError, EngineResult};

/// Closed mapping from external field names to internal column names.
#[derive(Debug, Clone, Default)]
pub struct FieldCatalog {
    fields: HashMap<String, String>,
}

impl FieldCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allow an external field name, mapped to an internal column.
    pub fn with_field(mut self, external: impl Into<String>, column: impl Into<String>) -> Self {
        self.fields.insert(external.into(), column.into());
        self
    }

    /// Look up the internal column for an external name.
    pub fn get(&self, external: &str) -> Option<&str> {
        self.fields.get(external).map(String::as_str)
    }
}

/// How an entity reaches its tags: the bridge table and the tag table.
#[derive(Debug, Clone)]
pub struct TagJoin {
    /// Bridge (association) table.
    pub bridge_table: String,

    /// Bridge column referencing the item.
    pub item_fk: String,

    /// Bridge column referencing the tag.
    pub tag_fk: String,

    /// Tag table.
    pub tag_table: String,

    /// Tag table primary key column.
    pub tag_pk: String,

    /// Tag name column the requested set matches against.
    pub name_column: String,
}

impl Default for TagJoin {
    fn default() -> Self {
        Self {
            bridge_table: "catalog_item_tag".to_string(),
            item_fk: "item_id".to_string(),
            tag_fk: "tag_id".to_string(),
            tag_table: "tag".to_string(),
            tag_pk: "id".to_string(),
            name_column: "name".to_string(),
        }
    }
}

/// A fixed filter the base query always carries (e.g. a type column), in
/// addition to whatever the caller searches for. The column is an internal
/// name chosen at definition time; the value is bound as a parameter.
#[derive(Debug, Clone)]
pub struct BaseFilter {
    pub column: String,
    pub value: String,
}

/// Everything the engine knows about one queryable entity.
#[derive(Debug, Clone)]
pub struct EntityDef {
    /// External entity name; registry key.
    pub name: String,

    /// Base table.
    pub table: String,

    /// Primary key column, used as the grouping key for tag intersection.
    pub id_column: String,

    /// Optional fixed filter applied to every query for this entity.
    pub base_filter: Option<BaseFilter>,

    /// Tag bridge description; absent for entities without tags.
    pub tag_join: Option<TagJoin>,

    catalog: FieldCatalog,
}

impl EntityDef {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            id_column: "id".to_string(),
            base_filter: None,
            tag_join: None,
            catalog: FieldCatalog::new(),
        }
    }

    pub fn with_id_column(mut self, column: impl Into<String>) -> Self {
        self.id_column = column.into();
        self
    }

    /// Allow an external field name, mapped to an internal column.
    pub fn with_field(mut self, external: impl Into<String>, column: impl Into<String>) -> Self {
        self.catalog = self.catalog.with_field(external, column);
        self
    }

    pub fn with_base_filter(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.base_filter = Some(BaseFilter {
            column: column.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_tag_join(mut self, tag_join: TagJoin) -> Self {
        self.tag_join = Some(tag_join);
        self
    }

    /// Resolve an external field name to its internal column, or fail with
    /// [`EngineError::UnknownField`].
    pub fn resolve_field(&self, external: &str) -> EngineResult<&str> {
        self.catalog
            .get(external)
            .ok_or_else(|| EngineError::UnknownField {
                entity: self.name.clone(),
                field: external.to_string(),
            })
    }
}
