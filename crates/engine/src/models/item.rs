//! Catalog item model and CRUD operations.
//!
//! Items are the records the search engine runs over. The entity
//! definition here is the single source of the externally queryable field
//! names; everything a caller can sort or search on must be listed in it.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use super::tag::Tag;
use crate::error::EngineResult;
use crate::search::{EntityDef, QuerySpec, SearchResult, SearchService, TagFilter, TagJoin};

/// External entity name items are registered under.
pub const ENTITY: &str = "item";

/// A catalog item record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CatalogItem {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Display name.
    pub name: String,

    /// Longer description.
    pub description: String,

    /// Price in cents.
    pub price_cents: i64,

    /// Validity period in days.
    pub duration_days: i32,

    /// Unix timestamp when created.
    pub created: i64,

    /// Unix timestamp when last changed.
    pub changed: i64,
}

/// Input for creating a new catalog item.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCatalogItem {
    pub name: String,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub duration_days: Option<i32>,
    /// Tag names to attach; created on the fly when missing.
    pub tags: Option<Vec<String>>,
}

/// Input for updating an item. Absent fields keep their current value.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateCatalogItem {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price_cents: Option<i64>,
    pub duration_days: Option<i32>,
    /// When present, replaces the full tag set.
    pub tags: Option<Vec<String>>,
}

/// Validate that an item name is non-empty and at most 255 characters.
fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        anyhow::bail!("item name must not be empty");
    }
    if name.len() > 255 {
        anyhow::bail!("item name must be at most 255 characters, got {}", name.len());
    }
    Ok(())
}

/// Validate that a description fits the column.
fn validate_description(description: &str) -> Result<()> {
    if description.len() > 65535 {
        anyhow::bail!(
            "item description must be at most 65535 characters, got {}",
            description.len()
        );
    }
    Ok(())
}

fn validate_price(price_cents: i64) -> Result<()> {
    if price_cents < 0 {
        anyhow::bail!("item price must not be negative, got {price_cents}");
    }
    Ok(())
}

fn validate_duration(duration_days: i32) -> Result<()> {
    if duration_days < 0 {
        anyhow::bail!("item duration must not be negative, got {duration_days}");
    }
    Ok(())
}

impl CatalogItem {
    /// Price in whole currency units.
    pub fn price(&self) -> f64 {
        self.price_cents as f64 / 100.0
    }

    /// The entity definition registered with the search service at startup.
    pub fn entity_def() -> EntityDef {
        EntityDef::new(ENTITY, "catalog_item")
            .with_field("name", "name")
            .with_field("description", "description")
            .with_field("price", "price_cents")
            .with_field("duration", "duration_days")
            .with_field("created", "created")
            .with_field("changed", "changed")
            .with_tag_join(TagJoin::default())
    }

    /// Run a filter/sort/paginate search over items.
    pub async fn search(service: &SearchService, spec: &QuerySpec) -> EngineResult<SearchResult> {
        service.find(ENTITY, spec).await
    }

    /// Find items carrying every tag name in `tags`.
    pub async fn search_by_tags(
        service: &SearchService,
        tags: &TagFilter,
        spec: &QuerySpec,
    ) -> EngineResult<SearchResult> {
        service.find_by_tags(ENTITY, tags, spec).await
    }

    /// Find an item by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let item = sqlx::query_as::<_, Self>(
            "SELECT id, name, description, price_cents, duration_days, created, changed FROM catalog_item WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch catalog item")?;

        Ok(item)
    }

    /// Create a new item, attaching any requested tags.
    pub async fn create(pool: &PgPool, input: CreateCatalogItem) -> Result<Self> {
        validate_name(&input.name)?;
        if let Some(ref description) = input.description {
            validate_description(description)?;
        }
        validate_price(input.price_cents.unwrap_or(0))?;
        validate_duration(input.duration_days.unwrap_or(0))?;

        let now = chrono::Utc::now().timestamp();
        let id = Uuid::now_v7();

        sqlx::query(
            r#"
            INSERT INTO catalog_item (id, name, description, price_cents, duration_days, created, changed)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(id)
        .bind(&input.name)
        .bind(input.description.unwrap_or_default())
        .bind(input.price_cents.unwrap_or(0))
        .bind(input.duration_days.unwrap_or(0))
        .bind(now)
        .bind(now)
        .execute(pool)
        .await
        .context("failed to create catalog item")?;

        if let Some(ref tags) = input.tags {
            Self::set_tags(pool, id, tags).await?;
        }

        Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("failed to fetch created catalog item"))
    }

    /// Update an item with patch semantics and bump its changed timestamp.
    pub async fn update(pool: &PgPool, id: Uuid, input: UpdateCatalogItem) -> Result<Option<Self>> {
        if let Some(ref name) = input.name {
            validate_name(name)?;
        }
        if let Some(ref description) = input.description {
            validate_description(description)?;
        }
        if let Some(price_cents) = input.price_cents {
            validate_price(price_cents)?;
        }
        if let Some(duration_days) = input.duration_days {
            validate_duration(duration_days)?;
        }

        let Some(current) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };

        let name = input.name.unwrap_or(current.name);
        let description = input.description.unwrap_or(current.description);
        let price_cents = input.price_cents.unwrap_or(current.price_cents);
        let duration_days = input.duration_days.unwrap_or(current.duration_days);
        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            r#"
            UPDATE catalog_item
            SET name = $1, description = $2, price_cents = $3, duration_days = $4, changed = $5
            WHERE id = $6
            "#,
        )
        .bind(&name)
        .bind(&description)
        .bind(price_cents)
        .bind(duration_days)
        .bind(now)
        .bind(id)
        .execute(pool)
        .await
        .context("failed to update catalog item")?;

        if let Some(ref tags) = input.tags {
            Self::set_tags(pool, id, tags).await?;
        }

        Self::find_by_id(pool, id).await
    }

    /// Delete an item (cascades bridge rows).
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM catalog_item WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to delete catalog item")?;

        Ok(result.rows_affected() > 0)
    }

    /// List this item's tags.
    pub async fn tags(pool: &PgPool, id: Uuid) -> Result<Vec<Tag>> {
        Tag::find_by_item(pool, id).await
    }

    /// Attach one tag by name, creating it if it does not exist yet.
    pub async fn add_tag(pool: &PgPool, id: Uuid, name: &str) -> Result<Tag> {
        let tag = Tag::find_or_create(pool, name).await?;

        sqlx::query(
            "INSERT INTO catalog_item_tag (item_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(id)
        .bind(tag.id)
        .execute(pool)
        .await
        .context("failed to attach tag")?;

        Ok(tag)
    }

    /// Replace the item's tag set with the given names, creating tags that
    /// do not exist yet.
    pub async fn set_tags(pool: &PgPool, id: Uuid, names: &[String]) -> Result<()> {
        let mut tag_ids = Vec::with_capacity(names.len());
        for name in names {
            let tag = Tag::find_or_create(pool, name).await?;
            tag_ids.push(tag.id);
        }

        let mut tx = pool.begin().await.context("failed to start transaction")?;

        sqlx::query("DELETE FROM catalog_item_tag WHERE item_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("failed to clear item tags")?;

        for tag_id in tag_ids {
            sqlx::query(
                "INSERT INTO catalog_item_tag (item_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
            )
            .bind(id)
            .bind(tag_id)
            .execute(&mut *tx)
            .await
            .context("failed to attach tag")?;
        }

        tx.commit().await.context("failed to commit tag update")?;

        Ok(())
    }
}
