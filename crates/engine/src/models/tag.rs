//! Tag model and CRUD operations.
//!
//! Tags are flat labels attached to catalog items through the
//! `catalog_item_tag` bridge. Names are unique; attaching by name goes
//! through [`Tag::find_or_create`].

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// A tag record.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Tag {
    /// Unique identifier (UUIDv7).
    pub id: Uuid,

    /// Unique tag name.
    pub name: String,

    /// Unix timestamp when created.
    pub created: i64,
}

/// Validate that a tag name is non-empty and at most 255 characters.
fn validate_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        anyhow::bail!("tag name must not be empty");
    }
    if name.len() > 255 {
        anyhow::bail!("tag name must be at most 255 characters, got {}", name.len());
    }
    Ok(())
}

impl Tag {
    /// Find a tag by ID.
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>> {
        let tag = sqlx::query_as::<_, Self>("SELECT id, name, created FROM tag WHERE id = $1")
            .bind(id)
            .fetch_optional(pool)
            .await
            .context("failed to fetch tag")?;

        Ok(tag)
    }

    /// Find a tag by name.
    pub async fn find_by_name(pool: &PgPool, name: &str) -> Result<Option<Self>> {
        let tag = sqlx::query_as::<_, Self>("SELECT id, name, created FROM tag WHERE name = $1")
            .bind(name)
            .fetch_optional(pool)
            .await
            .context("failed to fetch tag by name")?;

        Ok(tag)
    }

    /// List all tags ordered by name.
    pub async fn list(pool: &PgPool) -> Result<Vec<Self>> {
        let tags = sqlx::query_as::<_, Self>("SELECT id, name, created FROM tag ORDER BY name")
            .fetch_all(pool)
            .await
            .context("failed to list tags")?;

        Ok(tags)
    }

    /// Create a new tag.
    pub async fn create(pool: &PgPool, name: &str) -> Result<Self> {
        validate_name(name)?;

        let now = chrono::Utc::now().timestamp();
        let id = Uuid::now_v7();

        sqlx::query("INSERT INTO tag (id, name, created) VALUES ($1, $2, $3)")
            .bind(id)
            .bind(name)
            .bind(now)
            .execute(pool)
            .await
            .context("failed to create tag")?;

        Self::find_by_id(pool, id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("failed to fetch created tag"))
    }

    /// Fetch a tag by name, creating it if it does not exist.
    pub async fn find_or_create(pool: &PgPool, name: &str) -> Result<Self> {
        validate_name(name)?;

        let now = chrono::Utc::now().timestamp();

        sqlx::query(
            "INSERT INTO tag (id, name, created) VALUES ($1, $2, $3) ON CONFLICT (name) DO NOTHING",
        )
        .bind(Uuid::now_v7())
        .bind(name)
        .bind(now)
        .execute(pool)
        .await
        .context("failed to upsert tag")?;

        Self::find_by_name(pool, name)
            .await?
            .ok_or_else(|| anyhow::anyhow!("failed to fetch upserted tag"))
    }

    /// Delete a tag (cascades bridge rows).
    pub async fn delete(pool: &PgPool, id: Uuid) -> Result<bool> {
        let result = sqlx::query("DELETE FROM tag WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await
            .context("failed to delete tag")?;

        Ok(result.rows_affected() > 0)
    }

    /// List the tags attached to a catalog item, ordered by name.
    pub async fn find_by_item(pool: &PgPool, item_id: Uuid) -> Result<Vec<Self>> {
        let tags = sqlx::query_as::<_, Self>(
            r#"
            SELECT t.id, t.name, t.created
            FROM tag t
            INNER JOIN catalog_item_tag b ON t.id = b.tag_id
            WHERE b.item_id = $1
            ORDER BY t.name
            "#,
        )
        .bind(item_id)
        .fetch_all(pool)
        .await
        .context("failed to fetch item tags")?;

        Ok(tags)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn name_validation_bounds() {
        assert!(validate_name("electronics").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"x".repeat(255)).is_ok());
        assert!(validate_name(&"x".repeat(256)).is_err());
    }

    #[test]
    fn tag_serialization() {
        let tag = Tag {
            id: Uuid::nil(),
            name: "electronics".to_string(),
            created: 1000,
        };

        let json = serde_json::to_string(&tag).unwrap();
        assert!(json.contains("electronics"));

        let parsed: Tag = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.name, "electronics");
    }
}
