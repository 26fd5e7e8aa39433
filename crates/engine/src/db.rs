//! Database connection pool management and schema bootstrap.

use anyhow::{Context, Result};
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::Config;

/// Create a PostgreSQL connection pool.
pub async fn create_pool(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await
        .context("failed to connect to PostgreSQL")?;

    Ok(pool)
}

/// Check if the database connection is healthy.
pub async fn check_health(pool: &PgPool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}

/// Create the catalog tables if they do not exist yet.
///
/// The bridge table carries a composite primary key, so an item can be
/// associated with a given tag at most once.
pub async fn ensure_schema(pool: &PgPool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS catalog_item (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            price_cents BIGINT NOT NULL DEFAULT 0,
            duration_days INT NOT NULL DEFAULT 0,
            created BIGINT NOT NULL,
            changed BIGINT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .context("failed to create catalog_item table")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tag (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            created BIGINT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await
    .context("failed to create tag table")?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS catalog_item_tag (
            item_id UUID NOT NULL REFERENCES catalog_item(id) ON DELETE CASCADE,
            tag_id UUID NOT NULL REFERENCES tag(id) ON DELETE CASCADE,
            PRIMARY KEY (item_id, tag_id)
        )
        "#,
    )
    .execute(pool)
    .await
    .context("failed to create catalog_item_tag table")?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_catalog_item_tag_tag ON catalog_item_tag (tag_id)")
        .execute(pool)
        .await
        .context("failed to create bridge index")?;

    Ok(())
}
