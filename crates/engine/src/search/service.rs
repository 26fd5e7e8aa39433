//! Search service: binds built queries to PostgreSQL and materializes rows.
//!
//! This is the only part of the engine that touches the store. Validation
//! and query construction happen first and synchronously; a request that
//! fails validation never reaches the pool. Statement execution runs inside
//! a transaction with a local statement timeout, and store failures are
//! wrapped with the entity name so they can be diagnosed without logging
//! query text or parameter values.

use std::collections::HashMap;

use sea_query::Value;
use serde_json::Value as JsonValue;
use sqlx::PgPool;
use sqlx::postgres::PgArguments;
use sqlx::query::QueryScalar;

use super::catalog::EntityDef;
use super::query_builder::{BuiltQuery, SearchQueryBuilder};
use super::types::{QuerySpec, SearchResult, TagFilter};
use crate::error::{EngineError, EngineResult};

/// Executes searches against registered entities.
///
/// The entity registry is built once at startup and read-only afterwards,
/// so a shared reference is safe across concurrent requests.
pub struct SearchService {
    pool: PgPool,
    entities: HashMap<String, EntityDef>,
}

impl SearchService {
    /// Create a service over a pool and the entities it may query.
    pub fn new(pool: PgPool, entities: impl IntoIterator<Item = EntityDef>) -> Self {
        let entities = entities
            .into_iter()
            .map(|def| (def.name.clone(), def))
            .collect();
        Self { pool, entities }
    }

    /// Look up a registered entity definition.
    pub fn entity(&self, name: &str) -> EngineResult<&EntityDef> {
        self.entities
            .get(name)
            .ok_or_else(|| EngineError::UnknownEntity(name.to_string()))
    }

    /// Run a filter/sort/paginate search for one entity.
    pub async fn find(&self, entity: &str, spec: &QuerySpec) -> EngineResult<SearchResult> {
        let def = self.entity(entity)?;
        let builder = SearchQueryBuilder::new(def, spec);
        let main = builder.build()?;
        let count = builder.build_count()?;

        self.run(def, spec, main, count).await
    }

    /// Run a tag-intersection search: only items carrying every requested
    /// tag name, with the generic search/sort/pagination applied on top.
    pub async fn find_by_tags(
        &self,
        entity: &str,
        tags: &TagFilter,
        spec: &QuerySpec,
    ) -> EngineResult<SearchResult> {
        let def = self.entity(entity)?;
        let builder = SearchQueryBuilder::new(def, spec);
        let main = builder.build_tag_intersection(tags)?;
        let count = builder.build_tag_intersection_count(tags)?;

        self.run(def, spec, main, count).await
    }

    /// Execute a main/count query pair and assemble the result page.
    async fn run(
        &self,
        def: &EntityDef,
        spec: &QuerySpec,
        main: BuiltQuery,
        count: BuiltQuery,
    ) -> EngineResult<SearchResult> {
        let entity = def.name.as_str();
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error(entity, e))?;

        // SET LOCAL applies for the transaction and resets on commit/rollback.
        sqlx::query("SET LOCAL statement_timeout = '10s'")
            .execute(&mut *tx)
            .await
            .map_err(|e| store_error(entity, e))?;

        let total: i64 = bind_values(sqlx::query_scalar(&count.sql), &count.values)?
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| store_error(entity, e))?;

        // Wrap the page query so each row comes back as one JSON object,
        // whatever columns the entity has.
        let rows_sql = format!("SELECT row_to_json(t) FROM ({}) t", main.sql);
        let items: Vec<JsonValue> = bind_values(sqlx::query_scalar(&rows_sql), &main.values)?
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| store_error(entity, e))?;

        tx.commit()
            .await
            .map_err(|e| store_error(entity, e))?;

        Ok(SearchResult::new(items, total.max(0) as u64, spec.page))
    }
}

fn store_error(entity: &str, source: sqlx::Error) -> EngineError {
    tracing::error!(entity = %entity, error = %source, "search query failed");
    EngineError::store(entity, source)
}

/// Bind SeaQuery values onto a sqlx query in placeholder order.
fn bind_values<'q, O>(
    mut query: QueryScalar<'q, sqlx::Postgres, O, PgArguments>,
    values: &sea_query::Values,
) -> EngineResult<QueryScalar<'q, sqlx::Postgres, O, PgArguments>> {
    for value in values.iter() {
        query = match value {
            Value::Bool(v) => query.bind(*v),
            Value::TinyInt(v) => query.bind(v.map(i16::from)),
            Value::SmallInt(v) => query.bind(*v),
            Value::Int(v) => query.bind(*v),
            Value::BigInt(v) => query.bind(*v),
            Value::TinyUnsigned(v) => query.bind(v.map(i16::from)),
            Value::SmallUnsigned(v) => query.bind(v.map(i32::from)),
            Value::Unsigned(v) => query.bind(v.map(i64::from)),
            // LIMIT/OFFSET land here; the pagination guard keeps them
            // well inside i64 range.
            Value::BigUnsigned(v) => {
                let v = match v {
                    Some(n) => Some(i64::try_from(*n).map_err(|_| {
                        EngineError::Internal(anyhow::anyhow!(
                            "bind parameter out of range: {n}"
                        ))
                    })?),
                    None => None,
                };
                query.bind(v)
            }
            Value::Float(v) => query.bind(*v),
            Value::Double(v) => query.bind(*v),
            Value::String(v) => query.bind(v.as_deref().cloned()),
            Value::Char(v) => query.bind(v.map(|c| c.to_string())),
            Value::Bytes(v) => query.bind(v.as_deref().cloned()),
            Value::Uuid(v) => query.bind(v.as_deref().copied()),
            other => {
                return Err(EngineError::Internal(anyhow::anyhow!(
                    "unsupported bind parameter type: {other:?}"
                )));
            }
        };
    }

    Ok(query)
}
