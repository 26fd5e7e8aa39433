//! Search engine module.
//!
//! This module provides:
//! - criteria types and the parallel-list normalizer (`types`)
//! - the per-entity field whitelist (`catalog`)
//! - SeaQuery-based statement construction (`query_builder`)
//! - the executing service (`service`)

mod catalog;
mod query_builder;
mod service;
pub mod types;

pub use catalog::{BaseFilter, EntityDef, FieldCatalog, TagJoin};
pub use query_builder::{BuiltQuery, SearchQueryBuilder};
pub use service::SearchService;
pub use types::{
    Direction, MAX_LIMIT, Page, QuerySpec, SearchClause, SearchResult, SortClause, TagFilter,
};
