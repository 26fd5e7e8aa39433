//! Cerca engine: dynamic query construction and tag-intersection search
//! for catalog data.
//!
//! Callers hand the engine schema-agnostic sort/search criteria (parallel
//! string lists as they arrive from a web layer), a page, and optionally a
//! required set of tag names; the engine validates everything against a
//! per-entity field whitelist, assembles parameterized SQL, and executes it
//! against PostgreSQL. The HTTP surface, authentication, and entity mapping
//! live elsewhere and call in through [`search::SearchService`].

pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod search;

pub use error::{EngineError, EngineResult};
