//! Domain models backed by the catalog tables.

pub mod item;
pub mod tag;

pub use item::{CatalogItem, CreateCatalogItem, UpdateCatalogItem};
pub use tag::Tag;
