//! Cerca test utilities.
//!
//! Helpers for engine tests: parallel-list fixtures and catalog item
//! builders for asserting over generated queries and result shapes.

use serde_json::Value as JsonValue;
use uuid::Uuid;

/// Split a comma-separated string into owned items.
///
/// Criteria arrive at the engine as parallel `Vec<String>` lists; this
/// keeps fixtures for them on one line. Whitespace around items is
/// preserved, since the engine must take caller input as-is.
pub fn csv(input: &str) -> Vec<String> {
    if input.is_empty() {
        return Vec::new();
    }
    input.split(',').map(str::to_string).collect()
}

/// Create a test catalog item with default values.
pub fn test_item(name: &str) -> TestCatalogItem {
    TestCatalogItem {
        id: Uuid::now_v7(),
        name: name.to_string(),
        description: String::new(),
        price_cents: 1000,
        duration_days: 30,
        tags: Vec::new(),
    }
}

/// A catalog item builder for test fixtures.
#[derive(Debug, Clone)]
pub struct TestCatalogItem {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub price_cents: i64,
    pub duration_days: i32,
    pub tags: Vec<String>,
}

impl TestCatalogItem {
    /// Set a custom ID.
    pub fn with_id(mut self, id: Uuid) -> Self {
        self.id = id;
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    /// Set the price in cents.
    pub fn with_price(mut self, price_cents: i64) -> Self {
        self.price_cents = price_cents;
        self
    }

    /// Set the validity period.
    pub fn with_duration(mut self, duration_days: i32) -> Self {
        self.duration_days = duration_days;
        self
    }

    /// Attach tag names.
    pub fn with_tags(mut self, tags: &[&str]) -> Self {
        self.tags = tags.iter().map(|t| (*t).to_string()).collect();
        self
    }

    /// Render as the JSON object shape the executor materializes rows into.
    pub fn to_row(&self) -> JsonValue {
        serde_json::json!({
            "id": self.id,
            "name": self.name,
            "description": self.description,
            "price_cents": self.price_cents,
            "duration_days": self.duration_days,
        })
    }
}
