//! Search criteria types.
//!
//! Callers supply sorting and searching as parallel string lists (field
//! names, directions; field names, expressions), typically lifted out of
//! query parameters by the web layer. The constructors here normalize those
//! lists into typed clauses:
//! - sort fields zip with directions by index; a missing direction means
//!   ascending
//! - search fields zip with expressions by index; a search field with no
//!   expression is dropped, since it cannot produce a predicate
//!
//! Field names in clauses are still external names at this point; they are
//! resolved against the entity's field catalog during query construction.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use crate::error::{EngineError, EngineResult};

/// Largest permitted page size.
pub const MAX_LIMIT: i64 = 1000;

fn default_limit() -> i64 {
    10
}

/// Sort direction.
///
/// Parsing is fail-open: anything that is not recognizably "descending"
/// sorts ascending. Rejecting unknown strings instead was considered and
/// turned down to keep existing callers working; see DESIGN.md.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Ascending,
    Descending,
}

impl Direction {
    /// Parse a caller-supplied direction string, case-insensitively.
    pub fn parse(s: &str) -> Self {
        if s.eq_ignore_ascii_case("desc") || s.eq_ignore_ascii_case("descending") {
            Self::Descending
        } else {
            Self::Ascending
        }
    }

    pub fn is_descending(self) -> bool {
        matches!(self, Self::Descending)
    }
}

/// One ORDER BY term. List order is significant: the first clause is the
/// primary sort key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortClause {
    /// External field name.
    pub field: String,

    /// Sort direction.
    #[serde(default)]
    pub direction: Direction,
}

impl SortClause {
    pub fn new(field: impl Into<String>, direction: Direction) -> Self {
        Self {
            field: field.into(),
            direction,
        }
    }

    /// Zip sort fields with direction strings by index.
    ///
    /// Trailing fields without a direction default to ascending. Extra
    /// directions beyond the field list are ignored.
    pub fn from_parallel_lists(fields: &[String], directions: &[String]) -> Vec<Self> {
        fields
            .iter()
            .enumerate()
            .map(|(i, field)| {
                let direction = directions
                    .get(i)
                    .map(|d| Direction::parse(d))
                    .unwrap_or_default();
                Self::new(field, direction)
            })
            .collect()
    }
}

/// One substring-match predicate: `field` contains `expression`.
///
/// Multiple clauses combine with OR; any clause matching qualifies a row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchClause {
    /// External field name.
    pub field: String,

    /// Substring to look for.
    pub expression: String,
}

impl SearchClause {
    pub fn new(field: impl Into<String>, expression: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            expression: expression.into(),
        }
    }

    /// Zip search fields with expressions by index.
    ///
    /// A trailing field with no expression is dropped; extra expressions
    /// beyond the field list are ignored.
    pub fn from_parallel_lists(fields: &[String], expressions: &[String]) -> Vec<Self> {
        fields
            .iter()
            .zip(expressions.iter())
            .map(|(field, expression)| Self::new(field, expression))
            .collect()
    }
}

/// A required set of tag names: an item qualifies only when it carries
/// every name in the set.
///
/// Construction de-duplicates (order-preserving), so the intersection
/// count downstream can never be inflated by repeated names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFilter {
    names: Vec<String>,
}

impl TagFilter {
    /// Build a tag filter from caller-supplied names.
    ///
    /// Returns [`EngineError::EmptyTagSet`] when no names remain after
    /// trimming, since "no required tags" has no well-defined meaning.
    pub fn new<I, S>(names: I) -> EngineResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut deduped: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !deduped.contains(&name) {
                deduped.push(name);
            }
        }
        if deduped.is_empty() {
            return Err(EngineError::EmptyTagSet);
        }
        Ok(Self { names: deduped })
    }

    /// The distinct tag names, in first-seen order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Number of distinct names; this is the N the intersection count must
    /// reach.
    pub fn count(&self) -> usize {
        self.names.len()
    }
}

/// Pagination bounds.
///
/// Out-of-range values are a caller error, not silently clamped. A limit
/// of zero is valid and returns no rows, which is distinct from unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Number of rows to skip.
    #[serde(default)]
    pub offset: i64,

    /// Maximum number of rows to return (default: 10).
    #[serde(default = "default_limit")]
    pub limit: i64,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: default_limit(),
        }
    }
}

impl Page {
    /// Build a validated page.
    pub fn new(offset: i64, limit: i64) -> EngineResult<Self> {
        let page = Self { offset, limit };
        page.validate()?;
        Ok(page)
    }

    /// Check the bounds: offset >= 0 and 0 <= limit <= [`MAX_LIMIT`].
    pub fn validate(&self) -> EngineResult<()> {
        if self.offset < 0 || self.limit < 0 || self.limit > MAX_LIMIT {
            return Err(EngineError::InvalidRange {
                offset: self.offset,
                limit: self.limit,
            });
        }
        Ok(())
    }
}

/// The aggregate search input: sort clauses, search clauses, and a page.
///
/// Built fresh per request and never mutated afterwards; concurrent
/// requests share nothing through it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuerySpec {
    #[serde(default)]
    pub sorts: Vec<SortClause>,

    #[serde(default)]
    pub searches: Vec<SearchClause>,

    #[serde(default)]
    pub page: Page,
}

impl QuerySpec {
    /// Normalize the four caller-supplied parallel lists into a spec with
    /// the default page.
    pub fn from_parallel_lists(
        sort_fields: &[String],
        sort_directions: &[String],
        search_fields: &[String],
        search_expressions: &[String],
    ) -> Self {
        Self {
            sorts: SortClause::from_parallel_lists(sort_fields, sort_directions),
            searches: SearchClause::from_parallel_lists(search_fields, search_expressions),
            page: Page::default(),
        }
    }

    pub fn with_page(mut self, page: Page) -> Self {
        self.page = page;
        self
    }
}

/// Result of executing a search: one page of rows plus paging metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Matched rows as JSON objects.
    pub items: Vec<JsonValue>,

    /// Total matches before paging.
    pub total: u64,

    /// Offset this page started at.
    pub offset: i64,

    /// Limit this page was fetched with.
    pub limit: i64,
}

impl SearchResult {
    /// Create a result with paging metadata.
    pub fn new(items: Vec<JsonValue>, total: u64, page: Page) -> Self {
        Self {
            items,
            total,
            offset: page.offset,
            limit: page.limit,
        }
    }

    /// Whether rows beyond this page matched.
    pub fn has_more(&self) -> bool {
        let seen = self.offset.max(0) as u64 + self.items.len() as u64;
        seen < self.total
    }
}
