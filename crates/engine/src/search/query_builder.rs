//! Search query builder using SeaQuery.
//!
//! Assembles SELECT statements from validated criteria:
//! - search clauses become OR-combined `LIKE '%expr%'` predicates
//! - sort clauses become ORDER BY terms, in list order
//! - the tag-intersection query joins through the tag bridge, restricts to
//!   the requested names, groups by item identity, and keeps groups whose
//!   distinct matched-name count equals the requested set size
//!
//! Every caller value travels as a bound parameter; the only identifiers
//! that reach query text are internal column names resolved through the
//! entity's field catalog. Builders borrow their inputs and hold no state
//! of their own, so nothing is shared between requests.

use sea_query::{
    Alias, Asterisk, Cond, Expr, ExprTrait, Func, Order, PostgresQueryBuilder, Query,
    SelectStatement, Values,
};

use super::catalog::EntityDef;
use super::types::{QuerySpec, TagFilter};
use crate::error::EngineResult;

/// A finished statement: SQL text with `$n` placeholders plus the values
/// to bind, in placeholder order.
#[derive(Debug, Clone)]
pub struct BuiltQuery {
    pub sql: String,
    pub values: Values,
}

impl BuiltQuery {
    /// Split into (query, params).
    pub fn into_parts(self) -> (String, Values) {
        (self.sql, self.values)
    }
}

/// Per-request query builder for one entity.
pub struct SearchQueryBuilder<'a> {
    entity: &'a EntityDef,
    spec: &'a QuerySpec,
}

impl<'a> SearchQueryBuilder<'a> {
    pub fn new(entity: &'a EntityDef, spec: &'a QuerySpec) -> Self {
        Self { entity, spec }
    }

    /// Build the main SELECT with filters, ordering, and pagination.
    ///
    /// All validation happens before any statement text exists: an unknown
    /// field or an out-of-range page returns the error and nothing else.
    pub fn build(&self) -> EngineResult<BuiltQuery> {
        self.spec.page.validate()?;

        let mut query = self.select_base();
        self.apply_search(&mut query)?;
        self.apply_sorts(&mut query)?;
        self.apply_page(&mut query);

        Ok(finish(&query))
    }

    /// Build the matching COUNT query (no ordering, no pagination).
    pub fn build_count(&self) -> EngineResult<BuiltQuery> {
        let mut query = Query::select();
        query.expr(Expr::col(Asterisk).count());
        query.from(Alias::new(&self.entity.table));
        self.apply_base_filter(&mut query);
        self.apply_search(&mut query)?;

        Ok(finish(&query))
    }

    /// Build the tag-intersection SELECT: only items associated with every
    /// name in `tags`, combined with the generic search/sort/pagination.
    pub fn build_tag_intersection(&self, tags: &TagFilter) -> EngineResult<BuiltQuery> {
        self.spec.page.validate()?;

        let mut query = self.tag_intersection_select(tags)?;
        self.apply_sorts(&mut query)?;
        self.apply_page(&mut query);

        Ok(finish(&query))
    }

    /// Build the COUNT of distinct items matching a tag intersection.
    ///
    /// The grouped query has one row per qualifying item, so counting its
    /// rows from a wrapping SELECT gives the total.
    pub fn build_tag_intersection_count(&self, tags: &TagFilter) -> EngineResult<BuiltQuery> {
        let grouped = self.tag_intersection_select(tags)?;
        let (sql, values) = grouped.build(PostgresQueryBuilder);

        Ok(BuiltQuery {
            sql: format!("SELECT COUNT(*) FROM ({sql}) AS matched"),
            values,
        })
    }

    /// SELECT base.* FROM base, plus any fixed entity filter.
    fn select_base(&self) -> SelectStatement {
        let mut query = Query::select();
        query.column((Alias::new(&self.entity.table), Asterisk));
        query.from(Alias::new(&self.entity.table));
        self.apply_base_filter(&mut query);
        query
    }

    fn apply_base_filter(&self, query: &mut SelectStatement) {
        if let Some(ref filter) = self.entity.base_filter {
            query.and_where(
                Expr::col((Alias::new(&self.entity.table), Alias::new(&filter.column)))
                    .eq(filter.value.as_str()),
            );
        }
    }

    /// Add the OR-combined substring predicates.
    ///
    /// SeaQuery conjoins this group with any condition already on the
    /// statement, so a fixed entity filter stays `AND (a OR b ...)`.
    fn apply_search(&self, query: &mut SelectStatement) -> EngineResult<()> {
        if self.spec.searches.is_empty() {
            return Ok(());
        }

        let mut any = Cond::any();
        for clause in &self.spec.searches {
            let column = self.entity.resolve_field(&clause.field)?;
            let pattern = format!("%{}%", escape_like_wildcards(&clause.expression));
            any = any.add(
                Expr::col((Alias::new(&self.entity.table), Alias::new(column))).like(pattern),
            );
        }
        query.cond_where(any);

        Ok(())
    }

    /// Add ORDER BY terms in clause-list order.
    fn apply_sorts(&self, query: &mut SelectStatement) -> EngineResult<()> {
        for sort in &self.spec.sorts {
            let column = self.entity.resolve_field(&sort.field)?;
            let order = if sort.direction.is_descending() {
                Order::Desc
            } else {
                Order::Asc
            };
            query.order_by(
                (Alias::new(&self.entity.table), Alias::new(column)),
                order,
            );
        }

        Ok(())
    }

    fn apply_page(&self, query: &mut SelectStatement) {
        query.limit(self.spec.page.limit as u64);
        query.offset(self.spec.page.offset as u64);
    }

    /// The grouped intersection statement, without ordering or pagination.
    ///
    /// Restricting the join to the requested names means a group can only
    /// ever count names from the requested set; requiring the distinct
    /// count to equal the set size then admits exactly the items that
    /// matched every name. The distinct count also keeps a non-unique
    /// bridge row from being counted twice.
    fn tag_intersection_select(&self, tags: &TagFilter) -> EngineResult<SelectStatement> {
        let join = self.entity.tag_join.as_ref().ok_or_else(|| {
            anyhow::anyhow!("entity `{}` has no tag join configured", self.entity.name)
        })?;
        let table = &self.entity.table;

        let mut query = self.select_base();
        query.inner_join(
            Alias::new(&join.bridge_table),
            Expr::col((Alias::new(table), Alias::new(&self.entity.id_column)))
                .equals((Alias::new(&join.bridge_table), Alias::new(&join.item_fk))),
        );
        query.inner_join(
            Alias::new(&join.tag_table),
            Expr::col((Alias::new(&join.bridge_table), Alias::new(&join.tag_fk)))
                .equals((Alias::new(&join.tag_table), Alias::new(&join.tag_pk))),
        );
        query.and_where(
            Expr::col((Alias::new(&join.tag_table), Alias::new(&join.name_column)))
                .is_in(tags.names().iter().cloned()),
        );
        self.apply_search(&mut query)?;
        query.group_by_col((Alias::new(table), Alias::new(&self.entity.id_column)));
        query.and_having(
            Expr::expr(Func::count_distinct(Expr::col((
                Alias::new(&join.tag_table),
                Alias::new(&join.name_column),
            ))))
            .eq(tags.count() as i64),
        );

        Ok(query)
    }
}

fn finish(query: &SelectStatement) -> BuiltQuery {
    let (sql, values) = query.build(PostgresQueryBuilder);
    BuiltQuery { sql, values }
}

/// Escape SQL LIKE wildcard characters (`%`, `_`, `\`) in a value, so the
/// bound pattern matches them literally.
fn escape_like_wildcards(value: &str) -> String {
    value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
