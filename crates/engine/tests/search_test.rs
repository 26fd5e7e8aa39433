#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Search engine integration tests.
//!
//! Exercises the public surface end to end: criteria normalization,
//! whitelist validation, statement construction, the tag-intersection
//! search, and the service's validate-before-execute ordering.

use cerca_engine::EngineError;
use cerca_engine::models::CatalogItem;
use cerca_engine::search::{
    Direction, MAX_LIMIT, Page, QuerySpec, SearchClause, SearchQueryBuilder, SearchResult,
    SearchService, TagFilter,
};
use cerca_test_utils::{csv, test_item};
use sea_query::Value;
use sqlx::PgPool;

fn bound_strings(values: &sea_query::Values) -> Vec<String> {
    values
        .iter()
        .filter_map(|v| match v {
            Value::String(Some(s)) => Some(s.as_ref().clone()),
            _ => None,
        })
        .collect()
}

// -------------------------------------------------------------------------
// Criteria normalization
// -------------------------------------------------------------------------

#[test]
fn parallel_lists_normalize_with_defaults_and_drops() {
    let spec = QuerySpec::from_parallel_lists(
        &csv("price,name"),
        &csv("desc"),
        &csv("name,description"),
        &csv("holiday"),
    );

    // Second sort field has no direction and defaults to ascending.
    assert_eq!(spec.sorts.len(), 2);
    assert!(spec.sorts[0].direction.is_descending());
    assert_eq!(spec.sorts[1].direction, Direction::Ascending);

    // Second search field has no expression and is dropped.
    assert_eq!(spec.searches.len(), 1);
    assert_eq!(spec.searches[0].field, "name");
}

#[test]
fn absent_lists_mean_no_criteria() {
    let spec = QuerySpec::from_parallel_lists(&[], &[], &[], &[]);
    let built = SearchQueryBuilder::new(&CatalogItem::entity_def(), &spec)
        .build()
        .unwrap();

    assert!(!built.sql.contains("WHERE"));
    assert!(!built.sql.contains("ORDER BY"));
}

// -------------------------------------------------------------------------
// Whitelist validation
// -------------------------------------------------------------------------

#[test]
fn unknown_field_fails_before_any_query_exists() {
    let entity = CatalogItem::entity_def();
    let spec = QuerySpec {
        searches: vec![SearchClause::new("owner", "bob")],
        ..Default::default()
    };

    let err = SearchQueryBuilder::new(&entity, &spec).build().unwrap_err();
    assert!(matches!(err, EngineError::UnknownField { ref field, .. } if field == "owner"));
    assert!(err.is_caller_error());
}

#[test]
fn internal_column_names_are_not_externally_addressable() {
    let entity = CatalogItem::entity_def();

    // Callers say "price" and "duration"; the storage names are private.
    assert_eq!(entity.resolve_field("price").unwrap(), "price_cents");
    assert!(entity.resolve_field("price_cents").is_err());
    assert!(entity.resolve_field("duration_days").is_err());
}

#[test]
fn hostile_field_name_is_rejected_by_the_whitelist() {
    let entity = CatalogItem::entity_def();
    let spec = QuerySpec::from_parallel_lists(&csv("name; DROP TABLE catalog_item;--"), &[], &[], &[]);

    let err = SearchQueryBuilder::new(&entity, &spec).build().unwrap_err();
    assert!(matches!(err, EngineError::UnknownField { .. }));
}

// -------------------------------------------------------------------------
// Statement construction
// -------------------------------------------------------------------------

#[test]
fn search_clauses_match_any_not_all() {
    let entity = CatalogItem::entity_def();
    let spec = QuerySpec {
        searches: vec![
            SearchClause::new("name", "a"),
            SearchClause::new("description", "b"),
        ],
        ..Default::default()
    };
    let built = SearchQueryBuilder::new(&entity, &spec).build().unwrap();

    assert!(
        built.sql.contains("LIKE $1 OR"),
        "predicates must OR together: {}",
        built.sql
    );
    assert!(!built.sql.contains("LIKE $1 AND"), "{}", built.sql);
    assert_eq!(bound_strings(&built.values), vec!["%a%", "%b%"]);
}

#[test]
fn sort_terms_render_in_clause_order() {
    let entity = CatalogItem::entity_def();
    let spec = QuerySpec::from_parallel_lists(&csv("price,name"), &csv("desc,asc"), &[], &[]);
    let built = SearchQueryBuilder::new(&entity, &spec).build().unwrap();

    assert!(
        built.sql.contains(
            "ORDER BY \"catalog_item\".\"price_cents\" DESC, \"catalog_item\".\"name\" ASC"
        ),
        "{}",
        built.sql
    );
}

#[test]
fn hostile_expression_stays_a_bound_literal() {
    let entity = CatalogItem::entity_def();
    let spec = QuerySpec {
        searches: vec![SearchClause::new("name", "' OR '1'='1")],
        ..Default::default()
    };
    let built = SearchQueryBuilder::new(&entity, &spec).build().unwrap();

    assert!(!built.sql.contains("1'='1"), "{}", built.sql);
    assert_eq!(bound_strings(&built.values), vec!["%' OR '1'='1%"]);
}

#[test]
fn construction_is_idempotent() {
    let entity = CatalogItem::entity_def();
    let spec = QuerySpec::from_parallel_lists(&csv("price"), &csv("desc"), &csv("name"), &csv("a"));
    let builder = SearchQueryBuilder::new(&entity, &spec);

    let first = builder.build().unwrap();
    let second = builder.build().unwrap();
    assert_eq!(first.sql, second.sql);
    assert_eq!(first.values, second.values);
}

// -------------------------------------------------------------------------
// Tag intersection
// -------------------------------------------------------------------------

#[test]
fn tag_intersection_requires_every_requested_name() {
    let entity = CatalogItem::entity_def();
    let spec = QuerySpec::default();
    let tags = TagFilter::new(csv("sale,electronics")).unwrap();
    let built = SearchQueryBuilder::new(&entity, &spec)
        .build_tag_intersection(&tags)
        .unwrap();

    // The join only sees rows for the requested names, so an item tagged
    // with just "sale" can never reach a distinct count of two, while an
    // item also tagged outside the set gains nothing from it.
    assert!(built.sql.contains("\"tag\".\"name\" IN ($1, $2)"), "{}", built.sql);
    assert!(built.sql.contains("GROUP BY \"catalog_item\".\"id\""), "{}", built.sql);
    assert!(
        built.sql.contains("HAVING COUNT(DISTINCT \"tag\".\"name\") = $3"),
        "{}",
        built.sql
    );
    assert_eq!(bound_strings(&built.values), vec!["sale", "electronics"]);

    let required = built.values.iter().find_map(|v| match v {
        Value::BigInt(Some(n)) => Some(*n),
        _ => None,
    });
    assert_eq!(required, Some(2));
}

#[test]
fn duplicate_tag_names_build_the_same_query() {
    let entity = CatalogItem::entity_def();
    let spec = QuerySpec::default();

    let duplicated = TagFilter::new(csv("sale,sale")).unwrap();
    let single = TagFilter::new(csv("sale")).unwrap();

    let builder = SearchQueryBuilder::new(&entity, &spec);
    let a = builder.build_tag_intersection(&duplicated).unwrap();
    let b = builder.build_tag_intersection(&single).unwrap();

    assert_eq!(a.sql, b.sql);
    assert_eq!(a.values, b.values);
}

#[test]
fn empty_tag_set_is_an_error() {
    let err = TagFilter::new(Vec::<String>::new()).unwrap_err();
    assert!(matches!(err, EngineError::EmptyTagSet));
    assert!(err.is_caller_error());
}

#[test]
fn tag_intersection_composes_with_search_and_sort() {
    let entity = CatalogItem::entity_def();
    let spec = QuerySpec::from_parallel_lists(&csv("price"), &csv("desc"), &csv("name"), &csv("holiday"));
    let tags = TagFilter::new(csv("sale")).unwrap();
    let built = SearchQueryBuilder::new(&entity, &spec)
        .build_tag_intersection(&tags)
        .unwrap();

    assert!(built.sql.contains("LIKE $2"), "{}", built.sql);
    assert!(
        built.sql.contains("ORDER BY \"catalog_item\".\"price_cents\" DESC"),
        "{}",
        built.sql
    );
    assert_eq!(bound_strings(&built.values), vec!["sale", "%holiday%"]);
}

// -------------------------------------------------------------------------
// Pagination
// -------------------------------------------------------------------------

#[test]
fn page_bounds_are_enforced() {
    assert!(matches!(
        Page::new(-1, 10),
        Err(EngineError::InvalidRange { offset: -1, .. })
    ));
    assert!(matches!(
        Page::new(0, MAX_LIMIT + 1),
        Err(EngineError::InvalidRange { limit: 1001, .. })
    ));
    assert!(Page::new(0, MAX_LIMIT).is_ok());
}

#[test]
fn zero_limit_is_a_valid_empty_page() {
    let entity = CatalogItem::entity_def();
    let spec = QuerySpec::default().with_page(Page::new(0, 0).unwrap());
    let built = SearchQueryBuilder::new(&entity, &spec).build().unwrap();

    let page: Vec<u64> = built
        .values
        .iter()
        .filter_map(|v| match v {
            Value::BigUnsigned(Some(n)) => Some(*n),
            _ => None,
        })
        .collect();
    assert_eq!(page, vec![0, 0], "LIMIT 0 must bind, not drop: {}", built.sql);
}

// -------------------------------------------------------------------------
// Service ordering and results
// -------------------------------------------------------------------------

// connect_lazy never opens a connection, so anything that errors here did
// so before reaching the store.
fn lazy_service() -> SearchService {
    let pool = PgPool::connect_lazy("postgres://localhost/unreachable").unwrap();
    SearchService::new(pool, [CatalogItem::entity_def()])
}

#[tokio::test]
async fn validation_failures_never_reach_the_store() {
    let service = lazy_service();

    let spec = QuerySpec::from_parallel_lists(&[], &[], &csv("owner"), &csv("bob"));
    let err = service.find("item", &spec).await.unwrap_err();
    assert!(matches!(err, EngineError::UnknownField { .. }));

    let spec = QuerySpec::default().with_page(Page {
        offset: -1,
        limit: 10,
    });
    let tags = TagFilter::new(csv("sale")).unwrap();
    let err = service.find_by_tags("item", &tags, &spec).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidRange { .. }));

    let err = service
        .find("voucher", &QuerySpec::default())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::UnknownEntity(_)));
}

#[test]
fn search_result_round_trips_with_paging_metadata() {
    let rows = vec![
        test_item("Spa day").with_price(14900).to_row(),
        test_item("Gift card").with_duration(365).to_row(),
    ];
    let result = SearchResult::new(rows, 12, Page::new(0, 2).unwrap());

    let json = serde_json::to_string(&result).unwrap();
    let parsed: SearchResult = serde_json::from_str(&json).unwrap();

    assert_eq!(parsed.total, 12);
    assert_eq!(parsed.items.len(), 2);
    assert_eq!(parsed.items[0]["name"], "Spa day");
    assert!(parsed.has_more());
}
