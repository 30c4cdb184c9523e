use super::evaluation::{apply_stages, apply_update, compare_values, evaluate, matches};
use super::*;
use crate::errors::{RepositoryError, StoreError};
use crate::memory_store::MemoryStore;
use crate::traits::{Entity, StoreContext};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Item {
    id: i64,
    name: String,
    price: Option<i64>,
}

impl Entity for Item {
    type Key = i64;

    fn table_name() -> &'static str {
        "items"
    }

    fn key_field() -> &'static str {
        "id"
    }

    fn key(&self) -> i64 {
        self.id
    }

    fn columns() -> &'static [&'static str] {
        &["id", "name", "price"]
    }
}

const PROJECTION: &str = "to_jsonb(r) AS __row__";

#[test]
fn test_where_clause_numbers_parameters() {
    let filter = QueryFilter::and(vec![
        QueryFilter::eq("name", json!("alice")),
        QueryFilter::or(vec![
            QueryFilter::gt("age", json!(18)),
            QueryFilter::in_values("status", vec![json!("active"), json!("trial")]),
        ]),
    ]);

    let mut params = Vec::new();
    let sql = SqlGenerator::build_where_clause(&filter, &mut params).unwrap();

    assert_eq!(
        sql,
        "WHERE (name = $1 AND (age > $2 OR status IN ($3, $4)))"
    );
    assert_eq!(
        params,
        vec![json!("alice"), json!(18), json!("active"), json!("trial")]
    );
}

#[test]
fn test_null_and_empty_predicates() {
    let mut params = Vec::new();

    let cases = [
        (QueryFilter::eq("deleted_at", Value::Null), "deleted_at IS NULL"),
        (QueryFilter::ne("deleted_at", Value::Null), "deleted_at IS NOT NULL"),
        (QueryFilter::gt("age", Value::Null), "NULL"),
        (QueryFilter::and(vec![]), "TRUE"),
        (QueryFilter::or(vec![]), "FALSE"),
        (QueryFilter::in_values("id", vec![]), "FALSE"),
        (QueryFilter::not_in_values("id", vec![]), "TRUE"),
        (
            QueryFilter::not(QueryFilter::is_null("email")),
            "NOT (email IS NULL)",
        ),
    ];

    for (filter, expected) in cases {
        assert_eq!(
            SqlGenerator::build_filter_sql(&filter, &mut params).unwrap(),
            expected
        );
    }
    assert!(params.is_empty());
}

#[test]
fn test_invalid_field_is_rejected() {
    let mut params = Vec::new();
    let filter = QueryFilter::eq("name; DROP TABLE items", json!(1));
    assert!(matches!(
        SqlGenerator::build_filter_sql(&filter, &mut params),
        Err(StoreError::InvalidIdentifier(_))
    ));
}

#[test]
fn test_select_keeps_single_level_when_possible() {
    let query = Query::new("items")
        .filter(QueryFilter::gte("price", json!(10)))
        .order_by("name", SortDirection::Ascending)
        .skip(20)
        .take(10);

    let mut params = Vec::new();
    let sql = SqlGenerator::build_select(&query, PROJECTION, &mut params).unwrap();

    assert_eq!(
        sql,
        "SELECT to_jsonb(r) AS __row__ FROM items AS r WHERE price >= $1 ORDER BY name ASC LIMIT 10 OFFSET 20"
    );
    assert_eq!(params, vec![json!(10)]);
}

#[test]
fn test_select_nests_stages_after_paging() {
    let query = Query::new("items")
        .take(5)
        .filter(QueryFilter::gt("price", json!(1)))
        .order_by("price", SortDirection::Descending);

    let mut params = Vec::new();
    let sql = SqlGenerator::build_select(&query, "*", &mut params).unwrap();

    assert_eq!(
        sql,
        "SELECT * FROM (SELECT * FROM items AS q0 LIMIT 5) AS r WHERE price > $1 ORDER BY price DESC"
    );
}

#[test]
fn test_skip_after_take_shrinks_limit() {
    let query = Query::new("items").take(5).skip(2).take(10);
    let mut params = Vec::new();
    let sql = SqlGenerator::build_select(&query, "*", &mut params).unwrap();
    assert_eq!(sql, "SELECT * FROM items AS r LIMIT 3 OFFSET 2");
}

#[test]
fn test_set_clause_shares_parameters_with_where() {
    let update = UpdateSet::new()
        .set("name", json!("renamed"))
        .increment("price", json!(5));

    let mut params = Vec::new();
    let set = SqlGenerator::build_set_clause(&update, &mut params).unwrap();
    let filter = SqlGenerator::build_where_clause(&QueryFilter::eq("id", json!(7)), &mut params)
        .unwrap();

    assert_eq!(set, "name = $1, price = price + $2");
    assert_eq!(filter, "WHERE id = $3");
    assert_eq!(params, vec![json!("renamed"), json!(5), json!(7)]);

    assert!(SqlGenerator::build_set_clause(&UpdateSet::new(), &mut params).is_err());
}

#[test]
fn test_null_operands_are_written_inline() {
    let update = UpdateSet::new()
        .set("price", Value::Null)
        .set("name", json!("cleared"));

    let mut params = Vec::new();
    let set = SqlGenerator::build_set_clause(&update, &mut params).unwrap();
    let filter = SqlGenerator::build_where_clause(
        &QueryFilter::in_values("id", vec![json!(1), Value::Null, json!(3)]),
        &mut params,
    )
    .unwrap();

    assert_eq!(set, "price = NULL, name = $1");
    assert_eq!(filter, "WHERE id IN ($2, NULL, $3)");
    assert_eq!(params, vec![json!("cleared"), json!(1), json!(3)]);
}

#[test]
fn test_three_valued_evaluation() {
    let row = json!({ "name": "widget", "price": null });

    assert_eq!(evaluate(&QueryFilter::gt("price", json!(1)), &row), None);
    assert_eq!(
        evaluate(&QueryFilter::not(QueryFilter::gt("price", json!(1))), &row),
        None
    );
    assert_eq!(evaluate(&QueryFilter::is_null("price"), &row), Some(true));

    // unknown AND false is false, unknown OR true is true
    let and = QueryFilter::and(vec![
        QueryFilter::gt("price", json!(1)),
        QueryFilter::eq("name", json!("gadget")),
    ]);
    let or = QueryFilter::or(vec![
        QueryFilter::gt("price", json!(1)),
        QueryFilter::eq("name", json!("widget")),
    ]);
    assert_eq!(evaluate(&and, &row), Some(false));
    assert_eq!(evaluate(&or, &row), Some(true));

    assert!(!matches(&QueryFilter::ne("price", json!(3)), &row));
    assert!(matches(&QueryFilter::and(vec![]), &row));
    assert!(!matches(&QueryFilter::or(vec![]), &row));
}

#[test]
fn test_in_list_with_null_member() {
    let row = json!({ "id": 2 });

    assert!(matches(
        &QueryFilter::in_values("id", vec![json!(1), json!(2)]),
        &row
    ));
    assert_eq!(
        evaluate(
            &QueryFilter::not_in_values("id", vec![json!(1), Value::Null]),
            &row
        ),
        None
    );
    assert!(matches(&QueryFilter::not_in_values("id", vec![]), &row));
}

#[test]
fn test_like_patterns() {
    let row = json!({ "name": "Blue_Widget" });

    assert!(matches(&QueryFilter::like("name", "Blue%"), &row));
    assert!(matches(&QueryFilter::like("name", "%_Widget"), &row));
    assert!(matches(&QueryFilter::like("name", "Blue\\_%"), &row));
    assert!(!matches(&QueryFilter::like("name", "blue%"), &row));
    assert!(matches(&QueryFilter::ilike("name", "blue%"), &row));
    assert!(matches(&QueryFilter::like("name", "B___\\_Widget"), &row));
    assert!(!matches(&QueryFilter::like("name", "B__\\_Widget"), &row));
}

#[test]
fn test_numbers_compare_across_representations() {
    let row = json!({ "price": 10 });
    assert!(matches(&QueryFilter::eq("price", json!(10.0)), &row));
    assert!(matches(&QueryFilter::lt("price", json!(10.5)), &row));
    assert_eq!(evaluate(&QueryFilter::eq("price", json!("10")), &row), None);
}

#[test]
fn test_null_sorts_last() {
    assert_eq!(compare_values(&json!(1), &Value::Null), Ordering::Less);
    assert_eq!(compare_values(&Value::Null, &json!("a")), Ordering::Greater);
    assert_eq!(compare_values(&json!(2), &json!(10)), Ordering::Less);
}

#[test]
fn test_apply_stages_in_sequence() {
    let rows: Vec<Value> = (1..=6)
        .map(|id| json!({ "id": id, "group": id % 2 }))
        .collect();

    // ordering is stable: equal groups keep their incoming order
    let stages = Query::new("items")
        .order_by("group", SortDirection::Ascending)
        .skip(1)
        .take(3)
        .filter(QueryFilter::gt("id", json!(2)))
        .stages()
        .to_vec();

    let ids: Vec<i64> = apply_stages(rows, &stages)
        .iter()
        .filter_map(|row| row["id"].as_i64())
        .collect();

    assert_eq!(ids, vec![4, 6]);
}

#[test]
fn test_apply_update_arithmetic() {
    let mut row = json!({ "qty": 7, "ratio": 1.5, "note": null, "label": "a" });

    let update = UpdateSet::new()
        .divide("qty", json!(2))
        .multiply("ratio", json!(2))
        .increment("note", json!(1))
        .set("label", json!("b"));
    apply_update(&mut row, &update).unwrap();

    assert_eq!(row["qty"], json!(3));
    assert_eq!(row["ratio"], json!(3.0));
    assert_eq!(row["note"], Value::Null);
    assert_eq!(row["label"], json!("b"));

    let mut row = json!({ "qty": -7 });
    apply_update(&mut row, &UpdateSet::new().divide("qty", json!(2))).unwrap();
    assert_eq!(row["qty"], json!(-3));
}

#[test]
fn test_apply_update_failures() {
    let mut row = json!({ "qty": 7, "label": "a" });

    let cases = [
        UpdateSet::new().divide("qty", json!(0)),
        UpdateSet::new().increment("label", json!(1)),
        UpdateSet::new().set("missing", json!(1)),
        UpdateSet::new().increment("qty", json!(i64::MAX)),
    ];

    for update in cases {
        assert!(matches!(
            apply_update(&mut row, &update),
            Err(StoreError::InvalidMutation { .. })
        ));
    }
    assert_eq!(row["qty"], json!(7));
}

#[test]
fn test_update_set_replaces_same_field() {
    let update = UpdateSet::new()
        .set("price", json!(1))
        .increment("stock", json!(1))
        .set("price", json!(2));

    assert_eq!(update.len(), 2);
    let ops: Vec<_> = update.operations().collect();
    assert_eq!(ops[0], ("price", &UpdateOperation::Set(json!(2))));
    assert!(update.contains_field("stock"));
}

#[test]
fn test_builder_stage_order() {
    let context = MemoryStore::new().context();
    let table = context.set::<Item>();

    let descriptor = QueryDescriptor::new()
        .filter(QueryFilter::gt("price", json!(1)))
        .order_by("name", SortDirection::Descending)
        .page(PaginationRequest::new(2, 10))
        .track(false);

    let query = QueryBuilder::build::<Item, _>(&table, &descriptor).unwrap();

    assert_eq!(query.table(), "items");
    assert_eq!(
        query.stages(),
        &[
            QueryStage::Filter(QueryFilter::gt("price", json!(1))),
            QueryStage::OrderBy {
                key: OrderKey::new("name"),
                direction: SortDirection::Descending,
            },
            QueryStage::Skip(20),
            QueryStage::Take(10),
            QueryStage::NoTracking,
        ]
    );
    assert!(!query.is_tracking());
}

#[test]
fn test_builder_defaults_and_page_validation() {
    let context = MemoryStore::new().context();
    let table = context.set::<Item>();

    let query = QueryBuilder::build::<Item, _>(&table, &QueryDescriptor::new().track(true))
        .unwrap();
    assert!(query.stages().is_empty());
    assert!(query.is_tracking());

    for offset in [0, -5] {
        let descriptor = QueryDescriptor::new().page(PaginationRequest::new(0, offset));
        assert!(matches!(
            QueryBuilder::build::<Item, _>(&table, &descriptor),
            Err(RepositoryError::InvalidPageSize(size)) if size == offset
        ));
    }
}

#[test]
fn test_descriptor_filters_combine_with_and() {
    let descriptor = QueryDescriptor::new()
        .filter(QueryFilter::eq("a", json!(1)))
        .filter(QueryFilter::eq("b", json!(2)))
        .filter(QueryFilter::eq("c", json!(3)));

    assert_eq!(
        descriptor.predicate,
        Some(QueryFilter::and(vec![
            QueryFilter::eq("a", json!(1)),
            QueryFilter::eq("b", json!(2)),
            QueryFilter::eq("c", json!(3)),
        ]))
    );
    assert_eq!(descriptor.predicate.as_ref().unwrap().fields(), vec!["a", "b", "c"]);
}

#[test]
fn test_leading_filters_split() {
    let query = Query::new("items")
        .filter(QueryFilter::eq("a", json!(1)))
        .as_no_tracking()
        .filter(QueryFilter::eq("b", json!(2)))
        .take(3)
        .filter(QueryFilter::eq("c", json!(3)));

    let (filters, rest) = query.leading_filters();
    assert_eq!(filters.len(), 2);
    assert_eq!(rest.len(), 2);
    assert!(matches!(rest[0], QueryStage::Take(3)));
}
