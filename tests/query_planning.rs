//! Query Planning Tests
//!
//! End-to-end statements through the engine facade:
//! - Access path choice and plan shape
//! - Exact work counters for planned queries
//! - Aggregates, grouping and mutations

mod common;

use common::{ids, names, snapshot, users_engine};
use strata::expr::{
    avg, col, count, eq, gt, in_list, lit, lt, max, neq, sum, IndexedExpr, Tuple, Value,
};
use strata::planner::PlannerErrorCode;
use strata::{Delete, Query, StrataError, Update};

// =============================================================================
// Access Path Tests
// =============================================================================

/// Equality on an indexed column reads one row through the index.
#[test]
fn test_equality_uses_index() {
    let mut engine = users_engine();
    let query = Query::new("users")
        .select_column("id")
        .where_(eq(col("name"), lit("Quincy")));

    assert_eq!(
        engine.explain(&query).unwrap().kinds(),
        vec!["Project", "IndexScan"]
    );
    let result = engine.query(&query).unwrap();
    assert_eq!(result.column("id"), vec![Value::Int(8)]);
    assert_eq!(result.stats, snapshot(3, 1, 0));
}

/// Unindexed predicates fall back to a filtered table scan.
#[test]
fn test_unindexed_predicate_scans_table() {
    let mut engine = users_engine();
    let query = Query::new("users")
        .where_(eq(col("id"), lit(8)))
        .limit(1);

    assert_eq!(
        engine.explain(&query).unwrap().kinds(),
        vec!["Limit", "Filter", "TableScan"]
    );
    let result = engine.query(&query).unwrap();
    assert_eq!(names(&result.tuples), vec!["Quincy"]);
    assert_eq!(result.stats, snapshot(0, 0, 8));
}

/// Ordering by an indexed column needs no sort and honors the limit lazily.
#[test]
fn test_order_by_index() {
    let mut engine = users_engine();
    let query = Query::new("users")
        .order_by(IndexedExpr::asc(col("name")))
        .limit(5);

    let result = engine.query(&query).unwrap();
    assert_eq!(
        names(&result.tuples),
        vec!["Anastasia", "Emi", "Hedley", "Herrod", "Hope"]
    );
    assert_eq!(result.stats, snapshot(6, 5, 0));
}

/// A reverse-order match scans backwards and rechecks the predicate.
#[test]
fn test_descending_order_with_recheck() {
    let mut engine = users_engine();
    let query = Query::new("users")
        .where_(gt(col("name"), lit("Kathleen")))
        .order_by(IndexedExpr::desc(col("name")))
        .limit(4);

    let plan = engine.explain(&query).unwrap();
    assert_eq!(plan.kinds(), vec!["Limit", "Filter", "IndexScan"]);
    assert_eq!(plan.children[0].children[0].params["direction"], "desc");

    let result = engine.query(&query).unwrap();
    assert_eq!(names(&result.tuples), vec!["Xantha", "Uta", "Reese", "Quincy"]);
    assert_eq!(result.stats, snapshot(5, 4, 0));
}

/// A range on the index plus an unindexed predicate sorts after filtering.
#[test]
fn test_range_with_recheck_and_sort() {
    let mut engine = users_engine();
    let query = Query::new("users")
        .where_(gt(col("name"), lit("Herrod")))
        .where_(neq(col("id"), lit(3)))
        .order_by(IndexedExpr::asc(col("id")));

    assert_eq!(
        engine.explain(&query).unwrap().kinds(),
        vec!["Sort", "Filter", "IndexScan"]
    );
    let result = engine.query(&query).unwrap();
    assert_eq!(ids(&result.tuples), vec![1, 2, 5, 8, 9]);
    assert_eq!(result.stats, snapshot(8, 6, 0));
}

#[test]
fn test_in_list() {
    let mut engine = users_engine();
    let query = Query::new("users").where_(in_list(
        col("name"),
        vec![lit("Hedley"), lit("Hope"), lit("Kathleen"), lit("Xantha")],
    ));
    let result = engine.query(&query).unwrap();
    assert_eq!(names(&result.tuples), vec!["Hedley", "Hope", "Kathleen", "Xantha"]);
    assert_eq!(result.stats, snapshot(9, 4, 0));
}

/// The first candidate wins even when a later one would need no recheck.
#[test]
fn test_first_candidate_wins() {
    let mut engine = users_engine();
    let query = Query::new("users")
        .where_(eq(col("name"), lit("Hope")))
        .where_(gt(col("id"), lit(2)));

    let plan = engine.explain(&query).unwrap();
    assert_eq!(plan.kinds(), vec!["Filter", "IndexScan"]);
    assert_eq!(plan.children[0].params["index"], "users_idx_name");

    let result = engine.query(&query).unwrap();
    assert_eq!(ids(&result.tuples), vec![3]);
}

#[test]
fn test_notablescan_option() {
    let mut engine = users_engine();
    let err = engine
        .query(&Query::new("users").where_(lt(col("id"), lit(3))).notablescan(true))
        .unwrap_err();
    match err {
        StrataError::Planner(e) => {
            assert_eq!(e.code(), PlannerErrorCode::StrataPlannerTableScanForbidden)
        }
        other => panic!("unexpected error {}", other),
    }

    // an indexed query is still allowed
    let ok = engine.query(
        &Query::new("users")
            .where_(eq(col("name"), lit("Emi")))
            .notablescan(true),
    );
    assert_eq!(ok.unwrap().len(), 1);
}

// =============================================================================
// Aggregate Tests
// =============================================================================

#[test]
fn test_count_over_table_scan() {
    let mut engine = users_engine();
    let result = engine
        .query(&Query::new("users").select("count", count()))
        .unwrap();
    assert_eq!(result.tuples, vec![Tuple::new().with("count", 10)]);
    assert_eq!(result.stats, snapshot(0, 0, 10));
}

/// Counting an indexed equality never fetches a row.
#[test]
fn test_count_from_index_entries() {
    let mut engine = users_engine();
    let query = Query::new("users")
        .select("count", count())
        .where_(eq(col("name"), lit("Hope")));

    assert_eq!(
        engine.explain(&query).unwrap().kinds(),
        vec!["Aggregate", "IndexOnlyScan"]
    );
    let result = engine.query(&query).unwrap();
    assert_eq!(result.tuples, vec![Tuple::new().with("count", 1)]);
    assert_eq!(result.stats, snapshot(3, 0, 0));
}

#[test]
fn test_aggregate_functions() {
    let mut engine = users_engine();
    let result = engine
        .query(
            &Query::new("users")
                .select("total", sum(col("id")))
                .select("mean", avg(col("id")))
                .select("last", max(col("name"))),
        )
        .unwrap();
    assert_eq!(
        result.tuples,
        vec![Tuple::new()
            .with("total", 55)
            .with("mean", 5)
            .with("last", "Xantha")]
    );
}

#[test]
fn test_group_by() {
    let mut engine = users_engine();
    let result = engine
        .query(
            &Query::new("users")
                .select_column("active")
                .select("count", count())
                .group_by(col("active")),
        )
        .unwrap();
    assert_eq!(
        result.tuples,
        vec![
            Tuple::new().with("active", false).with("count", 4),
            Tuple::new().with("active", true).with("count", 6),
        ]
    );
}

#[test]
fn test_ungrouped_column_rejected() {
    let mut engine = users_engine();
    let err = engine
        .query(
            &Query::new("users")
                .select_column("name")
                .select("count", count())
                .group_by(col("active")),
        )
        .unwrap_err();
    assert_eq!(err.code(), "STRATA_PLANNER_QUERY_INVALID");
}

// =============================================================================
// Mutation Tests
// =============================================================================

#[test]
fn test_update_through_index() {
    let mut engine = users_engine();
    let result = engine
        .update(
            &Update::table("users")
                .set("active", lit(false))
                .where_(eq(col("name"), lit("Hope"))),
        )
        .unwrap();
    assert_eq!(result.affected(), Some(1));

    let inactive = engine
        .query(
            &Query::new("users")
                .select("count", count())
                .where_(eq(col("active"), lit(false))),
        )
        .unwrap();
    assert_eq!(inactive.column("count"), vec![Value::Int(5)]);
}

/// Renaming moves the row within the index.
#[test]
fn test_update_indexed_column() {
    let mut engine = users_engine();
    engine
        .update(
            &Update::table("users")
                .set("name", lit("Zed"))
                .where_(eq(col("id"), lit(6))),
        )
        .unwrap();

    let result = engine
        .query(&Query::new("users").order_by(IndexedExpr::desc(col("name"))).limit(1))
        .unwrap();
    assert_eq!(ids(&result.tuples), vec![6]);
}

#[test]
fn test_delete_range() {
    let mut engine = users_engine();
    let result = engine
        .delete(&Delete::from_table("users").where_(gt(col("name"), lit("Reese"))))
        .unwrap();
    assert_eq!(result.affected(), Some(2));
    assert_eq!(result.stats, snapshot(4, 2, 0));

    let rest = engine.query(&Query::new("users")).unwrap();
    assert_eq!(rest.len(), 8);
    assert!(!names(&rest.tuples).contains(&"Uta".to_string()));
}

// =============================================================================
// Explain Tests
// =============================================================================

#[test]
fn test_explain_option_returns_text() {
    let mut engine = users_engine();
    let result = engine
        .query(
            &Query::new("users")
                .where_(eq(col("name"), lit("Quincy")))
                .explain(),
        )
        .unwrap();
    assert_eq!(result.len(), 1);
    let text = result.column("explain");
    assert_eq!(
        text,
        vec![Value::from(
            "IndexScan (direction=asc, index=users_idx_name, sargs={eq: ['Quincy']}, table=users)\n"
        )]
    );
    // nothing ran
    assert_eq!(result.stats, snapshot(0, 0, 0));
}
