//! Shared fixtures for integration tests

#![allow(dead_code)]

use strata::expr::{col, lit, IndexedExpr, Tuple, Value};
use strata::observability::StatsSnapshot;
use strata::storage::{Database, Storage};
use strata::{Engine, EngineConfig, Insert, StrataResult};

/// (id, name, active)
pub const USERS: [(i64, &str, bool); 10] = [
    (1, "Kathleen", false),
    (2, "Xantha", true),
    (3, "Hope", true),
    (4, "Hedley", false),
    (5, "Reese", true),
    (6, "Emi", true),
    (7, "Herrod", true),
    (8, "Quincy", true),
    (9, "Uta", false),
    (10, "Anastasia", false),
];

pub fn user(id: i64, name: &str, active: bool) -> Tuple {
    Tuple::new()
        .with("id", id)
        .with("name", name)
        .with("active", active)
}

pub fn declare_users(engine: &mut Engine) -> StrataResult<()> {
    engine.create_table("users")?;
    engine.create_index("users_idx_name", "users", vec![IndexedExpr::asc(col("name"))])?;
    engine.create_index(
        "users_idx_name_id",
        "users",
        vec![IndexedExpr::asc(col("name")), IndexedExpr::asc(col("id"))],
    )
}

/// The users table with both name indexes
pub fn users_db() -> Database {
    let mut db = Database::new();
    db.create_table("users").unwrap();
    db.create_index("users_idx_name", "users", vec![IndexedExpr::asc(col("name"))])
        .unwrap();
    db.create_index(
        "users_idx_name_id",
        "users",
        vec![IndexedExpr::asc(col("name")), IndexedExpr::asc(col("id"))],
    )
    .unwrap();
    let rows = USERS.iter().map(|(i, n, a)| user(*i, n, *a)).collect();
    db.bulk_insert("users", rows).unwrap();
    db
}

pub fn users_engine() -> Engine {
    let mut engine = Engine::new(EngineConfig::default()).unwrap();
    declare_users(&mut engine).unwrap();
    let mut insert = Insert::into_table("users");
    for (id, name, active) in USERS {
        insert = insert.row(vec![
            ("id".to_string(), lit(id)),
            ("name".to_string(), lit(name)),
            ("active".to_string(), lit(active)),
        ]);
    }
    engine.insert(&insert).unwrap();
    engine
}

pub fn snapshot(cmp: u64, index_rows: u64, table_rows: u64) -> StatsSnapshot {
    StatsSnapshot {
        index_comparisons: cmp,
        index_tuples_scanned: index_rows,
        table_tuples_scanned: table_rows,
    }
}

pub fn names(rows: &[Tuple]) -> Vec<String> {
    rows.iter()
        .filter_map(|t| t.get("name").and_then(Value::as_str).map(String::from))
        .collect()
}

pub fn ids(rows: &[Tuple]) -> Vec<i64> {
    rows.iter()
        .filter_map(|t| t.get("id").and_then(Value::as_int))
        .collect()
}
