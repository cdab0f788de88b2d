//! Journal Recovery Tests
//!
//! Tests for journal replay:
//! - Replaying a journal reproduces table contents and index answers
//! - Row ids survive replay, including tombstoned slots
//! - Tampered journals are rejected as corruption

mod common;

use std::fs;
use std::path::Path;

use common::{declare_users, names, snapshot, USERS};
use strata::expr::{col, eq, gt, lit, IndexedExpr};
use strata::journal::{JournalReader, MutationOp};
use strata::{Delete, Engine, EngineConfig, Insert, Query, Update};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn config(path: &Path) -> EngineConfig {
    EngineConfig::default().with_journal(path)
}

fn load_users(engine: &mut Engine) {
    let mut insert = Insert::into_table("users");
    for (id, name, active) in USERS {
        insert = insert.row(vec![
            ("id".to_string(), lit(id)),
            ("name".to_string(), lit(name)),
            ("active".to_string(), lit(active)),
        ]);
    }
    engine.insert(&insert).unwrap();
}

fn by_name(engine: &mut Engine) -> Vec<String> {
    let result = engine
        .query(&Query::new("users").order_by(IndexedExpr::asc(col("name"))))
        .unwrap();
    names(&result.tuples)
}

// =============================================================================
// Replay Tests
// =============================================================================

/// Every mutation kind is journaled and replayed.
#[test]
fn test_replay_reproduces_state() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.journal");

    let expected = {
        let mut engine = Engine::open(config(&path), declare_users).unwrap();
        load_users(&mut engine);
        engine
            .update(
                &Update::table("users")
                    .set("name", lit("Zed"))
                    .where_(eq(col("name"), lit("Emi"))),
            )
            .unwrap();
        engine
            .delete(&Delete::from_table("users").where_(gt(col("name"), lit("Reese"))))
            .unwrap();
        engine.flush().unwrap();
        by_name(&mut engine)
    };

    let records = JournalReader::read_all(&path).unwrap();
    // the renamed Zed falls in the deleted range along with Uta and Xantha
    assert_eq!(records.len(), 10 + 1 + 3);
    assert_eq!(records[10].op, MutationOp::Update);
    assert!(records[11..].iter().all(|r| r.op == MutationOp::Delete));
    assert_eq!(records[13].op, MutationOp::Delete);

    let mut engine = Engine::open(config(&path), declare_users).unwrap();
    assert_eq!(by_name(&mut engine), expected);

    // rebuilt indexes answer with the same work as live ones
    let result = engine
        .query(&Query::new("users").where_(eq(col("name"), lit("Zed"))))
        .unwrap();
    assert_eq!(names(&result.tuples), vec!["Zed"]);
    assert_eq!(result.stats.index_tuples_scanned, 1);
    assert_eq!(result.stats.table_tuples_scanned, 0);
}

/// Replayed rows keep their ids, so new inserts never reuse a slot.
#[test]
fn test_row_ids_continue_after_replay() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.journal");

    {
        let mut engine = Engine::open(config(&path), declare_users).unwrap();
        load_users(&mut engine);
        engine
            .delete(&Delete::from_table("users").where_(eq(col("name"), lit("Anastasia"))))
            .unwrap();
    }

    let mut engine = Engine::open(config(&path), declare_users).unwrap();
    let table = engine.database().table("users").unwrap();
    assert_eq!(table.len(), 10);
    assert_eq!(table.live_count(), 9);
    assert_eq!(table.next_row_id(), 10);

    engine
        .insert(&Insert::into_table("users").row(vec![
            ("id".to_string(), lit(11)),
            ("name".to_string(), lit("Yara")),
            ("active".to_string(), lit(true)),
        ]))
        .unwrap();
    let result = engine
        .query(&Query::new("users").select("count", strata::expr::count()))
        .unwrap();
    assert_eq!(result.column("count"), vec![strata::Value::Int(10)]);
    assert_eq!(result.stats, snapshot(0, 0, 10));
}

/// Without a journal path nothing is written or replayed.
#[test]
fn test_no_journal() {
    let mut engine = Engine::open(EngineConfig::default(), declare_users).unwrap();
    load_users(&mut engine);
    assert_eq!(engine.recover().unwrap(), 0);
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_tampered_record_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.journal");

    {
        let mut engine = Engine::open(config(&path), declare_users).unwrap();
        load_users(&mut engine);
        engine.flush().unwrap();
    }

    let content = fs::read_to_string(&path).unwrap();
    fs::write(&path, content.replacen("Quincy", "Quincx", 1)).unwrap();

    let err = Engine::open(config(&path), declare_users).unwrap_err();
    assert_eq!(err.code(), "STRATA_JOURNAL_CORRUPTION");
    assert!(err.is_fatal());
}

#[test]
fn test_missing_line_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("users.journal");

    {
        let mut engine = Engine::open(config(&path), declare_users).unwrap();
        load_users(&mut engine);
        engine.flush().unwrap();
    }

    let content = fs::read_to_string(&path).unwrap();
    let kept: Vec<&str> = content
        .lines()
        .enumerate()
        .filter(|(i, _)| *i != 4)
        .map(|(_, line)| line)
        .collect();
    fs::write(&path, kept.join("\n")).unwrap();

    let err = JournalReader::read_all(&path).unwrap_err();
    assert_eq!(err.line(), Some(5));
}
