//! Engine facade
//!
//! Owns the configuration and the in-memory database, and runs statements
//! end to end: plan, execute, report stats. One [`ExecutionContext`] is
//! created per call so stats never leak between statements.
//!
//! # Startup
//!
//! 1. [`Engine::new`] validates config, sets the log level, opens the journal
//! 2. The caller declares tables and indexes
//! 3. [`Engine::recover`] replays the journal into that schema
//!
//! [`Engine::open`] runs all three.

use crate::config::EngineConfig;
use crate::error::StrataResult;
use crate::executor::{ExecutionContext, ExecutionResult, ExplainNode, PlanNode};
use crate::expr::IndexedExpr;
use crate::journal::{FileJournal, JournalReader};
use crate::observability::{log_event, log_event_with_fields, Event, Logger};
use crate::planner::{Delete, Insert, Query, QueryPlanner, Statement, Update};
use crate::storage::{Database, IndexCatalog, IndexDef};

/// Embeddable query engine
#[derive(Debug)]
pub struct Engine {
    config: EngineConfig,
    db: Database,
}

impl Engine {
    /// Creates an engine with an empty schema
    ///
    /// With `journal_path` set, mutations are journaled to that file from
    /// now on; existing records are only applied by [`Engine::recover`].
    pub fn new(config: EngineConfig) -> StrataResult<Self> {
        config.validate()?;
        Logger::set_level(config.log_severity()?);

        let db = match &config.journal_path {
            Some(path) => Database::with_journal(Box::new(FileJournal::open(
                path,
                config.journal_sync,
            )?)),
            None => Database::new(),
        };

        let journal = config
            .journal_path
            .as_ref()
            .map_or_else(|| "none".to_string(), |p| p.display().to_string());
        log_event_with_fields(Event::EngineOpen, &[("journal", &journal)]);

        Ok(Self { config, db })
    }

    /// Creates an engine, declares its schema, then replays the journal
    pub fn open<F>(config: EngineConfig, schema: F) -> StrataResult<Self>
    where
        F: FnOnce(&mut Engine) -> StrataResult<()>,
    {
        let mut engine = Self::new(config)?;
        schema(&mut engine)?;
        engine.recover()?;
        Ok(engine)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub fn create_table(&mut self, name: &str) -> StrataResult<()> {
        Ok(self.db.create_table(name)?)
    }

    pub fn create_index(
        &mut self,
        name: &str,
        table: &str,
        exprs: Vec<IndexedExpr>,
    ) -> StrataResult<()> {
        Ok(self.db.create_index(name, table, exprs)?)
    }

    /// Indexes of a table in declaration order
    pub fn indexes(&self, table: &str) -> Vec<IndexDef> {
        self.db.indexes_for(table)
    }

    /// Replays the configured journal file; returns records applied
    ///
    /// Indexes are rebuilt from the recovered slots afterwards.
    pub fn recover(&mut self) -> StrataResult<usize> {
        let Some(path) = self.config.journal_path.clone() else {
            return Ok(0);
        };

        let path_str = path.display().to_string();
        log_event_with_fields(Event::JournalReplayBegin, &[("path", &path_str)]);

        let records = JournalReader::read_all(&path)?;
        let applied = self.db.recover(records)?;
        for table in self.db.table_names() {
            self.db.reindex(&table)?;
        }

        log_event_with_fields(
            Event::JournalReplayComplete,
            &[("path", &path_str), ("records", &applied.to_string())],
        );
        Ok(applied)
    }

    /// Plans a statement with the configured `notablescan` default
    pub fn plan(&self, statement: &Statement) -> StrataResult<PlanNode> {
        Ok(QueryPlanner::new(&self.db)
            .with_notablescan(self.config.notablescan)
            .plan(statement)?)
    }

    pub fn execute(&mut self, statement: &Statement) -> StrataResult<ExecutionResult> {
        let plan = self.plan(statement)?;
        // the planner already applied the table scan guard
        self.run(&plan, false)
    }

    /// Runs a hand-built plan
    ///
    /// Table scans in it are refused when `notablescan` is configured.
    pub fn execute_plan(&mut self, plan: &PlanNode) -> StrataResult<ExecutionResult> {
        self.run(plan, self.config.notablescan)
    }

    fn run(&mut self, plan: &PlanNode, notablescan: bool) -> StrataResult<ExecutionResult> {
        let ctx = ExecutionContext::new().with_notablescan(notablescan);
        let tuples = plan.execute(&mut self.db, &ctx)?;
        let result = ExecutionResult::new(tuples, ctx.stats().snapshot());

        log_event_with_fields(
            Event::QueryExecuted,
            &[
                ("plan", plan.kind()),
                ("rows", &result.len().to_string()),
                ("stats", &result.stats.to_json()),
            ],
        );
        Ok(result)
    }

    pub fn query(&mut self, query: &Query) -> StrataResult<ExecutionResult> {
        self.execute(&Statement::Select(query.clone()))
    }

    pub fn insert(&mut self, insert: &Insert) -> StrataResult<ExecutionResult> {
        self.execute(&Statement::Insert(insert.clone()))
    }

    pub fn update(&mut self, update: &Update) -> StrataResult<ExecutionResult> {
        self.execute(&Statement::Update(update.clone()))
    }

    pub fn delete(&mut self, delete: &Delete) -> StrataResult<ExecutionResult> {
        self.execute(&Statement::Delete(delete.clone()))
    }

    /// Describes the plan for a query without running it
    pub fn explain(&self, query: &Query) -> StrataResult<ExplainNode> {
        let mut query = query.clone();
        query.options.explain = false;
        Ok(self.plan(&Statement::Select(query))?.explain())
    }

    /// Flushes the journal sink
    pub fn flush(&self) -> StrataResult<()> {
        self.db.flush_journal()?;
        log_event(Event::JournalFlushed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{col, eq, gt, lit, Value};
    use crate::planner::PlannerErrorCode;
    use crate::StrataError;
    use tempfile::TempDir;

    fn row(id: i64, name: &str) -> Vec<(String, crate::expr::Expr)> {
        vec![("id".to_string(), lit(id)), ("name".to_string(), lit(name))]
    }

    fn schema(engine: &mut Engine) -> StrataResult<()> {
        engine.create_table("users")?;
        engine.create_index("users_idx_name", "users", vec![IndexedExpr::asc(col("name"))])
    }

    #[test]
    fn test_insert_and_query() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        schema(&mut engine).unwrap();

        let inserted = engine
            .insert(&Insert::into_table("users").row(row(1, "Emi")).row(row(2, "Uta")))
            .unwrap();
        assert_eq!(inserted.affected(), Some(2));

        let result = engine
            .query(&Query::new("users").select_column("id").where_(eq(col("name"), lit("Uta"))))
            .unwrap();
        assert_eq!(result.column("id"), vec![Value::Int(2)]);
        assert_eq!(result.stats.index_tuples_scanned, 1);
        assert_eq!(result.stats.table_tuples_scanned, 0);
    }

    #[test]
    fn test_stats_reported_as_json() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        schema(&mut engine).unwrap();
        engine
            .insert(&Insert::into_table("users").row(row(1, "Emi")).row(row(2, "Uta")))
            .unwrap();

        let result = engine.query(&Query::new("users")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&result.stats.to_json()).unwrap();
        assert_eq!(parsed["table_tuples_scanned"], 2);
        assert_eq!(parsed["index_comparisons"], 0);
    }

    #[test]
    fn test_config_notablescan_default() {
        let mut engine = Engine::new(EngineConfig::default().with_notablescan(true)).unwrap();
        schema(&mut engine).unwrap();

        let err = engine
            .query(&Query::new("users").where_(gt(col("id"), lit(0))))
            .unwrap_err();
        match err {
            StrataError::Planner(e) => {
                assert_eq!(e.code(), PlannerErrorCode::StrataPlannerTableScanForbidden)
            }
            other => panic!("unexpected error {}", other),
        }

        assert!(engine
            .query(&Query::new("users").notablescan(false))
            .is_ok());
    }

    #[test]
    fn test_hand_built_plan_honors_notablescan() {
        let mut engine = Engine::new(EngineConfig::default().with_notablescan(true)).unwrap();
        schema(&mut engine).unwrap();
        let err = engine
            .execute_plan(&PlanNode::table_scan("users"))
            .unwrap_err();
        assert_eq!(err.code(), "STRATA_EXECUTOR_TABLE_SCAN_FORBIDDEN");
    }

    #[test]
    fn test_explain_does_not_execute() {
        let mut engine = Engine::new(EngineConfig::default()).unwrap();
        schema(&mut engine).unwrap();
        let node = engine
            .explain(&Query::new("users").where_(eq(col("name"), lit("Emi"))))
            .unwrap();
        assert_eq!(node.kinds(), vec!["IndexScan"]);
    }

    #[test]
    fn test_journal_recovery() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig::default().with_journal(dir.path().join("strata.journal"));

        {
            let mut engine = Engine::open(config.clone(), schema).unwrap();
            engine
                .insert(&Insert::into_table("users").row(row(1, "Emi")).row(row(2, "Uta")))
                .unwrap();
            engine
                .update(&Update::table("users").set("name", lit("Hope")).where_(eq(col("id"), lit(1))))
                .unwrap();
            engine
                .delete(&Delete::from_table("users").where_(eq(col("id"), lit(2))))
                .unwrap();
            engine.flush().unwrap();
        }

        let mut engine = Engine::open(config, schema).unwrap();
        let result = engine
            .query(&Query::new("users").select_column("name").where_(eq(col("name"), lit("Hope"))))
            .unwrap();
        assert_eq!(result.column("name"), vec![Value::from("Hope")]);

        let all = engine.query(&Query::new("users")).unwrap();
        assert_eq!(all.len(), 1);
    }
}
