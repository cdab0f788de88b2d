//! Query planner
//!
//! Turns statements into executor plan trees. Access path selection takes
//! the first candidate the index matcher proposes; with none, the planner
//! falls back to a table scan unless `notablescan` forbids it.
//!
//! Plan shape for selects, bottom-up:
//!
//! - IndexScan, Filter only when the candidate needs a recheck, Sort only
//!   when the scan is not already ordered
//! - or TableScan, Filter, Sort
//! - then Limit, then Project or an aggregation node
//! - wrapped in Explain when requested

use crate::executor::{AggregateSpec, PlanNode};
use crate::expr::{col, AggregateFunction, Expr};
use crate::observability::{log_event_with_fields, Event};
use crate::storage::IndexCatalog;

use super::ast::{Delete, Insert, Query, QueryOptions, Statement, Update};
use super::errors::{PlannerError, PlannerResult};
use super::matcher::{Candidate, IndexMatcher};

/// Plans statements against a catalog
pub struct QueryPlanner<'a, C: IndexCatalog + ?Sized> {
    catalog: &'a C,
    notablescan: bool,
}

impl<'a, C: IndexCatalog + ?Sized> QueryPlanner<'a, C> {
    /// Creates a planner that allows table scans by default
    pub fn new(catalog: &'a C) -> Self {
        Self {
            catalog,
            notablescan: false,
        }
    }

    /// Sets the default used when a statement does not say
    pub fn with_notablescan(mut self, notablescan: bool) -> Self {
        self.notablescan = notablescan;
        self
    }

    pub fn plan(&self, statement: &Statement) -> PlannerResult<PlanNode> {
        match statement {
            Statement::Select(q) => self.plan_select(q),
            Statement::Insert(i) => self.plan_insert(i),
            Statement::Update(u) => self.plan_update(u),
            Statement::Delete(d) => self.plan_delete(d),
        }
    }

    /// Access path candidates for a table, in matcher order
    pub fn candidates(&self, query: &Query) -> Vec<Candidate> {
        match &query.from {
            Some(table) => IndexMatcher::new(&query.where_, &query.order_by)
                .match_all(&self.catalog.indexes_for(table)),
            None => Vec::new(),
        }
    }

    pub fn plan_select(&self, query: &Query) -> PlannerResult<PlanNode> {
        validate_select(query)?;

        let table = match &query.from {
            Some(table) => {
                self.check_table(table)?;
                Some(table.as_str())
            }
            None => None,
        };

        let candidates = self.candidates(query);

        let plan = match (table, self.count_fast_path(query, &candidates)) {
            (Some(table), Some(plan)) => {
                log_planned(table, "index-only");
                plan
            }
            (Some(table), None) => {
                let mut plan = match candidates.first() {
                    Some(candidate) => {
                        log_planned(table, &candidate.index);
                        let plan = index_plan(table, candidate, &query.where_);
                        if !candidate.sorted && !query.order_by.is_empty() {
                            plan.sort(query.order_by.clone())
                        } else {
                            plan
                        }
                    }
                    None => {
                        self.guard_table_scan(table, &query.options)?;
                        log_planned(table, "table-scan");
                        let plan = filtered(PlanNode::table_scan(table), &query.where_);
                        if query.order_by.is_empty() {
                            plan
                        } else {
                            plan.sort(query.order_by.clone())
                        }
                    }
                };
                if let Some(limit) = query.limit {
                    plan = plan.limit(limit);
                }
                output(plan, query)
            }
            (None, _) => {
                let plan = filtered(PlanNode::Empty, &query.where_);
                let plan = match query.limit {
                    Some(limit) => plan.limit(limit),
                    None => plan,
                };
                output(plan, query)
            }
        };

        Ok(explained(plan, &query.options))
    }

    /// Per-shard half of a distributed aggregate
    ///
    /// Pair with [`combine`] over the shard results.
    pub fn plan_partial(&self, query: &Query) -> PlannerResult<PlanNode> {
        if !query.group_by.is_empty() || !query.has_aggregates() {
            return Err(PlannerError::query_invalid(
                "partial plans need ungrouped aggregates",
            ));
        }
        let mut inner = query.clone();
        inner.select.clear();
        inner.options.explain = false;
        let source = self.plan_select(&inner)?;

        Ok(PlanNode::PartialAggregate {
            child: Box::new(source),
            aggregates: aggregate_specs(&query.select)?,
        })
    }

    pub fn plan_insert(&self, insert: &Insert) -> PlannerResult<PlanNode> {
        self.check_table(&insert.table)?;
        let plan = PlanNode::Insert {
            table: insert.table.clone(),
            child: Box::new(PlanNode::Values {
                rows: insert.rows.clone(),
            }),
        };
        Ok(explained(plan, &insert.options))
    }

    pub fn plan_update(&self, update: &Update) -> PlannerResult<PlanNode> {
        let source = self.mutation_source(&update.table, &update.where_, &update.options)?;
        let plan = PlanNode::Update {
            table: update.table.clone(),
            child: Box::new(source),
            set: update.set.clone(),
        };
        Ok(explained(plan, &update.options))
    }

    pub fn plan_delete(&self, delete: &Delete) -> PlannerResult<PlanNode> {
        let source = self.mutation_source(&delete.table, &delete.where_, &delete.options)?;
        let plan = PlanNode::Delete {
            table: delete.table.clone(),
            child: Box::new(source),
        };
        Ok(explained(plan, &delete.options))
    }

    /// Rows an update or delete touches; ordering is irrelevant here
    fn mutation_source(
        &self,
        table: &str,
        where_: &[Expr],
        options: &QueryOptions,
    ) -> PlannerResult<PlanNode> {
        self.check_table(table)?;
        let candidates =
            IndexMatcher::new(where_, &[]).match_all(&self.catalog.indexes_for(table));

        match candidates.iter().find(|c| !c.sargs.is_empty()) {
            Some(candidate) => {
                log_planned(table, &candidate.index);
                Ok(index_plan(table, candidate, where_))
            }
            None => {
                self.guard_table_scan(table, options)?;
                log_planned(table, "table-scan");
                Ok(filtered(PlanNode::table_scan(table), where_))
            }
        }
    }

    /// `count()` answered from index entry counts alone
    fn count_fast_path(&self, query: &Query, candidates: &[Candidate]) -> Option<PlanNode> {
        let [(alias, Expr::Aggregate(AggregateFunction::Count, _))] = query.select.as_slice() else {
            return None;
        };
        if !query.group_by.is_empty() || query.limit.is_some() {
            return None;
        }
        let candidate = candidates.first().filter(|c| !c.recheck)?;

        Some(PlanNode::Aggregate {
            child: Box::new(PlanNode::IndexOnlyScan {
                index: candidate.index.clone(),
                sargs: candidate.sargs.clone(),
                direction: candidate.direction,
            }),
            aggregates: vec![AggregateSpec::new(
                alias.clone(),
                AggregateFunction::Sum,
                Some(col("_count")),
            )],
        })
    }

    fn check_table(&self, table: &str) -> PlannerResult<()> {
        if self.catalog.has_table(table) {
            Ok(())
        } else {
            Err(PlannerError::unknown_table(table))
        }
    }

    fn guard_table_scan(&self, table: &str, options: &QueryOptions) -> PlannerResult<()> {
        if options.notablescan.unwrap_or(self.notablescan) {
            log_event_with_fields(Event::TableScanForbidden, &[("table", table)]);
            return Err(PlannerError::table_scan_forbidden(table));
        }
        Ok(())
    }
}

/// Merges partial aggregate results from several sources
pub fn combine(partials: Vec<PlanNode>, query: &Query) -> PlannerResult<PlanNode> {
    Ok(PlanNode::CombineAggregates {
        child: Box::new(PlanNode::Append { children: partials }),
        aggregates: aggregate_specs(&query.select)?,
    })
}

fn index_plan(table: &str, candidate: &Candidate, where_: &[Expr]) -> PlanNode {
    let scan = PlanNode::index_scan(
        table,
        candidate.index.clone(),
        candidate.sargs.clone(),
        candidate.direction,
    );
    if candidate.recheck {
        scan.filter(where_.to_vec())
    } else {
        scan
    }
}

fn filtered(plan: PlanNode, where_: &[Expr]) -> PlanNode {
    if where_.is_empty() {
        plan
    } else {
        plan.filter(where_.to_vec())
    }
}

fn explained(plan: PlanNode, options: &QueryOptions) -> PlanNode {
    if options.explain {
        plan.explained()
    } else {
        plan
    }
}

fn log_planned(table: &str, access: &str) {
    log_event_with_fields(Event::QueryPlanned, &[("table", table), ("access", access)]);
}

/// Project, Aggregate or HashAggregate on top of the access path
fn output(plan: PlanNode, query: &Query) -> PlanNode {
    if !query.group_by.is_empty() {
        let group_keys = query
            .group_by
            .iter()
            .map(|g| {
                query
                    .select
                    .iter()
                    .find(|(_, e)| e == g)
                    .map(|(alias, _)| alias.clone())
            })
            .collect();
        let aggregates = query
            .select
            .iter()
            .filter_map(|(alias, e)| AggregateSpec::from_expr(alias.clone(), e))
            .collect();
        return PlanNode::HashAggregate {
            child: Box::new(plan),
            group_by: query.group_by.clone(),
            group_keys,
            aggregates,
        };
    }

    if query.has_aggregates() {
        let aggregates = query
            .select
            .iter()
            .filter_map(|(alias, e)| AggregateSpec::from_expr(alias.clone(), e))
            .collect();
        return PlanNode::Aggregate {
            child: Box::new(plan),
            aggregates,
        };
    }

    if query.select.is_empty() {
        plan
    } else {
        plan.project(query.select.clone())
    }
}

fn aggregate_specs(select: &[(String, Expr)]) -> PlannerResult<Vec<AggregateSpec>> {
    select
        .iter()
        .map(|(alias, e)| {
            AggregateSpec::from_expr(alias.clone(), e).ok_or_else(|| {
                PlannerError::query_invalid(format!("'{}' is not an aggregate", alias))
            })
        })
        .collect()
}

fn validate_select(query: &Query) -> PlannerResult<()> {
    if query.from.is_none() && (query.has_aggregates() || !query.group_by.is_empty()) {
        return Err(PlannerError::query_invalid(
            "aggregates need a source table",
        ));
    }

    if !query.group_by.is_empty() {
        for (alias, expr) in &query.select {
            if !expr.is_aggregate() && !query.group_by.contains(expr) {
                return Err(PlannerError::query_invalid(format!(
                    "'{}' is neither aggregated nor grouped",
                    alias
                )));
            }
        }
    } else if query.has_aggregates() && !query.select.iter().all(|(_, e)| e.is_aggregate()) {
        return Err(PlannerError::query_invalid(
            "cannot mix aggregates and plain columns without group by",
        ));
    }

    if query.order_by.iter().any(|o| o.expr.is_aggregate())
        || query.where_.iter().any(Expr::is_aggregate)
    {
        return Err(PlannerError::query_invalid(
            "aggregates are only allowed in the select list",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{count, eq, gt, lit, lt, neq, sum, IndexedExpr, SortDirection};
    use crate::index::SearchArgs;
    use crate::planner::PlannerErrorCode;
    use crate::storage::Database;

    fn catalog() -> Database {
        let mut db = Database::new();
        db.create_table("users").unwrap();
        db.create_index(
            "users_idx_name",
            "users",
            vec![IndexedExpr::asc(col("name"))],
        )
        .unwrap();
        db.create_index(
            "users_idx_name_id",
            "users",
            vec![IndexedExpr::asc(col("name")), IndexedExpr::asc(col("id"))],
        )
        .unwrap();
        db
    }

    fn kinds(plan: &PlanNode) -> Vec<String> {
        plan.explain().kinds().into_iter().map(String::from).collect()
    }

    #[test]
    fn test_table_scan_plan() {
        let db = catalog();
        let query = Query::new("users")
            .select_column("name")
            .where_(eq(col("id"), lit(8)))
            .limit(1);
        let plan = QueryPlanner::new(&db).plan_select(&query).unwrap();
        assert_eq!(kinds(&plan), vec!["Project", "Limit", "Filter", "TableScan"]);
    }

    #[test]
    fn test_index_scan_without_recheck() {
        let db = catalog();
        let query = Query::new("users").where_(eq(col("name"), lit("Quincy")));
        let plan = QueryPlanner::new(&db).plan_select(&query).unwrap();
        assert_eq!(
            plan,
            PlanNode::index_scan(
                "users",
                "users_idx_name",
                SearchArgs::new().with_eq(vec!["Quincy".into()]),
                SortDirection::Asc,
            )
        );
    }

    #[test]
    fn test_index_scan_with_recheck_and_sort() {
        let db = catalog();
        let query = Query::new("users")
            .where_(gt(col("name"), lit("Herrod")))
            .where_(neq(col("id"), lit(3)))
            .order_by(IndexedExpr::desc(col("id")));
        let plan = QueryPlanner::new(&db).plan_select(&query).unwrap();
        assert_eq!(kinds(&plan), vec!["Sort", "Filter", "IndexScan"]);
    }

    #[test]
    fn test_order_by_uses_descending_scan() {
        let db = catalog();
        let query = Query::new("users")
            .order_by(IndexedExpr::desc(col("name")))
            .limit(3);
        let plan = QueryPlanner::new(&db).plan_select(&query).unwrap();
        match plan {
            PlanNode::Limit { child, limit: 3 } => {
                assert!(matches!(
                    *child,
                    PlanNode::IndexScan {
                        direction: SortDirection::Desc,
                        ..
                    }
                ));
            }
            other => panic!("unexpected plan {:?}", other),
        }
    }

    #[test]
    fn test_notablescan_rejected_at_plan_time() {
        let db = catalog();
        let query = Query::new("users")
            .where_(eq(col("id"), lit(8)))
            .notablescan(true);
        let err = QueryPlanner::new(&db).plan_select(&query).unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::StrataPlannerTableScanForbidden);
        assert_eq!(err.table(), Some("users"));
    }

    #[test]
    fn test_query_option_overrides_default() {
        let db = catalog();
        let planner = QueryPlanner::new(&db).with_notablescan(true);
        assert!(planner.plan_select(&Query::new("users")).is_err());
        assert!(planner
            .plan_select(&Query::new("users").notablescan(false))
            .is_ok());
        // an index path is never affected
        assert!(planner
            .plan_select(&Query::new("users").where_(eq(col("name"), lit("Uta"))))
            .is_ok());
    }

    #[test]
    fn test_unknown_table() {
        let db = catalog();
        let err = QueryPlanner::new(&db)
            .plan_select(&Query::new("ghosts"))
            .unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::StrataPlannerUnknownTable);
    }

    #[test]
    fn test_grouping_validation() {
        let db = catalog();
        let planner = QueryPlanner::new(&db);

        let ok = Query::new("users")
            .select_column("active")
            .select("count", count())
            .group_by(col("active"));
        assert!(matches!(
            planner.plan_select(&ok).unwrap(),
            PlanNode::HashAggregate { ref group_keys, .. } if group_keys == &vec![Some("active".to_string())]
        ));

        let ungrouped = Query::new("users")
            .select_column("name")
            .select("count", count())
            .group_by(col("active"));
        assert_eq!(
            planner.plan_select(&ungrouped).unwrap_err().code(),
            PlannerErrorCode::StrataPlannerQueryInvalid
        );

        let mixed = Query::new("users").select_column("name").select("count", count());
        assert!(planner.plan_select(&mixed).is_err());
    }

    #[test]
    fn test_count_uses_index_only_scan() {
        let db = catalog();
        let query = Query::new("users")
            .select("count", count())
            .where_(eq(col("name"), lit("Hope")));
        let plan = QueryPlanner::new(&db).plan_select(&query).unwrap();
        assert_eq!(kinds(&plan), vec!["Aggregate", "IndexOnlyScan"]);

        // a recheck needs the rows themselves
        let query = query.where_(lt(col("id"), lit(5)));
        let plan = QueryPlanner::new(&db).plan_select(&query).unwrap();
        assert_eq!(kinds(&plan), vec!["Aggregate", "Filter", "IndexScan"]);
    }

    #[test]
    fn test_constant_query() {
        let db = catalog();
        let query = Query::constant().select("one", lit(1));
        let plan = QueryPlanner::new(&db).plan_select(&query).unwrap();
        assert_eq!(kinds(&plan), vec!["Project", "Empty"]);
    }

    #[test]
    fn test_explain_wraps_plan() {
        let db = catalog();
        let plan = QueryPlanner::new(&db)
            .plan_select(&Query::new("users").explain())
            .unwrap();
        assert_eq!(kinds(&plan), vec!["Explain", "TableScan"]);
    }

    #[test]
    fn test_mutation_plans() {
        let db = catalog();
        let planner = QueryPlanner::new(&db);

        let delete = Delete::from_table("users")
            .where_(eq(col("name"), lit("Hope")))
            .where_(eq(col("id"), lit(3)));
        let plan = planner.plan(&delete.into()).unwrap();
        assert_eq!(kinds(&plan), vec!["Delete", "Filter", "IndexScan"]);
        assert_eq!(
            plan.explain().children[0].children[0].params["index"],
            "users_idx_name"
        );

        let update = Update::table("users")
            .set("active", lit(true))
            .where_(neq(col("id"), lit(3)));
        let plan = planner.plan(&update.into()).unwrap();
        assert_eq!(kinds(&plan), vec!["Update", "Filter", "TableScan"]);

        let insert = Insert::into_table("users").row(vec![("id".to_string(), lit(11))]);
        let plan = planner.plan(&insert.into()).unwrap();
        assert_eq!(kinds(&plan), vec!["Insert", "Values"]);
    }

    #[test]
    fn test_mutation_table_scan_guard() {
        let db = catalog();
        let planner = QueryPlanner::new(&db).with_notablescan(true);
        let err = planner
            .plan_delete(&Delete::from_table("users").where_(eq(col("id"), lit(1))))
            .unwrap_err();
        assert_eq!(err.code(), PlannerErrorCode::StrataPlannerTableScanForbidden);

        let allowed = Delete::from_table("users")
            .where_(eq(col("id"), lit(1)))
            .notablescan(false);
        assert!(planner.plan_delete(&allowed).is_ok());
    }

    #[test]
    fn test_partial_and_combine() {
        let db = catalog();
        let query = Query::new("users").select("total", sum(col("id")));
        let planner = QueryPlanner::new(&db);

        let partial = planner.plan_partial(&query).unwrap();
        assert_eq!(kinds(&partial), vec!["PartialAggregate", "TableScan"]);

        let combined = combine(vec![partial.clone(), partial], &query).unwrap();
        assert_eq!(
            kinds(&combined),
            vec!["CombineAggregates", "Append", "PartialAggregate", "TableScan", "PartialAggregate", "TableScan"]
        );

        let grouped = query.group_by(col("active"));
        assert!(planner.plan_partial(&grouped).is_err());
    }
}
