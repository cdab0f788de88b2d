//! Plan nodes and their evaluation
//!
//! Read nodes are pulled lazily: each node wraps its child's iterator, so a
//! `Limit` stops the whole pipeline by not asking for more. `Sort` and the
//! aggregation nodes must drain their child first; they do so on the first
//! pull, not when the stream is built.
//!
//! Mutation nodes need exclusive storage access and run through
//! [`PlanNode::execute`].

use std::collections::HashMap;
use std::fmt;

use crate::expr::{Expr, IndexedExpr, SortDirection, Tuple, Value};
use crate::index::SearchArgs;
use crate::storage::Storage;

use super::aggregate::{init_states, reduce_states, AggState, AggregateSpec};
use super::context::ExecutionContext;
use super::errors::{ExecutorError, ExecutorResult};
use super::explain::ExplainNode;

/// Lazy sequence of tuples; failures surface when pulled
pub type TupleStream<'a> = Box<dyn Iterator<Item = ExecutorResult<Tuple>> + 'a>;

/// Executable plan tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanNode {
    /// Live tuples of a table in row-id order
    TableScan { table: String },
    /// Tuples fetched through an index
    IndexScan {
        table: String,
        index: String,
        sargs: SearchArgs,
        direction: SortDirection,
    },
    /// Index keys only: `_key_0.._key_n` plus `_count` row ids per key
    IndexOnlyScan {
        index: String,
        sargs: SearchArgs,
        direction: SortDirection,
    },
    /// Literal rows, evaluated against an empty tuple
    Values { rows: Vec<Vec<(String, Expr)>> },
    /// A single empty tuple
    Empty,
    Filter {
        child: Box<PlanNode>,
        predicates: Vec<Expr>,
    },
    Sort {
        child: Box<PlanNode>,
        order_by: Vec<IndexedExpr>,
    },
    Limit { child: Box<PlanNode>, limit: usize },
    Project {
        child: Box<PlanNode>,
        select: Vec<(String, Expr)>,
    },
    /// Whole-input reduction to one tuple
    Aggregate {
        child: Box<PlanNode>,
        aggregates: Vec<AggregateSpec>,
    },
    /// Group-keyed reduction; groups come out in first-appearance order
    HashAggregate {
        child: Box<PlanNode>,
        group_by: Vec<Expr>,
        /// Output column for each `group_by` expression, if selected
        group_keys: Vec<Option<String>>,
        aggregates: Vec<AggregateSpec>,
    },
    /// Whole-input reduction emitting mergeable state columns
    PartialAggregate {
        child: Box<PlanNode>,
        aggregates: Vec<AggregateSpec>,
    },
    /// Merges partial states produced by `PartialAggregate`
    CombineAggregates {
        child: Box<PlanNode>,
        aggregates: Vec<AggregateSpec>,
    },
    /// Children in order, one after another
    Append { children: Vec<PlanNode> },
    Insert { table: String, child: Box<PlanNode> },
    Update {
        table: String,
        child: Box<PlanNode>,
        set: Vec<(String, Expr)>,
    },
    Delete { table: String, child: Box<PlanNode> },
    /// Yields the rendered explain text of its child instead of running it
    Explain { child: Box<PlanNode> },
}

impl PlanNode {
    pub fn table_scan(table: impl Into<String>) -> Self {
        PlanNode::TableScan {
            table: table.into(),
        }
    }

    pub fn index_scan(
        table: impl Into<String>,
        index: impl Into<String>,
        sargs: SearchArgs,
        direction: SortDirection,
    ) -> Self {
        PlanNode::IndexScan {
            table: table.into(),
            index: index.into(),
            sargs,
            direction,
        }
    }

    pub fn filter(self, predicates: Vec<Expr>) -> Self {
        PlanNode::Filter {
            child: Box::new(self),
            predicates,
        }
    }

    pub fn sort(self, order_by: Vec<IndexedExpr>) -> Self {
        PlanNode::Sort {
            child: Box::new(self),
            order_by,
        }
    }

    pub fn limit(self, limit: usize) -> Self {
        PlanNode::Limit {
            child: Box::new(self),
            limit,
        }
    }

    pub fn project(self, select: Vec<(String, Expr)>) -> Self {
        PlanNode::Project {
            child: Box::new(self),
            select,
        }
    }

    pub fn explained(self) -> Self {
        PlanNode::Explain {
            child: Box::new(self),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            PlanNode::TableScan { .. } => "TableScan",
            PlanNode::IndexScan { .. } => "IndexScan",
            PlanNode::IndexOnlyScan { .. } => "IndexOnlyScan",
            PlanNode::Values { .. } => "Values",
            PlanNode::Empty => "Empty",
            PlanNode::Filter { .. } => "Filter",
            PlanNode::Sort { .. } => "Sort",
            PlanNode::Limit { .. } => "Limit",
            PlanNode::Project { .. } => "Project",
            PlanNode::Aggregate { .. } => "Aggregate",
            PlanNode::HashAggregate { .. } => "HashAggregate",
            PlanNode::PartialAggregate { .. } => "PartialAggregate",
            PlanNode::CombineAggregates { .. } => "CombineAggregates",
            PlanNode::Append { .. } => "Append",
            PlanNode::Insert { .. } => "Insert",
            PlanNode::Update { .. } => "Update",
            PlanNode::Delete { .. } => "Delete",
            PlanNode::Explain { .. } => "Explain",
        }
    }

    /// True for nodes that change storage when executed
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            PlanNode::Insert { .. } | PlanNode::Update { .. } | PlanNode::Delete { .. }
        )
    }

    /// Builds the lazy tuple stream of a read plan
    ///
    /// Nothing is read until the stream is pulled. Mutation nodes yield a
    /// single `STRATA_EXECUTOR_MUTATION_CONTEXT` error.
    pub fn stream<'a, S>(&'a self, storage: &'a S, ctx: &'a ExecutionContext) -> TupleStream<'a>
    where
        S: Storage + ?Sized,
    {
        match self {
            PlanNode::TableScan { table } => {
                if ctx.notablescan() {
                    return failed(ExecutorError::table_scan_forbidden(table));
                }
                match storage.table_scan(table) {
                    Ok(tuples) => Box::new(tuples.map(move |t| {
                        ctx.stats().increment_table_tuples_scanned();
                        Ok(t)
                    })),
                    Err(e) => failed(e.into()),
                }
            }

            PlanNode::IndexScan {
                table,
                index,
                sargs,
                direction,
            } => match storage.index_scan(index, sargs, *direction, ctx.stats()) {
                Ok(entries) => Box::new(entries.flat_map(move |(_, rows)| {
                    rows.iter().map(move |row_id| {
                        ctx.stats().increment_index_tuples_scanned();
                        storage.fetch(table, *row_id).map_err(ExecutorError::from)
                    })
                })),
                Err(e) => failed(e.into()),
            },

            PlanNode::IndexOnlyScan {
                index,
                sargs,
                direction,
            } => match storage.index_scan(index, sargs, *direction, ctx.stats()) {
                Ok(entries) => Box::new(entries.map(|(key, rows)| {
                    let mut t = Tuple::new();
                    for (i, v) in key.iter().enumerate() {
                        t.set(format!("_key_{}", i), v.clone());
                    }
                    t.set("_count", rows.len() as i64);
                    Ok(t)
                })),
                Err(e) => failed(e.into()),
            },

            PlanNode::Values { rows } => {
                Box::new(rows.iter().map(|row| project(row, &Tuple::new())))
            }

            PlanNode::Empty => Box::new(std::iter::once(Ok(Tuple::new()))),

            PlanNode::Filter { child, predicates } => {
                Box::new(child.stream(storage, ctx).filter_map(move |item| {
                    let tuple = match item {
                        Ok(t) => t,
                        Err(e) => return Some(Err(e)),
                    };
                    match matches_all(predicates, &tuple) {
                        Ok(true) => Some(Ok(tuple)),
                        Ok(false) => None,
                        Err(e) => Some(Err(e)),
                    }
                }))
            }

            PlanNode::Sort { child, order_by } => deferred(move || {
                let rows = child.stream(storage, ctx).collect::<ExecutorResult<Vec<_>>>()?;
                sort_rows(rows, order_by)
            }),

            PlanNode::Limit { child, limit } => Box::new(child.stream(storage, ctx).take(*limit)),

            PlanNode::Project { child, select } => Box::new(
                child
                    .stream(storage, ctx)
                    .map(move |item| item.and_then(|t| project(select, &t))),
            ),

            PlanNode::Aggregate { child, aggregates } => deferred(move || {
                let states = reduce_all(child.stream(storage, ctx), aggregates)?;
                let mut out = Tuple::new();
                for (state, spec) in states.iter().zip(aggregates) {
                    out.set(spec.alias.clone(), state.render());
                }
                Ok(vec![out])
            }),

            PlanNode::HashAggregate {
                child,
                group_by,
                group_keys,
                aggregates,
            } => deferred(move || {
                hash_aggregate(child.stream(storage, ctx), group_by, group_keys, aggregates)
            }),

            PlanNode::PartialAggregate { child, aggregates } => deferred(move || {
                let states = reduce_all(child.stream(storage, ctx), aggregates)?;
                let mut out = Tuple::new();
                for (state, spec) in states.iter().zip(aggregates) {
                    state.write_partial(&spec.alias, &mut out);
                }
                Ok(vec![out])
            }),

            PlanNode::CombineAggregates { child, aggregates } => deferred(move || {
                let mut states = init_states(aggregates);
                for item in child.stream(storage, ctx) {
                    let partial = item?;
                    for (state, spec) in states.iter_mut().zip(aggregates) {
                        state.combine(spec, AggState::read_partial(spec, &partial)?)?;
                    }
                }
                let mut out = Tuple::new();
                for (state, spec) in states.iter().zip(aggregates) {
                    out.set(spec.alias.clone(), state.render());
                }
                Ok(vec![out])
            }),

            PlanNode::Append { children } => Box::new(
                children
                    .iter()
                    .flat_map(move |child| child.stream(storage, ctx)),
            ),

            PlanNode::Insert { .. } | PlanNode::Update { .. } | PlanNode::Delete { .. } => {
                failed(ExecutorError::mutation_context(self.kind()))
            }

            PlanNode::Explain { child } => Box::new(std::iter::once(Ok(
                Tuple::new().with("explain", child.explain().to_string())
            ))),
        }
    }

    /// Runs any plan to completion
    ///
    /// Mutation nodes drain their child before touching storage, then
    /// return one `{count: n}` tuple.
    pub fn execute<S>(&self, storage: &mut S, ctx: &ExecutionContext) -> ExecutorResult<Vec<Tuple>>
    where
        S: Storage + ?Sized,
    {
        match self {
            PlanNode::Insert { table, child } => {
                let rows = child.collect_rows(&*storage, ctx)?;
                let count = storage.bulk_insert(table, rows)?;
                Ok(vec![count_tuple(count)])
            }
            PlanNode::Update { table, child, set } => {
                let rows = child.collect_rows(&*storage, ctx)?;
                for row in &rows {
                    let mut after = row.clone();
                    for (column, expr) in set {
                        let value = expr.eval(&after)?;
                        after.set(column.clone(), value);
                    }
                    storage.update(table, row, &mut |stored: &mut Tuple| {
                        for (column, _) in set {
                            let value = after.get(column).cloned().unwrap_or(Value::Null);
                            stored.set(column.clone(), value);
                        }
                    })?;
                }
                Ok(vec![count_tuple(rows.len())])
            }
            PlanNode::Delete { table, child } => {
                let rows = child.collect_rows(&*storage, ctx)?;
                for row in &rows {
                    storage.delete(table, row)?;
                }
                Ok(vec![count_tuple(rows.len())])
            }
            _ => self.collect_rows(&*storage, ctx),
        }
    }

    fn collect_rows<S>(&self, storage: &S, ctx: &ExecutionContext) -> ExecutorResult<Vec<Tuple>>
    where
        S: Storage + ?Sized,
    {
        self.stream(storage, ctx).collect()
    }

    /// Describes the plan without running it
    pub fn explain(&self) -> ExplainNode {
        let node = ExplainNode::new(self.kind());
        match self {
            PlanNode::TableScan { table } => node.param("table", table),
            PlanNode::IndexScan {
                table,
                index,
                sargs,
                direction,
            } => node
                .param("table", table)
                .param("index", index)
                .param("sargs", sargs)
                .param("direction", direction),
            PlanNode::IndexOnlyScan {
                index,
                sargs,
                direction,
            } => node
                .param("index", index)
                .param("sargs", sargs)
                .param("direction", direction),
            PlanNode::Values { rows } => node.param("rows", rows.len()),
            PlanNode::Empty => node,
            PlanNode::Filter { child, predicates } => node
                .param("predicates", list(predicates))
                .child(child.explain()),
            PlanNode::Sort { child, order_by } => {
                node.param("order_by", list(order_by)).child(child.explain())
            }
            PlanNode::Limit { child, limit } => node.param("limit", limit).child(child.explain()),
            PlanNode::Project { child, select } => node
                .param("select", list(&aliased(select)))
                .child(child.explain()),
            PlanNode::Aggregate { child, aggregates }
            | PlanNode::PartialAggregate { child, aggregates }
            | PlanNode::CombineAggregates { child, aggregates } => node
                .param("aggregates", list(&aliased_aggregates(aggregates)))
                .child(child.explain()),
            PlanNode::HashAggregate {
                child,
                group_by,
                aggregates,
                ..
            } => node
                .param("group_by", list(group_by))
                .param("aggregates", list(&aliased_aggregates(aggregates)))
                .child(child.explain()),
            PlanNode::Append { children } => children
                .iter()
                .fold(node, |n, child| n.child(child.explain())),
            PlanNode::Insert { table, child } | PlanNode::Delete { table, child } => {
                node.param("table", table).child(child.explain())
            }
            PlanNode::Update { table, child, set } => {
                let assignments: Vec<String> =
                    set.iter().map(|(c, e)| format!("{} = {}", c, e)).collect();
                node.param("table", table)
                    .param("set", list(&assignments))
                    .child(child.explain())
            }
            PlanNode::Explain { child } => node.child(child.explain()),
        }
    }
}

fn failed<'a>(err: ExecutorError) -> TupleStream<'a> {
    Box::new(std::iter::once(Err(err)))
}

/// Runs `f` on the first pull and streams its rows
fn deferred<'a, F>(f: F) -> TupleStream<'a>
where
    F: FnOnce() -> ExecutorResult<Vec<Tuple>> + 'a,
{
    Box::new(
        std::iter::once_with(f).flat_map(|result| match result {
            Ok(rows) => rows.into_iter().map(Ok).collect::<Vec<_>>(),
            Err(e) => vec![Err(e)],
        }),
    )
}

fn matches_all(predicates: &[Expr], tuple: &Tuple) -> ExecutorResult<bool> {
    for p in predicates {
        if !p.matches(tuple)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn project(select: &[(String, Expr)], tuple: &Tuple) -> ExecutorResult<Tuple> {
    let mut out = Tuple::new();
    for (alias, expr) in select {
        out.set(alias.clone(), expr.eval(tuple)?);
    }
    Ok(out)
}

fn sort_rows(rows: Vec<Tuple>, order_by: &[IndexedExpr]) -> ExecutorResult<Vec<Tuple>> {
    let mut keyed = rows
        .into_iter()
        .map(|t| -> ExecutorResult<(Vec<Value>, Tuple)> {
            let key = order_by
                .iter()
                .map(|o| o.expr.eval(&t))
                .collect::<Result<Vec<_>, _>>()?;
            Ok((key, t))
        })
        .collect::<ExecutorResult<Vec<_>>>()?;

    // stable, so ties keep child order
    keyed.sort_by(|(a, _), (b, _)| {
        a.iter()
            .zip(b)
            .zip(order_by)
            .map(|((x, y), o)| match o.direction {
                SortDirection::Asc => x.cmp(y),
                SortDirection::Desc => y.cmp(x),
            })
            .find(|ord| ord.is_ne())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    Ok(keyed.into_iter().map(|(_, t)| t).collect())
}

fn reduce_all(input: TupleStream<'_>, aggregates: &[AggregateSpec]) -> ExecutorResult<Vec<AggState>> {
    let mut states = init_states(aggregates);
    for item in input {
        reduce_states(&mut states, aggregates, &item?)?;
    }
    Ok(states)
}

fn hash_aggregate(
    input: TupleStream<'_>,
    group_by: &[Expr],
    group_keys: &[Option<String>],
    aggregates: &[AggregateSpec],
) -> ExecutorResult<Vec<Tuple>> {
    let mut groups: Vec<(Vec<Value>, Vec<AggState>)> = Vec::new();
    let mut positions: HashMap<Vec<Value>, usize> = HashMap::new();

    for item in input {
        let tuple = item?;
        let key = group_by
            .iter()
            .map(|e| e.eval(&tuple))
            .collect::<Result<Vec<_>, _>>()?;
        let pos = match positions.get(&key) {
            Some(&pos) => pos,
            None => {
                positions.insert(key.clone(), groups.len());
                groups.push((key, init_states(aggregates)));
                groups.len() - 1
            }
        };
        reduce_states(&mut groups[pos].1, aggregates, &tuple)?;
    }

    Ok(groups
        .into_iter()
        .map(|(key, states)| {
            let mut out = Tuple::new();
            for (alias, value) in group_keys.iter().zip(key) {
                if let Some(alias) = alias {
                    out.set(alias.clone(), value);
                }
            }
            for (state, spec) in states.iter().zip(aggregates) {
                out.set(spec.alias.clone(), state.render());
            }
            out
        })
        .collect())
}

fn count_tuple(count: usize) -> Tuple {
    Tuple::new().with("count", count as i64)
}

fn list<T: fmt::Display>(items: &[T]) -> String {
    let parts: Vec<String> = items.iter().map(|i| i.to_string()).collect();
    format!("[{}]", parts.join(", "))
}

fn aliased(select: &[(String, Expr)]) -> Vec<String> {
    select
        .iter()
        .map(|(alias, expr)| with_alias(alias, expr.to_string()))
        .collect()
}

fn aliased_aggregates(aggregates: &[AggregateSpec]) -> Vec<String> {
    aggregates
        .iter()
        .map(|spec| with_alias(&spec.alias, spec.to_string()))
        .collect()
}

fn with_alias(alias: &str, rendered: String) -> String {
    if rendered == alias {
        rendered
    } else {
        format!("{} AS {}", rendered, alias)
    }
}
