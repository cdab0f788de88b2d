//! Storage contract consumed by the planner and executor

use std::collections::BTreeSet;

use crate::expr::{IndexedExpr, RowId, SortDirection, Tuple, Value};
use crate::index::SearchArgs;
use crate::observability::ExecutionStats;

use super::errors::StorageResult;

/// Lazy sequence of live tuples
pub type TupleIter<'a> = Box<dyn Iterator<Item = Tuple> + 'a>;

/// Lazy sequence of (key, row-id set) pairs from an index
pub type IndexEntries<'a> = Box<dyn Iterator<Item = (&'a [Value], &'a BTreeSet<RowId>)> + 'a>;

/// Index definition as seen by the planner
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexDef {
    pub name: String,
    pub table: String,
    pub exprs: Vec<IndexedExpr>,
}

impl IndexDef {
    pub fn new(name: impl Into<String>, table: impl Into<String>, exprs: Vec<IndexedExpr>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            exprs,
        }
    }
}

/// Schema lookups needed to plan a query
pub trait IndexCatalog {
    /// Returns whether the table is declared
    fn has_table(&self, table: &str) -> bool;

    /// Indexes of a table, in declaration order
    fn indexes_for(&self, table: &str) -> Vec<IndexDef>;
}

/// Row storage with index maintenance
///
/// Every successful mutation emits one journal record per affected row.
pub trait Storage: IndexCatalog {
    /// Live tuples in row-id order, tombstones skipped
    fn table_scan(&self, table: &str) -> StorageResult<TupleIter<'_>>;

    /// Fetches a live tuple by row id
    fn fetch(&self, table: &str, row_id: RowId) -> StorageResult<Tuple>;

    /// Appends tuples, assigning row ids; returns the number stored
    fn bulk_insert(&mut self, table: &str, tuples: Vec<Tuple>) -> StorageResult<usize>;

    /// Applies `mutator` to the stored copy of `tuple`; returns the new tuple
    fn update(
        &mut self,
        table: &str,
        tuple: &Tuple,
        mutator: &mut dyn FnMut(&mut Tuple),
    ) -> StorageResult<Tuple>;

    /// Tombstones the slot of `tuple`; returns the removed tuple
    fn delete(&mut self, table: &str, tuple: &Tuple) -> StorageResult<Tuple>;

    /// Lazy bounded scan of an index
    fn index_scan<'a>(
        &'a self,
        index: &str,
        sargs: &SearchArgs,
        direction: SortDirection,
        stats: &'a ExecutionStats,
    ) -> StorageResult<IndexEntries<'a>>;
}
