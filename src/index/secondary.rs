//! Secondary index over a table
//!
//! An index evaluates its indexed expressions against each tuple to form a
//! composite key and stores the tuple's row id under it.

use std::collections::BTreeSet;

use crate::expr::{IndexedExpr, RowId, SortDirection, Tuple, Value};
use crate::observability::ExecutionStats;

use super::comparator::{KeyComparator, Lexicographic, PrefixComparator};
use super::errors::{IndexError, IndexResult};
use super::sargs::{IndexKey, SearchArgs};
use super::tree::{AvlTree, TreeScan};

/// Named index over one table
#[derive(Debug)]
pub struct Index {
    name: String,
    table: String,
    exprs: Vec<IndexedExpr>,
    tree: AvlTree,
}

impl Index {
    /// Creates an index ordered lexicographically
    pub fn new(name: impl Into<String>, table: impl Into<String>, exprs: Vec<IndexedExpr>) -> Self {
        let comparator = Lexicographic::new(directions(&exprs));
        Self::with_comparator(name, table, exprs, Box::new(comparator))
    }

    /// Creates an index with the prefix-aware comparator
    pub fn prefix(
        name: impl Into<String>,
        table: impl Into<String>,
        exprs: Vec<IndexedExpr>,
    ) -> Self {
        let comparator = PrefixComparator::new(directions(&exprs));
        Self::with_comparator(name, table, exprs, Box::new(comparator))
    }

    pub fn with_comparator(
        name: impl Into<String>,
        table: impl Into<String>,
        exprs: Vec<IndexedExpr>,
        comparator: Box<dyn KeyComparator>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            exprs,
            tree: AvlTree::new(comparator),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Indexed expressions in key order
    pub fn exprs(&self) -> &[IndexedExpr] {
        &self.exprs
    }

    /// Evaluates the composite key for a tuple
    ///
    /// Fails when every component is null.
    pub fn key_for(&self, tuple: &Tuple) -> IndexResult<IndexKey> {
        let key = self
            .exprs
            .iter()
            .map(|ie| ie.expr.eval(tuple))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| IndexError::key_evaluation(&self.name, &e))?;
        self.check_key(&key)?;
        Ok(key)
    }

    fn check_key(&self, key: &[Value]) -> IndexResult<()> {
        if key.iter().all(Value::is_null) {
            return Err(IndexError::invalid_key(&self.name));
        }
        Ok(())
    }

    /// Adds a row id under a key
    pub fn insert(&mut self, key: IndexKey, row_id: RowId) -> IndexResult<()> {
        self.check_key(&key)?;
        self.tree.insert(key, row_id);
        Ok(())
    }

    /// Removes a row id from a key; returns whether it was present
    pub fn delete_row(&mut self, key: &[Value], row_id: RowId) -> bool {
        self.tree.remove(key, row_id)
    }

    /// Indexes a stored tuple
    pub fn insert_tuple(&mut self, tuple: &Tuple, row_id: RowId) -> IndexResult<()> {
        let key = self.key_for(tuple)?;
        self.tree.insert(key, row_id);
        Ok(())
    }

    /// Removes a stored tuple
    pub fn delete_tuple(&mut self, tuple: &Tuple, row_id: RowId) -> IndexResult<bool> {
        let key = self.key_for(tuple)?;
        Ok(self.tree.remove(&key, row_id))
    }

    /// Point lookup
    pub fn get(&self, key: &[Value]) -> Option<&BTreeSet<RowId>> {
        self.tree.get(key)
    }

    /// Lazy bounded scan in `direction`
    pub fn scan<'a>(
        &'a self,
        sargs: &SearchArgs,
        direction: SortDirection,
        stats: &'a ExecutionStats,
    ) -> TreeScan<'a> {
        self.tree.scan(sargs, direction, stats)
    }

    pub fn clear(&mut self) {
        self.tree.clear();
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    /// Number of indexed rows
    pub fn row_count(&self) -> usize {
        self.tree.row_count()
    }

    pub fn tree(&self) -> &AvlTree {
        &self.tree
    }
}

fn directions(exprs: &[IndexedExpr]) -> Vec<SortDirection> {
    exprs.iter().map(|ie| ie.direction).collect()
}
