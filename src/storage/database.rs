//! In-memory database: tables, their indexes and a journal sink
//!
//! Mutations validate every index key first, then append the journal
//! record, then apply. A failed key leaves storage untouched.

use std::collections::BTreeMap;

use crate::expr::{IndexedExpr, RowId, SortDirection, Tuple};
use crate::index::{Index, IndexKey, SearchArgs};
use crate::journal::{JournalSink, MutationOp, MutationRecord, NoopJournal};
use crate::observability::{log_event_with_fields, Event, ExecutionStats};

use super::errors::{StorageError, StorageResult};
use super::table::Table;
use super::traits::{IndexCatalog, IndexDef, IndexEntries, Storage, TupleIter};

/// Tables and indexes held in memory
#[derive(Debug)]
pub struct Database {
    tables: BTreeMap<String, Table>,
    indexes: BTreeMap<String, Index>,
    journal: Box<dyn JournalSink>,
}

impl Default for Database {
    fn default() -> Self {
        Self::new()
    }
}

/// Keys of `tuple` for each named index
fn index_keys(
    indexes: &BTreeMap<String, Index>,
    names: &[String],
    tuple: &Tuple,
) -> StorageResult<Vec<(String, IndexKey)>> {
    names
        .iter()
        .map(|name| {
            let index = indexes
                .get(name)
                .ok_or_else(|| StorageError::unknown_index(name))?;
            Ok((name.clone(), index.key_for(tuple)?))
        })
        .collect()
}

impl Database {
    /// Database that discards mutation records
    pub fn new() -> Self {
        Self::with_journal(Box::new(NoopJournal))
    }

    pub fn with_journal(journal: Box<dyn JournalSink>) -> Self {
        Self {
            tables: BTreeMap::new(),
            indexes: BTreeMap::new(),
            journal,
        }
    }

    /// Declares an empty table
    pub fn create_table(&mut self, name: &str) -> StorageResult<()> {
        if self.tables.contains_key(name) {
            return Err(StorageError::duplicate("Table", name));
        }
        self.tables.insert(name.to_string(), Table::new(name));
        log_event_with_fields(Event::TableCreated, &[("table", name)]);
        Ok(())
    }

    /// Declares an index and builds it from the table's live rows
    ///
    /// Uses the prefix-aware comparator so that bounds on leading key
    /// components select whole key ranges.
    pub fn create_index(
        &mut self,
        name: &str,
        table: &str,
        exprs: Vec<IndexedExpr>,
    ) -> StorageResult<()> {
        if self.indexes.contains_key(name) {
            return Err(StorageError::duplicate("Index", name));
        }
        let t = self
            .tables
            .get_mut(table)
            .ok_or_else(|| StorageError::unknown_table(table))?;

        let mut index = Index::prefix(name, table, exprs);
        for tuple in t.iter_live() {
            if let Some(row_id) = tuple.row_id() {
                index.insert_tuple(tuple, row_id)?;
            }
        }

        t.add_index(name);
        let rows = index.row_count().to_string();
        self.indexes.insert(name.to_string(), index);
        log_event_with_fields(
            Event::IndexCreated,
            &[("index", name), ("rows", &rows), ("table", table)],
        );
        Ok(())
    }

    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.get(name)
    }

    /// Declared table names, sorted
    pub fn table_names(&self) -> Vec<String> {
        self.tables.keys().cloned().collect()
    }

    pub fn index(&self, name: &str) -> Option<&Index> {
        self.indexes.get(name)
    }

    /// Rebuilds every index of a table from its slots
    pub fn reindex(&mut self, table: &str) -> StorageResult<()> {
        let t = self
            .tables
            .get(table)
            .ok_or_else(|| StorageError::unknown_table(table))?;

        for name in t.index_names() {
            let index = self
                .indexes
                .get_mut(name)
                .ok_or_else(|| StorageError::unknown_index(name))?;
            index.clear();
            for tuple in t.iter_live() {
                if let Some(row_id) = tuple.row_id() {
                    index.insert_tuple(tuple, row_id)?;
                }
            }
            log_event_with_fields(
                Event::IndexRebuilt,
                &[
                    ("index", name),
                    ("rows", &index.row_count().to_string()),
                    ("table", table),
                ],
            );
        }
        Ok(())
    }

    /// Applies a journal record without journaling it again
    pub fn apply(&mut self, record: &MutationRecord) -> StorageResult<()> {
        let name = record.table.as_str();
        let row_id = record.row_id;
        let t = self
            .tables
            .get(name)
            .ok_or_else(|| StorageError::unknown_table(name))?;
        let current = t.get(row_id).cloned();

        match record.op {
            MutationOp::Insert => {
                let after = record.after.clone().ok_or_else(|| {
                    StorageError::replay_mismatch(name, row_id, "insert without tuple")
                })?;
                if current.is_some() {
                    return Err(StorageError::replay_mismatch(name, row_id, "slot is live"));
                }
                let keys = index_keys(&self.indexes, t.index_names(), &after)?;
                self.table_mut(name)?
                    .place(row_id, after)
                    .map_err(|_| StorageError::replay_mismatch(name, row_id, "slot is live"))?;
                self.add_keys(keys, row_id)?;
            }
            MutationOp::Update => {
                let after = record.after.clone().ok_or_else(|| {
                    StorageError::replay_mismatch(name, row_id, "update without tuple")
                })?;
                let before = current.ok_or_else(|| {
                    StorageError::replay_mismatch(name, row_id, "slot is not live")
                })?;
                let old_keys = index_keys(&self.indexes, t.index_names(), &before)?;
                let new_keys = index_keys(&self.indexes, t.index_names(), &after)?;
                self.table_mut(name)?.replace(row_id, after);
                self.remove_keys(&old_keys, row_id);
                self.add_keys(new_keys, row_id)?;
            }
            MutationOp::Delete => {
                let before = current.ok_or_else(|| {
                    StorageError::replay_mismatch(name, row_id, "slot is not live")
                })?;
                let old_keys = index_keys(&self.indexes, t.index_names(), &before)?;
                self.table_mut(name)?.tombstone(row_id);
                self.remove_keys(&old_keys, row_id);
            }
        }
        Ok(())
    }

    /// Replays records in order; returns how many were applied
    pub fn recover<I>(&mut self, records: I) -> StorageResult<usize>
    where
        I: IntoIterator<Item = MutationRecord>,
    {
        let mut applied = 0;
        for record in records {
            self.apply(&record)?;
            applied += 1;
        }
        Ok(applied)
    }

    /// Flushes the journal sink
    pub fn flush_journal(&self) -> StorageResult<()> {
        Ok(self.journal.flush()?)
    }

    fn table_mut(&mut self, name: &str) -> StorageResult<&mut Table> {
        self.tables
            .get_mut(name)
            .ok_or_else(|| StorageError::unknown_table(name))
    }

    fn add_keys(&mut self, keys: Vec<(String, IndexKey)>, row_id: RowId) -> StorageResult<()> {
        for (name, key) in keys {
            if let Some(index) = self.indexes.get_mut(&name) {
                index.insert(key, row_id)?;
            }
        }
        Ok(())
    }

    fn remove_keys(&mut self, keys: &[(String, IndexKey)], row_id: RowId) {
        for (name, key) in keys {
            if let Some(index) = self.indexes.get_mut(name) {
                index.delete_row(key, row_id);
            }
        }
    }

    fn live_tuple(&self, table: &str, tuple: &Tuple) -> StorageResult<(RowId, Tuple)> {
        let t = self
            .tables
            .get(table)
            .ok_or_else(|| StorageError::unknown_table(table))?;
        let row_id = tuple
            .row_id()
            .ok_or_else(|| StorageError::row_not_found(table, None))?;
        let current = t
            .get(row_id)
            .cloned()
            .ok_or_else(|| StorageError::row_not_found(table, Some(row_id)))?;
        Ok((row_id, current))
    }

    fn index_names(&self, table: &str) -> StorageResult<&[String]> {
        self.tables
            .get(table)
            .map(Table::index_names)
            .ok_or_else(|| StorageError::unknown_table(table))
    }
}

impl IndexCatalog for Database {
    fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    fn indexes_for(&self, table: &str) -> Vec<IndexDef> {
        let Some(t) = self.tables.get(table) else {
            return Vec::new();
        };
        t.index_names()
            .iter()
            .filter_map(|name| self.indexes.get(name))
            .map(|index| IndexDef::new(index.name(), index.table(), index.exprs().to_vec()))
            .collect()
    }
}

impl Storage for Database {
    fn table_scan(&self, table: &str) -> StorageResult<TupleIter<'_>> {
        let t = self
            .tables
            .get(table)
            .ok_or_else(|| StorageError::unknown_table(table))?;
        Ok(Box::new(t.iter_live().cloned()))
    }

    fn fetch(&self, table: &str, row_id: RowId) -> StorageResult<Tuple> {
        self.tables
            .get(table)
            .ok_or_else(|| StorageError::unknown_table(table))?
            .get(row_id)
            .cloned()
            .ok_or_else(|| StorageError::row_not_found(table, Some(row_id)))
    }

    fn bulk_insert(&mut self, table: &str, tuples: Vec<Tuple>) -> StorageResult<usize> {
        let t = self
            .tables
            .get(table)
            .ok_or_else(|| StorageError::unknown_table(table))?;

        let mut next = t.next_row_id();
        let mut prepared = Vec::with_capacity(tuples.len());
        for mut tuple in tuples {
            let keys = index_keys(&self.indexes, t.index_names(), &tuple)?;
            tuple.set_row_id(next);
            prepared.push((next, tuple, keys));
            next += 1;
        }

        let count = prepared.len();
        for (row_id, tuple, keys) in prepared {
            self.journal
                .append(&MutationRecord::insert(table, row_id, tuple.clone()))?;
            self.table_mut(table)?.push(tuple);
            self.add_keys(keys, row_id)?;
        }

        log_event_with_fields(
            Event::MutationApplied,
            &[("op", "insert"), ("rows", &count.to_string()), ("table", table)],
        );
        Ok(count)
    }

    fn update(
        &mut self,
        table: &str,
        tuple: &Tuple,
        mutator: &mut dyn FnMut(&mut Tuple),
    ) -> StorageResult<Tuple> {
        let (row_id, before) = self.live_tuple(table, tuple)?;
        let mut after = before.clone();
        mutator(&mut after);
        after.set_row_id(row_id);

        let names = self.index_names(table)?;
        let old_keys = index_keys(&self.indexes, names, &before)?;
        let new_keys = index_keys(&self.indexes, names, &after)?;

        self.journal.append(&MutationRecord::update(
            table,
            row_id,
            before,
            after.clone(),
        ))?;
        self.table_mut(table)?.replace(row_id, after.clone());
        self.remove_keys(&old_keys, row_id);
        self.add_keys(new_keys, row_id)?;

        log_event_with_fields(
            Event::MutationApplied,
            &[("op", "update"), ("rows", "1"), ("table", table)],
        );
        Ok(after)
    }

    fn delete(&mut self, table: &str, tuple: &Tuple) -> StorageResult<Tuple> {
        let (row_id, before) = self.live_tuple(table, tuple)?;
        let old_keys = index_keys(&self.indexes, self.index_names(table)?, &before)?;

        self.journal
            .append(&MutationRecord::delete(table, row_id, before.clone()))?;
        self.table_mut(table)?.tombstone(row_id);
        self.remove_keys(&old_keys, row_id);

        log_event_with_fields(
            Event::MutationApplied,
            &[("op", "delete"), ("rows", "1"), ("table", table)],
        );
        Ok(before)
    }

    fn index_scan<'a>(
        &'a self,
        index: &str,
        sargs: &SearchArgs,
        direction: SortDirection,
        stats: &'a ExecutionStats,
    ) -> StorageResult<IndexEntries<'a>> {
        let index = self
            .indexes
            .get(index)
            .ok_or_else(|| StorageError::unknown_index(index))?;
        Ok(Box::new(index.scan(sargs, direction, stats)))
    }
}
