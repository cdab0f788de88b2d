//! Per-execution statistics counters
//!
//! - Counters only, monotonic within one execution
//! - Owned by a single execution context, never shared across threads
//! - Values are exact: tests assert on them

use std::cell::Cell;

use serde::{Deserialize, Serialize};

/// Counters accumulated while a plan is pulled
///
/// Counters are plain cells: scans borrow the stats immutably while the
/// plan tree holds other shared borrows of the same context.
#[derive(Debug, Default)]
pub struct ExecutionStats {
    /// Comparator invocations during index traversal
    index_comparisons: Cell<u64>,
    /// Row ids produced by index scans
    index_tuples_scanned: Cell<u64>,
    /// Live tuples produced by table scans
    table_tuples_scanned: Cell<u64>,
}

impl ExecutionStats {
    /// Create a new stats bag with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment index comparisons
    pub fn increment_index_comparisons(&self) {
        self.index_comparisons.set(self.index_comparisons.get() + 1);
    }

    /// Increment index tuples scanned
    pub fn increment_index_tuples_scanned(&self) {
        self.index_tuples_scanned
            .set(self.index_tuples_scanned.get() + 1);
    }

    /// Increment table tuples scanned
    pub fn increment_table_tuples_scanned(&self) {
        self.table_tuples_scanned
            .set(self.table_tuples_scanned.get() + 1);
    }

    pub fn index_comparisons(&self) -> u64 {
        self.index_comparisons.get()
    }

    pub fn index_tuples_scanned(&self) -> u64 {
        self.index_tuples_scanned.get()
    }

    pub fn table_tuples_scanned(&self) -> u64 {
        self.table_tuples_scanned.get()
    }

    /// Get a point-in-time snapshot
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            index_comparisons: self.index_comparisons(),
            index_tuples_scanned: self.index_tuples_scanned(),
            table_tuples_scanned: self.table_tuples_scanned(),
        }
    }
}

/// Immutable copy of the counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub index_comparisons: u64,
    pub index_tuples_scanned: u64,
    pub table_tuples_scanned: u64,
}

impl StatsSnapshot {
    /// Serialize to JSON in field order
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stats_are_zero() {
        let stats = ExecutionStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn test_increment_counters() {
        let stats = ExecutionStats::new();
        stats.increment_index_comparisons();
        stats.increment_index_comparisons();
        stats.increment_index_tuples_scanned();
        stats.increment_table_tuples_scanned();

        assert_eq!(stats.index_comparisons(), 2);
        assert_eq!(stats.index_tuples_scanned(), 1);
        assert_eq!(stats.table_tuples_scanned(), 1);
    }

    #[test]
    fn test_to_json() {
        let snapshot = StatsSnapshot {
            index_comparisons: 5,
            index_tuples_scanned: 4,
            table_tuples_scanned: 0,
        };
        let parsed: serde_json::Value = serde_json::from_str(&snapshot.to_json()).unwrap();
        assert_eq!(parsed["index_comparisons"], 5);
        assert_eq!(parsed["index_tuples_scanned"], 4);
        assert_eq!(parsed["table_tuples_scanned"], 0);

        let back: StatsSnapshot = serde_json::from_str(&snapshot.to_json()).unwrap();
        assert_eq!(back, snapshot);
        let json = snapshot.to_json();
        assert!(json.find("index_comparisons").unwrap() < json.find("table_tuples_scanned").unwrap());
    }
}
