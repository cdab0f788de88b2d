//! Per-call execution context

use crate::observability::ExecutionStats;

/// State owned by one plan evaluation
///
/// Not shared between evaluations; a fresh context gives fresh counters.
#[derive(Debug, Default)]
pub struct ExecutionContext {
    stats: ExecutionStats,
    notablescan: bool,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse to pull any `TableScan` in this evaluation
    pub fn with_notablescan(mut self, notablescan: bool) -> Self {
        self.notablescan = notablescan;
        self
    }

    pub fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    pub fn notablescan(&self) -> bool {
        self.notablescan
    }
}
