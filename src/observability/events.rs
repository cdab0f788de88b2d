//! Observable events for strata
//!
//! Events are explicit and typed.

use std::fmt;

use super::logger::Severity;

/// Observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    // Lifecycle
    /// Engine constructed from configuration
    EngineOpen,
    /// Configuration loaded from disk
    ConfigLoaded,

    // Schema
    /// Table declared
    TableCreated,
    /// Index declared and built from existing rows
    IndexCreated,
    /// Indexes rebuilt from table slots
    IndexRebuilt,

    // Journal
    /// Journal replay begins
    JournalReplayBegin,
    /// Journal replay complete
    JournalReplayComplete,
    /// Mutation record appended
    JournalAppend,
    /// Buffered records forced to disk
    JournalFlushed,
    /// Journal corruption detected (FATAL)
    JournalCorruption,

    // Query
    /// Plan built for a query
    QueryPlanned,
    /// Plan pulled to completion
    QueryExecuted,
    /// Full table scan refused by `notablescan`
    TableScanForbidden,

    // Mutation
    /// Insert, update or delete applied
    MutationApplied,
}

impl Event {
    /// Returns the string representation of the event
    pub fn as_str(&self) -> &'static str {
        match self {
            Event::EngineOpen => "ENGINE_OPEN",
            Event::ConfigLoaded => "CONFIG_LOADED",
            Event::TableCreated => "TABLE_CREATED",
            Event::IndexCreated => "INDEX_CREATED",
            Event::IndexRebuilt => "INDEX_REBUILT",
            Event::JournalReplayBegin => "JOURNAL_REPLAY_BEGIN",
            Event::JournalReplayComplete => "JOURNAL_REPLAY_COMPLETE",
            Event::JournalAppend => "JOURNAL_APPEND",
            Event::JournalFlushed => "JOURNAL_FLUSHED",
            Event::JournalCorruption => "JOURNAL_CORRUPTION",
            Event::QueryPlanned => "QUERY_PLANNED",
            Event::QueryExecuted => "QUERY_EXECUTED",
            Event::TableScanForbidden => "TABLE_SCAN_FORBIDDEN",
            Event::MutationApplied => "MUTATION_APPLIED",
        }
    }

    /// Severity the event is logged at
    pub fn severity(&self) -> Severity {
        match self {
            Event::JournalAppend
            | Event::MutationApplied
            | Event::QueryPlanned
            | Event::QueryExecuted => Severity::Trace,
            Event::TableScanForbidden => Severity::Warn,
            Event::JournalCorruption => Severity::Fatal,
            _ => Severity::Info,
        }
    }

    /// Returns true if this event indicates a fatal condition
    pub fn is_fatal(&self) -> bool {
        self.severity() == Severity::Fatal
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
